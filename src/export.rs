use crate::admin;
use crate::authentication::AdminSession;
use crate::database::Repository;
use crate::event::EventId;
use crate::registration::Registration;
use anyhow::Error;
use rocket::http::Header;
use rocket::response::{Debug, Flash, Redirect};
use rocket::{get, routes, Responder, Route};
use std::borrow::Cow;

pub(crate) fn routes() -> Vec<Route> {
    routes![export_csv]
}

/// A guest list offered as a spreadsheet-compatible download.
#[derive(Responder)]
#[response(content_type = "text/csv;charset=utf-8")]
pub(crate) struct Csv {
    content: String,
    disposition: Header<'static>,
}

impl Csv {
    fn attachment(content: String, filename: &str) -> Csv {
        Csv {
            content,
            disposition: Header::new(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", filename.replace('"', "'")),
            ),
        }
    }
}

#[derive(Responder)]
enum ExportResponse {
    File(Csv),
    Missing(Flash<Redirect>),
}

#[get("/admin/events/<id>/csv")]
async fn export_csv(
    id: EventId,
    _session: AdminSession,
    mut repository: Box<dyn Repository>,
) -> Result<ExportResponse, Debug<Error>> {
    use ExportResponse::*;

    let Some(event) = repository.get_event(id).await? else {
        return Ok(Missing(Flash::error(
            admin::redirect_to_admin(),
            "Event not found.",
        )));
    };
    let registrations = repository.get_registrations(id).await?;
    Ok(File(Csv::attachment(
        guest_list(&registrations),
        &format!("{} guests.csv", event.title),
    )))
}

fn guest_list(registrations: &[Registration]) -> String {
    let mut csv = String::from("Name,Phone,Guests,Dietary\r\n");
    for registration in registrations {
        csv.push_str(&format!(
            "{},{},{},{}\r\n",
            field(&registration.name),
            field(&registration.phone),
            registration.num_guests,
            field(&registration.dietary_restrictions),
        ));
    }
    csv
}

/// Quotes a field the way spreadsheet importers expect.
fn field(value: &str) -> Cow<'_, str> {
    if value.contains(['"', ',', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}
