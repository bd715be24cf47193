use crate::admin;
use crate::authentication::AdminSession;
use crate::database::Repository;
use crate::event::EventId;
use crate::iso_8601::Iso8601;
use crate::template::PageBuilder;
use anyhow::Error;
use rocket::form::Form;
use rocket::http::uri::fmt::{Formatter, Path, UriDisplay};
use rocket::request::FromParam;
use rocket::response::{Debug, Flash, Redirect};
use rocket::{get, post, routes, uri, FromForm, Responder, Route};
use rocket_dyn_templates::{context, Template};
use serde::Serialize;
use std::fmt;
use time::{Date, OffsetDateTime};

pub(crate) fn routes() -> Vec<Route> {
    routes![
        register,
        confirmation_page,
        update_registration,
        delete_registration
    ]
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, sqlx::Type, Serialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub(crate) struct RegistrationId(pub(crate) i64);

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<'r> FromParam<'r> for RegistrationId {
    type Error = <i64 as FromParam<'r>>::Error;

    fn from_param(param: &'r str) -> Result<Self, Self::Error> {
        i64::from_param(param).map(RegistrationId)
    }
}

impl UriDisplay<Path> for RegistrationId {
    fn fmt(&self, f: &mut Formatter<'_, Path>) -> fmt::Result {
        UriDisplay::fmt(&self.0, f)
    }
}

rocket::http::impl_from_uri_param_identity!([Path] RegistrationId);

/// One party's signup against an event, consuming some of its capacity.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub(crate) struct Registration {
    pub(crate) id: RegistrationId,
    pub(crate) event_id: EventId,
    pub(crate) name: String,
    pub(crate) phone: String,
    pub(crate) dietary_restrictions: String,
    pub(crate) num_guests: i64,
    pub(crate) created_at: Iso8601<OffsetDateTime>,
}

#[derive(Debug)]
pub(crate) struct NewRegistration {
    pub(crate) event_id: EventId,
    pub(crate) name: String,
    pub(crate) phone: String,
    pub(crate) dietary_restrictions: String,
    pub(crate) num_guests: i64,
}

/// Admin edits overwrite these fields as submitted; the guest count is
/// not re-checked against capacity.
#[derive(Debug)]
pub(crate) struct RegistrationPatch {
    pub(crate) name: String,
    pub(crate) phone: String,
    pub(crate) num_guests: i64,
    pub(crate) dietary_restrictions: String,
}

/// A registration joined to the event it is for, as shown on the
/// confirmation page.
#[derive(Debug, sqlx::FromRow, Serialize)]
pub(crate) struct RegistrationDetails {
    pub(crate) id: RegistrationId,
    pub(crate) name: String,
    pub(crate) phone: String,
    pub(crate) dietary_restrictions: String,
    pub(crate) num_guests: i64,
    pub(crate) event_title: String,
    pub(crate) event_date: Iso8601<Date>,
    pub(crate) event_time: Option<String>,
    pub(crate) event_location: String,
}

#[derive(Debug, FromForm)]
pub(crate) struct RegistrationForm<'r> {
    #[field(default = "")]
    name: &'r str,
    #[field(default = "")]
    phone: &'r str,
    #[field(default = "")]
    dietary_restrictions: &'r str,
    #[field(default = 1)]
    num_guests: i64,
}

#[derive(Responder)]
enum RegisterResponse {
    Rejected(Flash<Redirect>),
    Confirmed(Redirect),
}

#[post("/register", data = "<form>")]
async fn register(
    form: Form<RegistrationForm<'_>>,
    mut repository: Box<dyn Repository>,
) -> Result<RegisterResponse, Debug<Error>> {
    use RegisterResponse::*;

    let today = Iso8601(OffsetDateTime::now_utc().date());
    let Some(event) = repository.get_next_event(today).await? else {
        return Ok(Rejected(home_error("No upcoming event to register for.")));
    };

    let form = form.into_inner();
    let name = form.name.trim();
    let phone = form.phone.trim();
    if name.is_empty() || phone.is_empty() {
        return Ok(Rejected(home_error("Name and phone are required.")));
    }
    if form.num_guests < 1 {
        return Ok(Rejected(home_error("Must register at least 1 guest.")));
    }

    // Recomputed on every attempt; still a race window under
    // concurrent registrations, which the design accepts.
    let spots_left = event.spots_left(repository.get_guest_total(event.id).await?);
    if form.num_guests > spots_left {
        return Ok(Rejected(home_error("Not enough spots remaining.")));
    }

    let id = repository
        .add_registration(NewRegistration {
            event_id: event.id,
            name: name.to_owned(),
            phone: phone.to_owned(),
            dietary_restrictions: form.dietary_restrictions.trim().to_owned(),
            num_guests: form.num_guests,
        })
        .await?;
    Ok(Confirmed(Redirect::to(uri!(confirmation_page(id = id)))))
}

fn home_error(message: &str) -> Flash<Redirect> {
    Flash::error(Redirect::to(uri!(crate::home::home_page())), message)
}

#[derive(Responder)]
enum ConfirmationResponse {
    Page(Template),
    Missing(Flash<Redirect>),
}

#[get("/confirmation/<id>")]
async fn confirmation_page(
    id: RegistrationId,
    page: PageBuilder<'_>,
    mut repository: Box<dyn Repository>,
) -> Result<ConfirmationResponse, Debug<Error>> {
    use ConfirmationResponse::*;

    match repository.get_registration_details(id).await? {
        Some(registration) => Ok(Page(page.render("confirmation", context! { registration }))),
        None => Ok(Missing(home_error("Registration not found."))),
    }
}

#[post("/admin/registrations/<id>", data = "<form>")]
async fn update_registration(
    id: RegistrationId,
    form: Form<RegistrationForm<'_>>,
    _session: AdminSession,
    mut repository: Box<dyn Repository>,
) -> Result<Flash<Redirect>, Debug<Error>> {
    let form = form.into_inner();
    repository
        .update_registration(
            id,
            RegistrationPatch {
                name: form.name.trim().to_owned(),
                phone: form.phone.trim().to_owned(),
                num_guests: form.num_guests,
                dietary_restrictions: form.dietary_restrictions.trim().to_owned(),
            },
        )
        .await?;
    Ok(Flash::success(admin::redirect_to_admin(), "Guest updated."))
}

#[post("/admin/registrations/<id>/delete")]
async fn delete_registration(
    id: RegistrationId,
    _session: AdminSession,
    mut repository: Box<dyn Repository>,
) -> Result<Flash<Redirect>, Debug<Error>> {
    repository.delete_registration(id).await?;
    Ok(Flash::success(admin::redirect_to_admin(), "Guest removed."))
}
