use crate::admin;
use crate::authentication::AdminSession;
use crate::database::Repository;
use crate::iso_8601::Iso8601;
use anyhow::Error;
use rocket::form::Form;
use rocket::request::FromParam;
use rocket::response::{Debug, Flash, Redirect};
use rocket::{post, routes, FromForm, Route};
use serde::Serialize;
use std::fmt;
use time::Date;

pub(crate) fn routes() -> Vec<Route> {
    routes![create_event, update_event, delete_event]
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, sqlx::Type, Serialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub(crate) struct EventId(pub(crate) i64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'r> FromParam<'r> for EventId {
    type Error = <i64 as FromParam<'r>>::Error;

    fn from_param(param: &'r str) -> Result<Self, Self::Error> {
        i64::from_param(param).map(EventId)
    }
}

/// A single scheduled dinner with a fixed seating capacity.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub(crate) struct Event {
    pub(crate) id: EventId,
    pub(crate) title: String,
    pub(crate) date: Iso8601<Date>,
    pub(crate) time: Option<String>,
    pub(crate) location: String,
    pub(crate) menu_description: String,
    pub(crate) capacity: i64,
    pub(crate) charity: Option<String>,
    pub(crate) charity_url: Option<String>,
    pub(crate) suggested_price: Option<String>,
}

impl Event {
    /// Capacity remaining once `registered_guests` seats are taken.
    pub(crate) fn spots_left(&self, registered_guests: i64) -> i64 {
        self.capacity - registered_guests
    }
}

#[derive(Debug)]
pub(crate) struct NewEvent {
    pub(crate) title: String,
    pub(crate) date: Iso8601<Date>,
    pub(crate) time: Option<String>,
    pub(crate) location: String,
    pub(crate) menu_description: String,
    pub(crate) capacity: i64,
    pub(crate) charity: Option<String>,
    pub(crate) charity_url: Option<String>,
    pub(crate) suggested_price: Option<String>,
}

/// Field values for an event update. Updates write every field as
/// submitted; a missing or unparseable date keeps the stored one.
#[derive(Debug)]
pub(crate) struct EventPatch {
    pub(crate) title: String,
    pub(crate) date: Option<Iso8601<Date>>,
    pub(crate) time: Option<String>,
    pub(crate) location: String,
    pub(crate) menu_description: String,
    pub(crate) capacity: i64,
    pub(crate) charity: Option<String>,
    pub(crate) charity_url: Option<String>,
    pub(crate) suggested_price: Option<String>,
}

#[derive(Debug, FromForm)]
pub(crate) struct EventForm<'r> {
    #[field(default = "")]
    title: &'r str,
    date: Option<Iso8601<Date>>,
    #[field(default = "")]
    time: &'r str,
    #[field(default = "")]
    location: &'r str,
    #[field(default = "")]
    menu_description: &'r str,
    #[field(default = 0)]
    capacity: i64,
    #[field(default = "")]
    charity: &'r str,
    #[field(default = "")]
    charity_url: &'r str,
    #[field(default = "")]
    suggested_price: &'r str,
}

#[post("/admin/events", data = "<form>")]
async fn create_event(
    form: Form<EventForm<'_>>,
    _session: AdminSession,
    mut repository: Box<dyn Repository>,
) -> Result<Flash<Redirect>, Debug<Error>> {
    let form = form.into_inner();
    let title = form.title.trim();
    let location = form.location.trim();
    let menu_description = form.menu_description.trim();
    let Some(date) = form.date else {
        return Ok(Flash::error(
            admin::redirect_to_admin(),
            "All fields are required.",
        ));
    };
    if title.is_empty() || location.is_empty() || menu_description.is_empty() || form.capacity == 0
    {
        return Ok(Flash::error(
            admin::redirect_to_admin(),
            "All fields are required.",
        ));
    }
    repository
        .add_event(NewEvent {
            title: title.to_owned(),
            date,
            time: optional(form.time),
            location: location.to_owned(),
            menu_description: menu_description.to_owned(),
            capacity: form.capacity,
            charity: optional(form.charity),
            charity_url: optional(form.charity_url),
            suggested_price: optional(form.suggested_price),
        })
        .await?;
    Ok(Flash::success(admin::redirect_to_admin(), "Event created."))
}

#[post("/admin/events/<id>", data = "<form>")]
async fn update_event(
    id: EventId,
    form: Form<EventForm<'_>>,
    _session: AdminSession,
    mut repository: Box<dyn Repository>,
) -> Result<Flash<Redirect>, Debug<Error>> {
    let form = form.into_inner();
    repository
        .update_event(
            id,
            EventPatch {
                title: form.title.trim().to_owned(),
                date: form.date,
                time: optional(form.time),
                location: form.location.trim().to_owned(),
                menu_description: form.menu_description.trim().to_owned(),
                capacity: form.capacity,
                charity: optional(form.charity),
                charity_url: optional(form.charity_url),
                suggested_price: optional(form.suggested_price),
            },
        )
        .await?;
    Ok(Flash::success(admin::redirect_to_admin(), "Event updated."))
}

#[post("/admin/events/<id>/delete")]
async fn delete_event(
    id: EventId,
    _session: AdminSession,
    mut repository: Box<dyn Repository>,
) -> Result<Flash<Redirect>, Debug<Error>> {
    repository.delete_event(id).await?;
    Ok(Flash::success(admin::redirect_to_admin(), "Event deleted."))
}

/// Blank optional fields are stored as absent, not as empty strings.
fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod spots_left {
        use super::*;

        fn event_with_capacity(capacity: i64) -> Event {
            Event {
                id: EventId(1),
                title: "Test Supper".into(),
                date: Iso8601(Date::MIN),
                time: None,
                location: "Somewhere".into(),
                menu_description: "Something".into(),
                capacity,
                charity: None,
                charity_url: None,
                suggested_price: None,
            }
        }

        #[test]
        fn full_capacity_is_left_without_registrations() {
            assert_eq!(14, event_with_capacity(14).spots_left(0));
        }

        #[test]
        fn registered_guests_reduce_the_remaining_spots() {
            assert_eq!(9, event_with_capacity(14).spots_left(5));
        }

        #[test]
        fn a_full_event_has_no_spots_left() {
            assert_eq!(0, event_with_capacity(14).spots_left(14));
        }
    }

    mod optional {
        use super::*;

        #[test]
        fn blank_values_become_absent() {
            assert_eq!(None, optional(""));
            assert_eq!(None, optional("   "));
        }

        #[test]
        fn values_are_trimmed() {
            assert_eq!(Some("7:00 PM".to_owned()), optional(" 7:00 PM "));
        }
    }

    mod management {
        use crate::testing;
        use rocket::http::{ContentType, Status};

        #[test]
        fn create_requires_the_required_fields() {
            let client = testing::client();
            testing::login(&client);
            let response = client
                .post("/admin/events")
                .header(ContentType::Form)
                .body("title=&date=&location=&menu_description=&capacity=0")
                .dispatch();
            assert_eq!(Status::SeeOther, response.status());
            let body = client.get("/admin").dispatch().into_string().unwrap();
            assert!(body.contains("All fields are required."));
        }

        #[test]
        fn events_can_be_created_updated_and_deleted() {
            let client = testing::client();
            testing::login(&client);

            client
                .post("/admin/events")
                .header(ContentType::Form)
                .body("title=Harvest%20Dinner&date=2099-10-01&location=The%20Barn&menu_description=Squash&capacity=20")
                .dispatch();
            let body = client.get("/admin").dispatch().into_string().unwrap();
            assert!(body.contains("Event created."));
            assert!(body.contains("Harvest Dinner"));

            client
                .post("/admin/events/2")
                .header(ContentType::Form)
                .body("title=Harvest%20Feast&date=2099-10-01&location=The%20Barn&menu_description=Squash&capacity=20")
                .dispatch();
            let body = client.get("/admin").dispatch().into_string().unwrap();
            assert!(body.contains("Event updated."));
            assert!(body.contains("Harvest Feast"));
            assert!(!body.contains("Harvest Dinner"));

            client.post("/admin/events/2/delete").dispatch();
            let body = client.get("/admin").dispatch().into_string().unwrap();
            assert!(body.contains("Event deleted."));
            assert!(!body.contains("Harvest Feast"));
        }

        #[test]
        fn deleting_an_event_removes_its_registrations() {
            let client = testing::client();
            let response = testing::register(&client, "Ann", "555-0100", 2);
            let confirmation = response
                .headers()
                .get_one("Location")
                .expect("redirect target")
                .to_owned();

            testing::login(&client);
            client.post("/admin/events/1/delete").dispatch();

            let response = client.get(confirmation).dispatch();
            assert_eq!(Status::SeeOther, response.status());
            assert_eq!(Some("/"), response.headers().get_one("Location"));
        }
    }
}
