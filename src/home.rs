use crate::database::Repository;
use crate::event::Event;
use crate::iso_8601::Iso8601;
use crate::template::PageBuilder;
use anyhow::Error;
use rocket::response::Debug;
use rocket::{get, routes, Route};
use rocket_dyn_templates::{context, Template};
use serde::Serialize;
use time::OffsetDateTime;

pub(crate) fn routes() -> Vec<Route> {
    routes![home_page]
}

#[derive(Debug, Serialize)]
struct UpcomingEvent {
    event: Event,
    spots_left: i64,
}

#[get("/")]
pub(crate) async fn home_page(
    page: PageBuilder<'_>,
    mut repository: Box<dyn Repository>,
) -> Result<Template, Debug<Error>> {
    let today = Iso8601(OffsetDateTime::now_utc().date());
    let upcoming = match repository.get_next_event(today).await? {
        Some(event) => {
            let spots_left = event.spots_left(repository.get_guest_total(event.id).await?);
            Some(UpcomingEvent { event, spots_left })
        }
        None => None,
    };
    Ok(page.render("index", context! { upcoming }))
}
