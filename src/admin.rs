use crate::authentication::{AdminSession, CookieJarExt};
use crate::blog::Post;
use crate::config::AppConfig;
use crate::database::Repository;
use crate::event::Event;
use crate::iso_8601::Iso8601;
use crate::registration::Registration;
use crate::template::PageBuilder;
use anyhow::Error;
use constant_time_eq::constant_time_eq;
use rocket::form::Form;
use rocket::http::CookieJar;
use rocket::response::{Debug, Flash, Redirect};
use rocket::{catch, catchers, get, post, routes, uri, Catcher, FromForm, Route, State};
use rocket_dyn_templates::{context, Template};
use serde::Serialize;
use time::OffsetDateTime;

pub(crate) fn routes() -> Vec<Route> {
    routes![admin_page, login, logout]
}

pub(crate) fn catchers() -> Vec<Catcher> {
    catchers![unauthorized]
}

/// One event with everything the dashboard shows about it.
#[derive(Debug, Serialize)]
pub(crate) struct EventOverview {
    pub(crate) event: Event,
    pub(crate) registrations: Vec<Registration>,
    pub(crate) total_guests: i64,
}

#[get("/admin")]
pub(crate) async fn admin_page(
    session: Option<AdminSession>,
    page: PageBuilder<'_>,
    mut repository: Box<dyn Repository>,
) -> Result<Template, Debug<Error>> {
    if session.is_none() {
        return Ok(page.render("admin", context! { authed: false }));
    }
    let events = repository.get_event_overviews().await?;
    let posts: Vec<Post> = repository.get_posts().await?;
    let today = Iso8601(OffsetDateTime::now_utc().date());
    Ok(page.render("admin", context! { authed: true, events, posts, today }))
}

#[derive(Debug, FromForm)]
struct LoginForm<'r> {
    #[field(default = "")]
    password: &'r str,
}

#[post("/admin/login", data = "<form>")]
fn login(
    form: Form<LoginForm<'_>>,
    cookies: &CookieJar<'_>,
    config: &State<AppConfig>,
) -> Flash<Redirect> {
    if constant_time_eq(form.password.as_bytes(), config.admin_password.as_bytes()) {
        cookies.set_admin();
        Flash::success(redirect_to_admin(), "Logged in.")
    } else {
        Flash::error(redirect_to_admin(), "Incorrect password.")
    }
}

#[get("/admin/logout")]
fn logout(_session: AdminSession, cookies: &CookieJar<'_>) -> Flash<Redirect> {
    cookies.clear_session();
    Flash::success(redirect_to_admin(), "Logged out.")
}

#[catch(401)]
fn unauthorized() -> Redirect {
    redirect_to_admin()
}

pub(crate) fn redirect_to_admin() -> Redirect {
    Redirect::to(uri!(admin_page()))
}

#[cfg(test)]
mod tests {
    use crate::testing;
    use rocket::http::{ContentType, Status};

    mod gate {
        use super::*;

        #[test]
        fn the_admin_page_shows_only_a_login_form_without_a_session() {
            let client = testing::client();
            let body = client.get("/admin").dispatch().into_string().unwrap();
            assert!(body.contains("name=\"password\""));
            assert!(!body.contains("New event"));
        }

        #[test]
        fn admin_routes_redirect_without_executing() {
            let client = testing::client();
            let response = client
                .post("/admin/events")
                .header(ContentType::Form)
                .body("title=Sneaky&date=2099-01-01&location=X&menu_description=Y&capacity=5")
                .dispatch();
            assert_eq!(Status::SeeOther, response.status());
            assert_eq!(Some("/admin"), response.headers().get_one("Location"));

            testing::login(&client);
            let body = client.get("/admin").dispatch().into_string().unwrap();
            assert!(!body.contains("Sneaky"));
        }

        #[test]
        fn a_wrong_password_leaves_the_session_unauthenticated() {
            let client = testing::client();
            client
                .post("/admin/login")
                .header(ContentType::Form)
                .body("password=letmein")
                .dispatch();
            let body = client.get("/admin").dispatch().into_string().unwrap();
            assert!(body.contains("Incorrect password."));
            assert!(body.contains("name=\"password\""));
            assert!(!body.contains("New event"));
        }

        #[test]
        fn the_right_password_unlocks_the_dashboard() {
            let client = testing::client();
            testing::login(&client);
            let body = client.get("/admin").dispatch().into_string().unwrap();
            assert!(body.contains("Logged in."));
            assert!(body.contains("New event"));
        }

        #[test]
        fn logout_drops_admin_access_immediately() {
            let client = testing::client();
            testing::login(&client);

            let response = client.get("/admin/logout").dispatch();
            assert_eq!(Status::SeeOther, response.status());

            let body = client.get("/admin").dispatch().into_string().unwrap();
            assert!(body.contains("Logged out."));
            assert!(!body.contains("New event"));

            let response = client.post("/admin/events/1/delete").dispatch();
            assert_eq!(Status::SeeOther, response.status());
            assert_eq!(Some("/admin"), response.headers().get_one("Location"));
        }
    }
}
