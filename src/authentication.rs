use rocket::http::{Cookie, CookieJar, SameSite, Status};
use rocket::request::{FromRequest, Outcome};
use rocket::{async_trait, Request};
use std::borrow::Cow;

/// Proof that the current request carries an authenticated admin
/// session. Requests without one are bounced to the admin landing
/// page by the 401 catcher in [`crate::admin`].
pub(crate) struct AdminSession;

#[async_trait]
impl<'r> FromRequest<'r> for AdminSession {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        if request.cookies().is_admin() {
            Outcome::Success(AdminSession)
        } else {
            Outcome::Error((Status::Unauthorized, ()))
        }
    }
}

pub(crate) trait CookieJarExt {
    fn is_admin(&self) -> bool;

    fn set_admin(&self);

    fn clear_session(&self);
}

impl CookieJarExt for CookieJar<'_> {
    fn is_admin(&self) -> bool {
        self.get_private(ADMIN_COOKIE_NAME).is_some()
    }

    fn set_admin(&self) {
        self.add_private(admin_cookie("1"));
    }

    fn clear_session(&self) {
        self.remove_private(admin_cookie(""));
    }
}

fn admin_cookie<'a>(value: impl Into<Cow<'a, str>>) -> Cookie<'a> {
    Cookie::build((ADMIN_COOKIE_NAME, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

const ADMIN_COOKIE_NAME: &str = "admin";
