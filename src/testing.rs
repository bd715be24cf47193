use rocket::figment::Figment;
use rocket::http::ContentType;
use rocket::local::blocking::{Client, LocalResponse};

/// A tracked client over a fresh single-connection in-memory
/// database, seeded the same way a real startup is.
pub(crate) fn client() -> Client {
    Client::tracked(crate::build(figment())).expect("valid rocket instance")
}

fn figment() -> Figment {
    crate::config::figment()
        .merge(("databases.supper_club.url", ":memory:"))
        .merge(("databases.supper_club.max_connections", 1))
        .merge(("log_level", "off"))
}

pub(crate) fn login(client: &Client) {
    let response = client
        .post("/admin/login")
        .header(ContentType::Form)
        .body("password=admin")
        .dispatch();
    assert_eq!(rocket::http::Status::SeeOther, response.status());
}

pub(crate) fn register<'c>(
    client: &'c Client,
    name: &str,
    phone: &str,
    num_guests: i64,
) -> LocalResponse<'c> {
    client
        .post("/register")
        .header(ContentType::Form)
        .body(format!("name={name}&phone={phone}&num_guests={num_guests}"))
        .dispatch()
}
