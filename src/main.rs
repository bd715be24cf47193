use rocket::figment::Figment;
use rocket::{launch, Build, Rocket};
use rocket_db_pools::Database;

mod admin;
mod authentication;
mod blog;
mod config;
mod database;
mod event;
mod export;
mod home;
mod iso_8601;
mod registration;
mod template;
#[cfg(test)]
mod testing;

#[launch]
fn rocket() -> _ {
    build(config::figment())
}

fn build(figment: Figment) -> Rocket<Build> {
    rocket::custom(figment)
        .attach(database::SupperClub::init())
        .attach(database::fairing())
        .attach(config::fairing())
        .attach(template::fairing())
        .mount("/", home::routes())
        .mount("/", registration::routes())
        .mount("/", admin::routes())
        .mount("/", event::routes())
        .mount("/", export::routes())
        .mount("/", blog::routes())
        .register("/", admin::catchers())
}
