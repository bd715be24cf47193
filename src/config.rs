use rocket::fairing::AdHoc;
use rocket::figment::providers::{Env, Format as _, Toml};
use rocket::figment::{Figment, Profile};
use rocket::Config;
use serde::Deserialize;

/// Development fallback only; real deployments set ROCKET_SECRET_KEY.
const DEV_SECRET_KEY: &str = "4f9f3a6c8b2d1e7a5c0b9d8e7f6a5b4c3d2e1f0a9b8c7d6e5f4a3b2c1d0e9f8a";

/// Development fallback only; real deployments set ROCKET_ADMIN_PASSWORD.
const DEV_ADMIN_PASSWORD: &str = "admin";

#[derive(Debug, Deserialize)]
pub(crate) struct AppConfig {
    pub(crate) admin_password: String,
}

pub(crate) fn fairing() -> AdHoc {
    AdHoc::config::<AppConfig>()
}

/// Built-in defaults, overridden by `Rocket.toml`, overridden by
/// `ROCKET_*` environment variables.
pub(crate) fn figment() -> Figment {
    Figment::from(Config::default())
        .merge((Config::SECRET_KEY, DEV_SECRET_KEY))
        .merge(("admin_password", DEV_ADMIN_PASSWORD))
        .merge(("databases.supper_club.url", "supper_club.db"))
        .merge(Toml::file(Env::var_or("ROCKET_CONFIG", "Rocket.toml")).nested())
        .merge(Env::prefixed("ROCKET_").ignore(&["PROFILE"]).global())
        .select(Profile::from_env_or("ROCKET_PROFILE", Config::DEFAULT_PROFILE))
}
