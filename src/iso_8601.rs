use rocket::form::{self, FromFormField, ValueField};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Wrapper storing the inner value as ISO 8601 text, which keeps
/// dates and timestamps lexically sortable in the database.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub(crate) struct Iso8601<T>(pub(crate) T);

impl<T> From<T> for Iso8601<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> Deref for Iso8601<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Iso8601<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

macro_rules! impl_serde {
    ($T:ident with $mod:path) => {
        impl Serialize for Iso8601<$T> {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                use $mod as module;
                module::serialize(self, serializer)
            }
        }

        impl<'de> Deserialize<'de> for Iso8601<$T> {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                use $mod as module;
                module::deserialize(deserializer).map(Self)
            }
        }
    };
}

time::serde::format_description!(iso8601_date, Date, "[year]-[month]-[day]");

impl_serde!(OffsetDateTime with time::serde::rfc3339);
impl_serde!(Date with iso8601_date);

const DATE_FORMAT: &[FormatItem<'_>] = format_description!("[year]-[month]-[day]");

#[rocket::async_trait]
impl<'r> FromFormField<'r> for Iso8601<Date> {
    fn from_value(field: ValueField<'r>) -> form::Result<'r, Self> {
        Date::parse(field.value, DATE_FORMAT)
            .map(Iso8601)
            .map_err(|_| form::Error::validation("not a valid date").into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod from_form_field {
        use super::*;
        use time::macros::date;

        #[test]
        fn parses_html_date_input_values() {
            let parsed = Iso8601::from_value(ValueField::from_value("2026-03-22"));
            assert_eq!(Iso8601(date!(2026 - 03 - 22)), parsed.unwrap());
        }

        #[test]
        fn rejects_values_that_are_not_dates() {
            assert!(Iso8601::<Date>::from_value(ValueField::from_value("")).is_err());
            assert!(Iso8601::<Date>::from_value(ValueField::from_value("tonight")).is_err());
            assert!(Iso8601::<Date>::from_value(ValueField::from_value("2026-13-40")).is_err());
        }
    }
}
