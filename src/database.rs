use crate::admin::EventOverview;
use crate::blog::{NewPost, Post, PostId, PostPatch};
use crate::event::{Event, EventId, EventPatch, NewEvent};
use crate::iso_8601::Iso8601;
use crate::registration::{
    NewRegistration, Registration, RegistrationDetails, RegistrationId, RegistrationPatch,
};
use anyhow::{anyhow, Error, Result};
use log::{error, info};
use rocket::fairing::{self, Fairing};
use rocket::outcome::try_outcome;
use rocket::request::{FromRequest, Outcome};
use rocket::{async_trait, Build, Request, Rocket};
use rocket_db_pools::{Connection, Database};
use sqlx::pool::PoolConnection;
use sqlx::{Connection as _, Executor as _, Sqlite};
use std::ops::DerefMut;
use time::{Date, Duration, OffsetDateTime};

#[derive(Database)]
#[database("supper_club")]
pub(crate) struct SupperClub(sqlx::SqlitePool);

type SqliteConnection = PoolConnection<Sqlite>;

#[async_trait]
pub(crate) trait Repository: Send {
    async fn add_event(&mut self, event: NewEvent) -> Result<EventId>;

    async fn get_event(&mut self, id: EventId) -> Result<Option<Event>>;

    /// The event with the smallest date that is not in the past.
    async fn get_next_event(&mut self, today: Iso8601<Date>) -> Result<Option<Event>>;

    async fn get_event_overviews(&mut self) -> Result<Vec<EventOverview>>;

    async fn update_event(&mut self, id: EventId, patch: EventPatch) -> Result<()>;

    /// Removes the event and its registrations in one transaction.
    async fn delete_event(&mut self, id: EventId) -> Result<()>;

    async fn has_events(&mut self) -> Result<bool>;

    async fn add_registration(&mut self, registration: NewRegistration) -> Result<RegistrationId>;

    async fn get_registration_details(
        &mut self,
        id: RegistrationId,
    ) -> Result<Option<RegistrationDetails>>;

    /// All registrations for an event, oldest first.
    async fn get_registrations(&mut self, event: EventId) -> Result<Vec<Registration>>;

    async fn get_guest_total(&mut self, event: EventId) -> Result<i64>;

    async fn update_registration(
        &mut self,
        id: RegistrationId,
        patch: RegistrationPatch,
    ) -> Result<()>;

    async fn delete_registration(&mut self, id: RegistrationId) -> Result<()>;

    async fn add_post(&mut self, post: NewPost) -> Result<PostId>;

    async fn get_post(&mut self, id: PostId) -> Result<Option<Post>>;

    /// All posts, newest first.
    async fn get_posts(&mut self) -> Result<Vec<Post>>;

    async fn update_post(&mut self, id: PostId, patch: PostPatch) -> Result<()>;

    async fn delete_post(&mut self, id: PostId) -> Result<()>;
}

pub(crate) struct SqliteRepository(pub(crate) SqliteConnection);

#[async_trait]
impl Repository for SqliteRepository {
    async fn add_event(&mut self, event: NewEvent) -> Result<EventId> {
        let result = sqlx::query(
            "INSERT INTO events (title, date, time, location, menu_description, capacity, charity, charity_url, suggested_price)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&event.title)
        .bind(event.date)
        .bind(&event.time)
        .bind(&event.location)
        .bind(&event.menu_description)
        .bind(event.capacity)
        .bind(&event.charity)
        .bind(&event.charity_url)
        .bind(&event.suggested_price)
        .execute(self.0.deref_mut())
        .await?;
        Ok(EventId(result.last_insert_rowid()))
    }

    async fn get_event(&mut self, id: EventId) -> Result<Option<Event>> {
        let event = sqlx::query_as("SELECT * FROM events WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.0.deref_mut())
            .await?;
        Ok(event)
    }

    async fn get_next_event(&mut self, today: Iso8601<Date>) -> Result<Option<Event>> {
        let event = sqlx::query_as("SELECT * FROM events WHERE date >= ?1 ORDER BY date ASC LIMIT 1")
            .bind(today)
            .fetch_optional(self.0.deref_mut())
            .await?;
        Ok(event)
    }

    async fn get_event_overviews(&mut self) -> Result<Vec<EventOverview>> {
        let events: Vec<Event> = sqlx::query_as("SELECT * FROM events ORDER BY date DESC")
            .fetch_all(self.0.deref_mut())
            .await?;
        let mut overviews = Vec::with_capacity(events.len());
        for event in events {
            let registrations: Vec<Registration> = sqlx::query_as(
                "SELECT * FROM registrations WHERE event_id = ?1 ORDER BY created_at DESC",
            )
            .bind(event.id)
            .fetch_all(self.0.deref_mut())
            .await?;
            let total_guests = registrations.iter().map(|r| r.num_guests).sum();
            overviews.push(EventOverview {
                event,
                registrations,
                total_guests,
            });
        }
        Ok(overviews)
    }

    async fn update_event(&mut self, id: EventId, patch: EventPatch) -> Result<()> {
        sqlx::query(
            "UPDATE events
             SET title = ?1, date = COALESCE(?2, date), time = ?3, location = ?4,
                 menu_description = ?5, capacity = ?6, charity = ?7, charity_url = ?8,
                 suggested_price = ?9
             WHERE id = ?10",
        )
        .bind(&patch.title)
        .bind(patch.date)
        .bind(&patch.time)
        .bind(&patch.location)
        .bind(&patch.menu_description)
        .bind(patch.capacity)
        .bind(&patch.charity)
        .bind(&patch.charity_url)
        .bind(&patch.suggested_price)
        .bind(id)
        .execute(self.0.deref_mut())
        .await?;
        Ok(())
    }

    async fn delete_event(&mut self, id: EventId) -> Result<()> {
        let mut transaction = self.0.deref_mut().begin().await?;
        sqlx::query("DELETE FROM registrations WHERE event_id = ?1")
            .bind(id)
            .execute(&mut *transaction)
            .await?;
        sqlx::query("DELETE FROM events WHERE id = ?1")
            .bind(id)
            .execute(&mut *transaction)
            .await?;
        transaction.commit().await?;
        Ok(())
    }

    async fn has_events(&mut self) -> Result<bool> {
        let event_count: i64 = sqlx::query_scalar("SELECT count(1) FROM events")
            .fetch_one(self.0.deref_mut())
            .await?;
        Ok(event_count >= 1)
    }

    async fn add_registration(&mut self, registration: NewRegistration) -> Result<RegistrationId> {
        let result = sqlx::query(
            "INSERT INTO registrations (event_id, name, phone, dietary_restrictions, num_guests, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(registration.event_id)
        .bind(&registration.name)
        .bind(&registration.phone)
        .bind(&registration.dietary_restrictions)
        .bind(registration.num_guests)
        .bind(Iso8601(OffsetDateTime::now_utc()))
        .execute(self.0.deref_mut())
        .await?;
        Ok(RegistrationId(result.last_insert_rowid()))
    }

    async fn get_registration_details(
        &mut self,
        id: RegistrationId,
    ) -> Result<Option<RegistrationDetails>> {
        let details = sqlx::query_as(
            "SELECT r.id, r.name, r.phone, r.dietary_restrictions, r.num_guests,
                    e.title AS event_title, e.date AS event_date,
                    e.time AS event_time, e.location AS event_location
             FROM registrations r
             JOIN events e ON r.event_id = e.id
             WHERE r.id = ?1",
        )
        .bind(id)
        .fetch_optional(self.0.deref_mut())
        .await?;
        Ok(details)
    }

    async fn get_registrations(&mut self, event: EventId) -> Result<Vec<Registration>> {
        let registrations = sqlx::query_as(
            "SELECT * FROM registrations WHERE event_id = ?1 ORDER BY created_at ASC",
        )
        .bind(event)
        .fetch_all(self.0.deref_mut())
        .await?;
        Ok(registrations)
    }

    async fn get_guest_total(&mut self, event: EventId) -> Result<i64> {
        let total = sqlx::query_scalar(
            "SELECT COALESCE(SUM(num_guests), 0) FROM registrations WHERE event_id = ?1",
        )
        .bind(event)
        .fetch_one(self.0.deref_mut())
        .await?;
        Ok(total)
    }

    async fn update_registration(
        &mut self,
        id: RegistrationId,
        patch: RegistrationPatch,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE registrations
             SET name = ?1, phone = ?2, num_guests = ?3, dietary_restrictions = ?4
             WHERE id = ?5",
        )
        .bind(&patch.name)
        .bind(&patch.phone)
        .bind(patch.num_guests)
        .bind(&patch.dietary_restrictions)
        .bind(id)
        .execute(self.0.deref_mut())
        .await?;
        Ok(())
    }

    async fn delete_registration(&mut self, id: RegistrationId) -> Result<()> {
        sqlx::query("DELETE FROM registrations WHERE id = ?1")
            .bind(id)
            .execute(self.0.deref_mut())
            .await?;
        Ok(())
    }

    async fn add_post(&mut self, post: NewPost) -> Result<PostId> {
        let result = sqlx::query(
            "INSERT INTO posts (title, body, event_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.event_id)
        .bind(Iso8601(OffsetDateTime::now_utc()))
        .execute(self.0.deref_mut())
        .await?;
        Ok(PostId(result.last_insert_rowid()))
    }

    async fn get_post(&mut self, id: PostId) -> Result<Option<Post>> {
        let post = sqlx::query_as(
            "SELECT p.*, e.title AS event_title
             FROM posts p LEFT JOIN events e ON p.event_id = e.id
             WHERE p.id = ?1",
        )
        .bind(id)
        .fetch_optional(self.0.deref_mut())
        .await?;
        Ok(post)
    }

    async fn get_posts(&mut self) -> Result<Vec<Post>> {
        let posts = sqlx::query_as(
            "SELECT p.*, e.title AS event_title
             FROM posts p LEFT JOIN events e ON p.event_id = e.id
             ORDER BY p.created_at DESC",
        )
        .fetch_all(self.0.deref_mut())
        .await?;
        Ok(posts)
    }

    async fn update_post(&mut self, id: PostId, patch: PostPatch) -> Result<()> {
        sqlx::query("UPDATE posts SET title = ?1, body = ?2, event_id = ?3 WHERE id = ?4")
            .bind(&patch.title)
            .bind(&patch.body)
            .bind(patch.event_id)
            .bind(id)
            .execute(self.0.deref_mut())
            .await?;
        Ok(())
    }

    async fn delete_post(&mut self, id: PostId) -> Result<()> {
        sqlx::query("DELETE FROM posts WHERE id = ?1")
            .bind(id)
            .execute(self.0.deref_mut())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<'r> FromRequest<'r> for Box<dyn Repository> {
    type Error = Option<Error>;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let connection = try_outcome!(request
            .guard::<Connection<SupperClub>>()
            .await
            .map_error(|(status, error)| (status, error.map(Error::from))));
        Outcome::Success(Box::new(SqliteRepository(connection.into_inner())))
    }
}

const SCHEMA: &str = include_str!("../schema.sql");

pub(crate) fn fairing() -> impl Fairing {
    fairing::AdHoc::try_on_ignite("Database Schema", |rocket| async {
        match initialize_database(&rocket).await {
            Ok(()) => Ok(rocket),
            Err(e) => {
                error!("failed to initialize database: {e:?}");
                Err(rocket)
            }
        }
    })
}

async fn initialize_database(rocket: &Rocket<Build>) -> Result<()> {
    let database = rocket
        .state::<SupperClub>()
        .ok_or_else(|| anyhow!("database pool is not attached"))?;
    let mut connection = database.0.acquire().await?;
    connection.deref_mut().execute(SCHEMA).await?;
    seed_default_event(&mut SqliteRepository(connection)).await
}

/// A fresh database gets one upcoming event so the landing page has
/// something to show before the first admin login.
async fn seed_default_event(repository: &mut dyn Repository) -> Result<()> {
    if repository.has_events().await? {
        return Ok(());
    }
    let date = OffsetDateTime::now_utc().date() + Duration::days(30);
    let id = repository
        .add_event(NewEvent {
            title: "March Supper".into(),
            date: Iso8601(date),
            time: Some("7:00 PM".into()),
            location: "555 Bryant Street".into(),
            menu_description: "Bring that one person you don't know well but want to know better!"
                .into(),
            capacity: 14,
            charity: Some("Immigrant Defense Project".into()),
            charity_url: Some("https://www.immigrantdefenseproject.org/".into()),
            suggested_price: Some("$25".into()),
        })
        .await?;
    info!("seeded default event {id}");
    Ok(())
}
