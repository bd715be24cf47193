use crate::admin;
use crate::authentication::AdminSession;
use crate::database::Repository;
use crate::event::EventId;
use crate::iso_8601::Iso8601;
use crate::template::PageBuilder;
use anyhow::Error;
use rocket::form::Form;
use rocket::request::FromParam;
use rocket::response::{Debug, Flash, Redirect};
use rocket::{get, post, routes, uri, FromForm, Responder, Route};
use rocket_dyn_templates::{context, Template};
use serde::Serialize;
use std::fmt;
use time::OffsetDateTime;

pub(crate) fn routes() -> Vec<Route> {
    routes![blog_page, blog_post_page, create_post, update_post, delete_post]
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, sqlx::Type, Serialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub(crate) struct PostId(pub(crate) i64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'r> FromParam<'r> for PostId {
    type Error = <i64 as FromParam<'r>>::Error;

    fn from_param(param: &'r str) -> Result<Self, Self::Error> {
        i64::from_param(param).map(PostId)
    }
}

/// An announcement, optionally tied to an event. `event_title` comes
/// from the join and falls back to absent when the linked event is
/// gone.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub(crate) struct Post {
    pub(crate) id: PostId,
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) event_id: Option<EventId>,
    pub(crate) created_at: Iso8601<OffsetDateTime>,
    pub(crate) event_title: Option<String>,
}

#[derive(Debug)]
pub(crate) struct NewPost {
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) event_id: Option<EventId>,
}

#[derive(Debug)]
pub(crate) struct PostPatch {
    pub(crate) title: String,
    pub(crate) body: String,
    pub(crate) event_id: Option<EventId>,
}

#[derive(Debug, FromForm)]
pub(crate) struct PostForm<'r> {
    #[field(default = "")]
    title: &'r str,
    #[field(default = "")]
    body: &'r str,
    #[field(default = "")]
    event_id: &'r str,
}

#[get("/blog")]
pub(crate) async fn blog_page(
    page: PageBuilder<'_>,
    mut repository: Box<dyn Repository>,
) -> Result<Template, Debug<Error>> {
    let posts = repository.get_posts().await?;
    Ok(page.render("blog", context! { posts }))
}

#[derive(Responder)]
enum BlogPostResponse {
    Page(Template),
    Missing(Flash<Redirect>),
}

#[get("/blog/<id>")]
async fn blog_post_page(
    id: PostId,
    page: PageBuilder<'_>,
    mut repository: Box<dyn Repository>,
) -> Result<BlogPostResponse, Debug<Error>> {
    use BlogPostResponse::*;

    match repository.get_post(id).await? {
        Some(post) => Ok(Page(page.render("post", context! { post }))),
        None => Ok(Missing(Flash::error(
            Redirect::to(uri!(blog_page())),
            "Post not found.",
        ))),
    }
}

#[post("/admin/posts", data = "<form>")]
async fn create_post(
    form: Form<PostForm<'_>>,
    _session: AdminSession,
    mut repository: Box<dyn Repository>,
) -> Result<Flash<Redirect>, Debug<Error>> {
    let form = form.into_inner();
    let title = form.title.trim();
    let body = form.body.trim();
    if title.is_empty() || body.is_empty() {
        return Ok(Flash::error(
            admin::redirect_to_admin(),
            "Title and body are required.",
        ));
    }
    let event_id = parse_event_id(form.event_id).map_err(Error::from)?;
    repository
        .add_post(NewPost {
            title: title.to_owned(),
            body: body.to_owned(),
            event_id,
        })
        .await?;
    Ok(Flash::success(admin::redirect_to_admin(), "Post created."))
}

#[post("/admin/posts/<id>", data = "<form>")]
async fn update_post(
    id: PostId,
    form: Form<PostForm<'_>>,
    _session: AdminSession,
    mut repository: Box<dyn Repository>,
) -> Result<Flash<Redirect>, Debug<Error>> {
    let form = form.into_inner();
    let event_id = parse_event_id(form.event_id).map_err(Error::from)?;
    repository
        .update_post(
            id,
            PostPatch {
                title: form.title.trim().to_owned(),
                body: form.body.trim().to_owned(),
                event_id,
            },
        )
        .await?;
    Ok(Flash::success(admin::redirect_to_admin(), "Post updated."))
}

#[post("/admin/posts/<id>/delete")]
async fn delete_post(
    id: PostId,
    _session: AdminSession,
    mut repository: Box<dyn Repository>,
) -> Result<Flash<Redirect>, Debug<Error>> {
    repository.delete_post(id).await?;
    Ok(Flash::success(admin::redirect_to_admin(), "Post deleted."))
}

/// The post form submits its event link as a string; blank means no
/// linked event.
fn parse_event_id(value: &str) -> Result<Option<EventId>, std::num::ParseIntError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    Ok(Some(EventId(value.parse()?)))
}
