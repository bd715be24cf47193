use crate::authentication::CookieJarExt;
use rocket::fairing::Fairing;
use rocket::http::uri::Origin;
use rocket::request::{FlashMessage, FromRequest, Outcome};
use rocket::{async_trait, Request};
use rocket_dyn_templates::tera::{self, Tera, Value};
use rocket_dyn_templates::{context, Template};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::convert::Infallible;

pub(crate) fn fairing() -> impl Fairing {
    Template::custom(|engines| register_custom_filters(&mut engines.tera))
}

fn register_custom_filters(tera: &mut Tera) {
    tera.register_filter("markdown", markdown);
}

fn markdown(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    use pulldown_cmark::{html, Options, Parser};

    const OPTIONS: Options = Options::empty()
        .union(Options::ENABLE_TABLES)
        .union(Options::ENABLE_FOOTNOTES)
        .union(Options::ENABLE_STRIKETHROUGH);

    let input = tera::from_value::<String>(value.clone())?;
    let parser = Parser::new_ext(&input, OPTIONS);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    Ok(Value::String(html_output))
}

/// Collects the bits every page needs: whether the session is an
/// admin one, and the one-shot notice left behind by a redirect.
pub(crate) struct PageBuilder<'r> {
    admin: bool,
    notice: Option<Notice>,
    uri: &'r Origin<'r>,
}

#[derive(Debug, Serialize)]
struct Notice {
    kind: String,
    message: String,
}

impl PageBuilder<'_> {
    pub(crate) fn render(
        &self,
        name: impl Into<Cow<'static, str>>,
        context: impl Serialize,
    ) -> Template {
        Template::render(
            name,
            context! { admin: self.admin, notice: &self.notice, uri: self.uri, page: context },
        )
    }
}

#[async_trait]
impl<'r> FromRequest<'r> for PageBuilder<'r> {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let notice = request
            .guard::<FlashMessage<'_>>()
            .await
            .succeeded()
            .map(|flash| Notice {
                kind: flash.kind().to_owned(),
                message: flash.message().to_owned(),
            });
        Outcome::Success(PageBuilder {
            admin: request.cookies().is_admin(),
            notice,
            uri: request.uri(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod markdown {
        use super::*;

        #[test]
        fn renders_emphasis_as_html() {
            let rendered = markdown(&Value::String("Hello **world**".into()), &HashMap::new());
            let Value::String(html) = rendered.unwrap() else {
                panic!("markdown filter should return a string");
            };
            assert!(html.contains("<strong>world</strong>"));
        }

        #[test]
        fn renders_strikethrough() {
            let rendered = markdown(&Value::String("~~gone~~".into()), &HashMap::new());
            let Value::String(html) = rendered.unwrap() else {
                panic!("markdown filter should return a string");
            };
            assert!(html.contains("<del>gone</del>"));
        }
    }
}
