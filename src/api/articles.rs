use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::api::collection::{apply_slug, ApiCollection};
use crate::app::AppState;
use crate::auth::models::Actor;
use crate::db::models::Article;
use crate::db::repository::Repository;
use crate::error::AppError;
use crate::models::publication::PublicationState;
use crate::models::timestamp;

impl ApiCollection for Article {
    fn repository(state: &AppState) -> Arc<dyn Repository<Self>> {
        state.articles.clone()
    }

    fn before_create(data: &mut Map<String, Value>, actor: Option<&Actor>) -> Result<(), AppError> {
        if data.get("status").and_then(Value::as_str) == Some(PublicationState::Published.as_str())
        {
            return Err(AppError::Validation(
                "status: New articles are created as drafts".into(),
            ));
        }
        // only the publication transition sets it
        data.remove("publishedAt");

        apply_slug(data, None)?;
        apply_author(data, actor, true)
    }

    fn before_update(
        patch: &mut Map<String, Value>,
        existing: &Self,
        actor: Option<&Actor>,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        patch.remove("publishedAt");

        let requested = match patch.remove("status") {
            Some(Value::String(raw)) => Some(parse_state(&raw)?),
            _ => None,
        };
        let publication = existing.publication().transition(requested, now)?;
        patch.insert(
            "status".into(),
            Value::String(publication.state.as_str().to_string()),
        );
        patch.insert(
            "publishedAt".into(),
            publication
                .published_at
                .map(|at| Value::String(timestamp::format(&at)))
                .unwrap_or(Value::Null),
        );

        apply_slug(patch, Some(&existing.title))?;
        apply_author(patch, actor, false)
    }
}

fn parse_state(raw: &str) -> Result<PublicationState, AppError> {
    match raw {
        "draft" => Ok(PublicationState::Draft),
        "published" => Ok(PublicationState::Published),
        other => Err(AppError::Validation(format!(
            "status: '{}' is not a valid option",
            other
        ))),
    }
}

/// Authors default to the caller. Only admins may name someone else.
fn apply_author(
    data: &mut Map<String, Value>,
    actor: Option<&Actor>,
    creating: bool,
) -> Result<(), AppError> {
    let Some(actor) = actor else {
        return Err(AppError::forbidden());
    };

    let requested = match data.get("author") {
        None | Some(Value::Null) => None,
        Some(Value::String(author)) if author.trim().is_empty() => None,
        Some(Value::String(author)) => Some(author.trim().to_string()),
        // wrong types are reported by schema validation
        Some(_) => return Ok(()),
    };

    match requested {
        None if creating => {
            data.insert("author".into(), Value::String(actor.id.clone()));
            Ok(())
        }
        None => {
            data.remove("author");
            Ok(())
        }
        Some(author) if author == actor.id || actor.is_admin() => {
            data.insert("author".into(), Value::String(author));
            Ok(())
        }
        Some(_) => Err(AppError::Forbidden(
            "Only admins may assign an article to another author.".into(),
        )),
    }
}
