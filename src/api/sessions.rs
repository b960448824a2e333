use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::api::collection::{apply_slug, ApiCollection};
use crate::app::AppState;
use crate::auth::models::Actor;
use crate::db::models::Session;
use crate::db::repository::Repository;
use crate::error::AppError;

impl ApiCollection for Session {
    fn repository(state: &AppState) -> Arc<dyn Repository<Self>> {
        state.sessions.clone()
    }

    fn before_create(data: &mut Map<String, Value>, _actor: Option<&Actor>) -> Result<(), AppError> {
        apply_slug(data, None)
    }

    fn before_update(
        patch: &mut Map<String, Value>,
        existing: &Self,
        _actor: Option<&Actor>,
        _now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        apply_slug(patch, Some(&existing.title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::collection::{process_create, process_list, process_update};
    use crate::auth::models::Role;
    use crate::db::memory::MemoryRepository;
    use crate::db::models::Media;
    use crate::db::query::ListParams;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn editor() -> Actor {
        Actor {
            id: "ed".into(),
            email: "ed@example.com".into(),
            roles: vec![Role::Editor],
        }
    }

    fn body(title: &str) -> Value {
        json!({
            "title": title,
            "shortDescription": "A gentle session.",
            "description": "## What to expect",
            "duration": "60 minutes",
        })
    }

    #[tokio::test]
    async fn test_create_session() {
        let repo = MemoryRepository::<Session>::new();
        let media = MemoryRepository::<Media>::new();
        let session = process_create(&repo, &media, Some(&editor()), body("Deep Healing"), now())
            .await
            .unwrap();
        assert_eq!(session.slug, "deep-healing");
        assert!(session.is_active);
    }

    #[tokio::test]
    async fn test_short_description_limit() {
        let repo = MemoryRepository::<Session>::new();
        let media = MemoryRepository::<Media>::new();
        let mut payload = body("Long");
        payload["shortDescription"] = json!("x".repeat(321));
        let result = process_create(&repo, &media, Some(&editor()), payload, now()).await;
        match result {
            Err(AppError::Validation(msg)) => {
                assert!(msg.contains("shortDescription: Must be at most 320 characters"))
            }
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_active_filter() {
        let repo = MemoryRepository::<Session>::new();
        let media = MemoryRepository::<Media>::new();
        let first = process_create(&repo, &media, Some(&editor()), body("One"), now())
            .await
            .unwrap();
        process_create(&repo, &media, Some(&editor()), body("Two"), now())
            .await
            .unwrap();
        process_update(
            &repo,
            &media,
            Some(&editor()),
            &first.id,
            json!({ "isActive": false }),
            now(),
        )
        .await
        .unwrap();

        let params = ListParams {
            is_active: Some(true),
            ..Default::default()
        };
        let page = process_list(&repo, &media, None, params, Session::DEFAULT_SORT)
            .await
            .unwrap();
        assert_eq!(page.total_docs, 1);
        assert_eq!(page.docs[0]["slug"], json!("two"));
    }
}
