use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::api::collection::{check_media_refs, into_object, populate_media, to_json, DocResponse};
use crate::app::AppState;
use crate::auth::accounts::CurrentActor;
use crate::auth::models::Actor;
use crate::db::homepage::{merge_patch, HomepageConfig, HomepageRepository, MEDIA_FIELDS};
use crate::db::models::Media;
use crate::db::query::ListParams;
use crate::db::repository::Repository;
use crate::error::AppError;
use crate::policy::access::{can_perform, Collection, Operation};
use crate::schema::registry::{self, Mode};

/// Core read logic: the stored homepage or its defaults, media optionally populated.
pub async fn process_get_homepage(
    repo: &dyn HomepageRepository,
    media: &dyn Repository<Media>,
    actor: Option<&Actor>,
    populate: bool,
) -> Result<Value, AppError> {
    can_perform(actor, Collection::Homepage, Operation::Read).into_scope()?;

    let config = repo.get().await?;
    let mut value = to_json(&config)?;
    if populate {
        populate_media(&mut value, MEDIA_FIELDS, media).await?;
    }
    Ok(value)
}

/// Core update logic. Groups are merged field by field, arrays are replaced
/// wholesale.
pub async fn process_update_homepage(
    repo: &dyn HomepageRepository,
    media: &dyn Repository<Media>,
    actor: Option<&Actor>,
    body: Value,
    now: DateTime<Utc>,
) -> Result<HomepageConfig, AppError> {
    // 1. Check the update policy
    can_perform(actor, Collection::Homepage, Operation::Update).into_scope()?;

    // 2. Validate the patch itself
    let schema = registry::homepage();
    let mut patch = into_object(body)?;
    patch.remove("globalType");
    patch.remove("updatedAt");
    schema.validate(&Value::Object(patch.clone()), Mode::Update)?;

    // 3. Preview the merge over the current document
    let preview = merge_patch(&repo.get().await?, &patch, now)?;

    // 4. Validate the result
    let preview = to_json(&preview)?;
    schema.validate(&preview, Mode::Create)?;
    check_media_refs(&preview, MEDIA_FIELDS, media).await?;

    // 5. Apply the patch atomically; concurrent updates of other fields are kept
    let config = repo.apply_patch(&patch, now).await?;

    tracing::info!("Homepage updated");
    Ok(config)
}

/// `GET /api/globals/homepage`
pub async fn get_homepage_handler(
    State(state): State<AppState>,
    actor: CurrentActor,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, AppError> {
    let value = process_get_homepage(
        state.homepage.as_ref(),
        state.media.as_ref(),
        actor.actor(),
        params.populate(),
    )
    .await?;
    Ok(Json(value))
}

/// `POST /api/globals/homepage`
pub async fn update_homepage_handler(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(body): Json<Value>,
) -> Result<Json<DocResponse<HomepageConfig>>, AppError> {
    let config = process_update_homepage(
        state.homepage.as_ref(),
        state.media.as_ref(),
        actor.actor(),
        body,
        Utc::now(),
    )
    .await?;
    Ok(Json(DocResponse {
        message: "Global saved successfully.".into(),
        doc: config,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use crate::db::homepage::MemoryHomepageRepository;
    use crate::db::memory::MemoryRepository;
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

    async fn media_with(id: &str) -> MemoryRepository<Media> {
        let media = MemoryRepository::new();
        media
            .insert(Media {
                id: id.into(),
                filename: "1_hero.png".into(),
                mime_type: "image/png".into(),
                filesize: 10,
                alt: None,
                url: "/api/media/file/1_hero.png".into(),
                created_at: now(),
                updated_at: now(),
            })
            .await
            .unwrap();
        media
    }

    #[tokio::test]
    async fn test_unsaved_homepage_reads_defaults() {
        let repo = MemoryHomepageRepository::default();
        let media = MemoryRepository::<Media>::new();
        let value = process_get_homepage(&repo, &media, None, true).await.unwrap();
        assert_eq!(value["navigation"].as_array().unwrap().len(), 6);
        assert_eq!(value["hero"]["learnMoreHref"], json!("/about"));
    }

    #[tokio::test]
    async fn test_update_requires_actor() {
        let repo = MemoryHomepageRepository::default();
        let media = MemoryRepository::<Media>::new();
        let result = process_update_homepage(&repo, &media, None, json!({}), now()).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_update_merges_groups() {
        let repo = MemoryHomepageRepository::default();
        let media = media_with("m1").await;

        let config = process_update_homepage(
            &repo,
            &media,
            Some(&editor()),
            json!({
                "hero": { "title": "Welcome home", "heroImage": "m1" },
                "navigation": [{ "label": "Home", "href": "/" }],
            }),
            now(),
        )
        .await
        .unwrap();

        assert_eq!(config.hero.title, "Welcome home");
        assert_eq!(config.hero.kicker, "Christos Medicine");
        assert_eq!(config.hero.hero_image.as_deref(), Some("m1"));
        assert_eq!(config.navigation.len(), 1);
        assert_eq!(config.elements.len(), 5);
        assert_eq!(config.updated_at, Some(now()));

        let value = process_get_homepage(&repo, &media, None, true).await.unwrap();
        assert_eq!(value["hero"]["heroImage"]["url"], json!("/api/media/file/1_hero.png"));
        let shallow = process_get_homepage(&repo, &media, None, false).await.unwrap();
        assert_eq!(shallow["hero"]["heroImage"], json!("m1"));
    }

    #[tokio::test]
    async fn test_update_row_bounds() {
        let repo = MemoryHomepageRepository::default();
        let media = MemoryRepository::<Media>::new();
        let nine: Vec<Value> = (0..9)
            .map(|i| json!({ "label": format!("L{i}"), "href": "/" }))
            .collect();

        let result = process_update_homepage(
            &repo,
            &media,
            Some(&editor()),
            json!({ "navigation": nine }),
            now(),
        )
        .await;
        match result {
            Err(AppError::Validation(msg)) => assert!(msg.contains("navigation: Allows at most 8 rows")),
            other => panic!("Expected Validation error, got: {:?}", other),
        }

        let result = process_update_homepage(
            &repo,
            &media,
            Some(&editor()),
            json!({ "elements": [] }),
            now(),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_media() {
        let repo = MemoryHomepageRepository::default();
        let media = MemoryRepository::<Media>::new();
        let result = process_update_homepage(
            &repo,
            &media,
            Some(&editor()),
            json!({ "support": { "supportImage": "nope" } }),
            now(),
        )
        .await;
        match result {
            Err(AppError::Validation(msg)) => {
                assert!(msg.contains("support.supportImage: Media 'nope' does not exist"))
            }
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }
}
