use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::app::AppState;
use crate::auth::accounts::CurrentActor;
use crate::auth::models::Actor;
use crate::db::models::{Media, StoredDocument};
use crate::db::query::{ListParams, ListQuery, Page, SortField, SortSpec};
use crate::db::repository::Repository;
use crate::error::AppError;
use crate::models::slug::resolve_slug;
use crate::models::timestamp;
use crate::policy::access::{can_perform, Operation};
use crate::schema::registry::Mode;

/// Fields owned by the server. Client values for them are ignored.
const SERVER_FIELDS: &[&str] = &["id", "createdAt", "updatedAt"];

/// A document type exposed through the generic collection endpoints.
pub trait ApiCollection: StoredDocument {
    const DEFAULT_SORT: SortSpec = SortSpec::descending(SortField::CreatedAt);

    fn repository(state: &AppState) -> Arc<dyn Repository<Self>>;

    /// Adjust a create payload before it is validated.
    fn before_create(
        _data: &mut Map<String, Value>,
        _actor: Option<&Actor>,
    ) -> Result<(), AppError> {
        Ok(())
    }

    /// Adjust an already validated patch before it is merged into `existing`.
    fn before_update(
        _patch: &mut Map<String, Value>,
        _existing: &Self,
        _actor: Option<&Actor>,
        _now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        Ok(())
    }
}

/// Response wrapper for single-document writes.
#[derive(Debug, Serialize)]
pub struct DocResponse<T> {
    pub message: String,
    pub doc: T,
}

pub fn not_found() -> AppError {
    AppError::NotFound("Not Found".into())
}

pub fn to_json<T: Serialize>(doc: &T) -> Result<Value, AppError> {
    serde_json::to_value(doc)
        .map_err(|e| AppError::Internal(format!("Failed to serialize document: {}", e)))
}

pub fn from_json<T: DeserializeOwned>(value: Value) -> Result<T, AppError> {
    serde_json::from_value(value)
        .map_err(|e| AppError::Validation(format!("Invalid document: {}", e)))
}

pub fn into_object(body: Value) -> Result<Map<String, Value>, AppError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::Validation("Expected a JSON object".into())),
    }
}

/// Fill or normalize the `slug` of a payload.
///
/// On create (`existing_title` is `None`) a blank or absent slug is derived
/// from the title. On update only a slug explicitly cleared in the patch is
/// re-derived, from the patched title or else the stored one.
pub fn apply_slug(
    data: &mut Map<String, Value>,
    existing_title: Option<&str>,
) -> Result<(), AppError> {
    match data.get("slug") {
        None if existing_title.is_some() => return Ok(()),
        // wrong types are reported by schema validation
        Some(value) if !value.is_null() && !value.is_string() => return Ok(()),
        _ => {}
    }

    let explicit = data.get("slug").and_then(Value::as_str);
    let title = data
        .get("title")
        .and_then(Value::as_str)
        .or(existing_title);
    let has_title = title.is_some_and(|t| !t.trim().is_empty());
    let resolved = resolve_slug(explicit, title);

    match resolved {
        Some(slug) => {
            data.insert("slug".into(), Value::String(slug));
            Ok(())
        }
        None if has_title => Err(AppError::Validation(
            "slug: Could not derive a slug from the title".into(),
        )),
        None => Ok(()),
    }
}

/// `/hero/heroImage` becomes `hero.heroImage`.
fn pointer_field(pointer: &str) -> String {
    pointer.trim_start_matches('/').replace('/', ".")
}

/// Replace media ids at the given JSON pointers with the media documents.
/// Ids that no longer resolve are left as they are.
pub async fn populate_media(
    value: &mut Value,
    pointers: &[&str],
    media: &dyn Repository<Media>,
) -> Result<(), AppError> {
    for pointer in pointers {
        let Some(slot) = value.pointer_mut(pointer) else {
            continue;
        };
        let Some(id) = slot.as_str().map(str::to_string) else {
            continue;
        };
        if let Some(doc) = media.find_by_id(&id, None).await? {
            *slot = to_json(&doc)?;
        }
    }
    Ok(())
}

/// Every media id at the given pointers must name an existing media document.
pub async fn check_media_refs(
    value: &Value,
    pointers: &[&str],
    media: &dyn Repository<Media>,
) -> Result<(), AppError> {
    let mut missing = Vec::new();
    for pointer in pointers {
        if let Some(id) = value.pointer(pointer).and_then(Value::as_str) {
            if media.find_by_id(id, None).await?.is_none() {
                missing.push(format!(
                    "{}: Media '{}' does not exist",
                    pointer_field(pointer),
                    id
                ));
            }
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "The following fields are invalid: {}",
            missing.join("; ")
        )))
    }
}

/// Core list logic: scope the query by the read policy, then page.
pub async fn process_list<T: StoredDocument>(
    repo: &dyn Repository<T>,
    media: &dyn Repository<Media>,
    actor: Option<&Actor>,
    params: ListParams,
    default_sort: SortSpec,
) -> Result<Page<Value>, AppError> {
    let query = params.into_query(default_sort)?;
    list_documents(repo, media, actor, &query).await
}

/// List within the caller's read scope, as JSON documents.
pub async fn list_documents<T: StoredDocument>(
    repo: &dyn Repository<T>,
    media: &dyn Repository<Media>,
    actor: Option<&Actor>,
    query: &ListQuery,
) -> Result<Page<Value>, AppError> {
    let scope = can_perform(actor, T::COLLECTION, Operation::Read).into_scope()?;
    let page = repo.list(query, scope.as_ref()).await?;

    let mut docs = Vec::with_capacity(page.docs.len());
    for doc in &page.docs {
        let mut value = to_json(doc)?;
        if query.populate {
            populate_media(&mut value, T::MEDIA_FIELDS, media).await?;
        }
        docs.push(value);
    }

    Ok(Page::new(docs, page.total_docs, query))
}

/// Core fetch-by-id logic. Documents outside the read scope are not found.
pub async fn process_find<T: StoredDocument>(
    repo: &dyn Repository<T>,
    media: &dyn Repository<Media>,
    actor: Option<&Actor>,
    id: &str,
    populate: bool,
) -> Result<Value, AppError> {
    let scope = can_perform(actor, T::COLLECTION, Operation::Read).into_scope()?;
    let doc = repo
        .find_by_id(id, scope.as_ref())
        .await?
        .ok_or_else(not_found)?;

    let mut value = to_json(&doc)?;
    if populate {
        populate_media(&mut value, T::MEDIA_FIELDS, media).await?;
    }
    Ok(value)
}

/// Core fetch-by-slug logic. Documents outside the read scope are not found.
pub async fn process_find_by_slug<T: StoredDocument>(
    repo: &dyn Repository<T>,
    media: &dyn Repository<Media>,
    actor: Option<&Actor>,
    slug: &str,
    populate: bool,
) -> Result<Value, AppError> {
    let scope = can_perform(actor, T::COLLECTION, Operation::Read).into_scope()?;
    let doc = repo
        .find_by_slug(slug, scope.as_ref())
        .await?
        .ok_or_else(not_found)?;

    let mut value = to_json(&doc)?;
    if populate {
        populate_media(&mut value, T::MEDIA_FIELDS, media).await?;
    }
    Ok(value)
}

/// Core create logic, separated from the HTTP layer for testability.
pub async fn process_create<T: ApiCollection>(
    repo: &dyn Repository<T>,
    media: &dyn Repository<Media>,
    actor: Option<&Actor>,
    body: Value,
    now: DateTime<Utc>,
) -> Result<T, AppError> {
    // 1. Check the create policy
    can_perform(actor, T::COLLECTION, Operation::Create).into_scope()?;

    // 2. Collection side effects (slug, author, ...)
    let mut data = into_object(body)?;
    for field in SERVER_FIELDS {
        data.remove(*field);
    }
    T::before_create(&mut data, actor)?;

    // 3. Validate and fill defaults
    let schema = T::schema();
    let mut value = Value::Object(data);
    schema.validate(&value, Mode::Create)?;
    schema.apply_defaults(&mut value);
    check_media_refs(&value, T::MEDIA_FIELDS, media).await?;

    // 4. Server-owned fields
    let stamp = Value::String(timestamp::format(&now));
    if let Value::Object(data) = &mut value {
        data.insert("id".into(), Value::String(uuid::Uuid::new_v4().to_string()));
        data.insert("createdAt".into(), stamp.clone());
        data.insert("updatedAt".into(), stamp);
    }

    // 5. Persist
    let doc: T = from_json(value)?;
    repo.insert(doc.clone()).await?;

    tracing::info!(collection = %T::COLLECTION, id = %doc.id(), "Document created");
    Ok(doc)
}

/// Core update logic: a partial patch merged over the stored document.
///
/// A document outside a restricted update scope is reported as a denial.
pub async fn process_update<T: ApiCollection>(
    repo: &dyn Repository<T>,
    media: &dyn Repository<Media>,
    actor: Option<&Actor>,
    id: &str,
    body: Value,
    now: DateTime<Utc>,
) -> Result<T, AppError> {
    // 1. Check the update policy
    let scope = can_perform(actor, T::COLLECTION, Operation::Update).into_scope()?;

    // 2. Load the target within scope
    let existing = match repo.find_by_id(id, scope.as_ref()).await? {
        Some(doc) => doc,
        None if scope.is_some() => return Err(AppError::forbidden()),
        None => return Err(not_found()),
    };

    // 3. Validate the patch itself
    let mut patch = into_object(body)?;
    for field in SERVER_FIELDS {
        patch.remove(*field);
    }
    let schema = T::schema();
    schema.validate(&Value::Object(patch.clone()), Mode::Update)?;
    T::before_update(&mut patch, &existing, actor, now)?;

    // 4. Merge and re-validate the whole document
    let mut merged = into_object(to_json(&existing)?)?;
    for (key, value) in patch {
        merged.insert(key, value);
    }
    merged.insert(
        "updatedAt".into(),
        Value::String(timestamp::format(&now)),
    );
    let merged = Value::Object(merged);
    schema.validate(&merged, Mode::Create)?;
    check_media_refs(&merged, T::MEDIA_FIELDS, media).await?;

    // 5. Persist within the same scope
    let doc: T = from_json(merged)?;
    if !repo.replace(doc.clone(), scope.as_ref()).await? {
        return Err(not_found());
    }

    tracing::info!(collection = %T::COLLECTION, id = %doc.id(), "Document updated");
    Ok(doc)
}

/// Core delete logic. Deletion is a hard delete of one document.
pub async fn process_delete<T: StoredDocument>(
    repo: &dyn Repository<T>,
    actor: Option<&Actor>,
    id: &str,
) -> Result<T, AppError> {
    let scope = can_perform(actor, T::COLLECTION, Operation::Delete).into_scope()?;

    let doc = match repo.find_by_id(id, scope.as_ref()).await? {
        Some(doc) => doc,
        None if scope.is_some() => return Err(AppError::forbidden()),
        None => return Err(not_found()),
    };

    if !repo.delete(id, scope.as_ref()).await? {
        return Err(not_found());
    }

    tracing::info!(collection = %T::COLLECTION, id = %id, "Document deleted");
    Ok(doc)
}

/// `GET /api/{collection}`
pub async fn list_handler<T: ApiCollection>(
    State(state): State<AppState>,
    actor: CurrentActor,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Value>>, AppError> {
    let repo = T::repository(&state);
    let page = process_list(
        repo.as_ref(),
        state.media.as_ref(),
        actor.actor(),
        params,
        T::DEFAULT_SORT,
    )
    .await?;
    Ok(Json(page))
}

/// `GET /api/{collection}/{id}`
pub async fn find_handler<T: ApiCollection>(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, AppError> {
    let repo = T::repository(&state);
    let doc = process_find(
        repo.as_ref(),
        state.media.as_ref(),
        actor.actor(),
        &id,
        params.populate(),
    )
    .await?;
    Ok(Json(doc))
}

/// `GET /api/{collection}/slug/{slug}`
pub async fn find_by_slug_handler<T: ApiCollection>(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(slug): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, AppError> {
    let repo = T::repository(&state);
    let doc = process_find_by_slug(
        repo.as_ref(),
        state.media.as_ref(),
        actor.actor(),
        &slug,
        params.populate(),
    )
    .await?;
    Ok(Json(doc))
}

/// `POST /api/{collection}`
pub async fn create_handler<T: ApiCollection>(
    State(state): State<AppState>,
    actor: CurrentActor,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<DocResponse<T>>), AppError> {
    let repo = T::repository(&state);
    let doc = process_create(
        repo.as_ref(),
        state.media.as_ref(),
        actor.actor(),
        body,
        Utc::now(),
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(DocResponse {
            message: "Document successfully created.".into(),
            doc,
        }),
    ))
}

/// `PATCH /api/{collection}/{id}`
pub async fn update_handler<T: ApiCollection>(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<DocResponse<T>>, AppError> {
    let repo = T::repository(&state);
    let doc = process_update(
        repo.as_ref(),
        state.media.as_ref(),
        actor.actor(),
        &id,
        body,
        Utc::now(),
    )
    .await?;
    Ok(Json(DocResponse {
        message: "Updated successfully.".into(),
        doc,
    }))
}

/// `DELETE /api/{collection}/{id}`
pub async fn delete_handler<T: ApiCollection>(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<DocResponse<T>>, AppError> {
    let repo = T::repository(&state);
    let doc = process_delete(repo.as_ref(), actor.actor(), &id).await?;
    Ok(Json(DocResponse {
        message: "Deleted successfully.".into(),
        doc,
    }))
}
