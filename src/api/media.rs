use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::api::collection::{not_found, process_delete, ApiCollection, DocResponse};
use crate::app::AppState;
use crate::auth::accounts::CurrentActor;
use crate::auth::models::Actor;
use crate::db::models::{Media, StoredDocument};
use crate::db::repository::Repository;
use crate::error::AppError;
use crate::policy::access::{can_perform, Operation};
use crate::storage::client::StorageClient;

/// Object storage prefix of uploaded media.
pub const MEDIA_PREFIX: &str = "media/";

impl ApiCollection for Media {
    fn repository(state: &AppState) -> Arc<dyn Repository<Self>> {
        state.media.clone()
    }

    fn before_create(_data: &mut Map<String, Value>, _actor: Option<&Actor>) -> Result<(), AppError> {
        Err(AppError::BadRequest(
            "Media is created by uploading a file".into(),
        ))
    }

    /// Everything except the alt text describes the stored file.
    fn before_update(
        patch: &mut Map<String, Value>,
        _existing: &Self,
        _actor: Option<&Actor>,
        _now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        patch.retain(|key, _| key == "alt");
        Ok(())
    }
}

/// An uploaded file as read from the multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Keep letters, digits, dots and hyphens, replace everything else.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Raster image types accepted for upload. SVG is excluded: it can carry
/// script and would run on this origin.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/avif",
];

/// Policy sent with every served media file so a stored file can never be
/// rendered as an active document.
const MEDIA_CSP: &str = "default-src 'none'; img-src 'self'; style-src 'unsafe-inline'; sandbox";

/// Path an uploaded file is served from.
pub fn media_url(filename: &str) -> String {
    format!("/api/media/file/{}", filename)
}

/// Core upload logic, separated from the HTTP layer for testability.
pub async fn process_media_upload(
    media: &dyn Repository<Media>,
    storage: &dyn StorageClient,
    actor: Option<&Actor>,
    file: UploadedFile,
    alt: Option<String>,
    now: DateTime<Utc>,
) -> Result<Media, AppError> {
    // 1. Check the create policy
    can_perform(actor, Media::COLLECTION, Operation::Create).into_scope()?;

    // 2. Only raster images are accepted
    let content_type = file.content_type.trim().to_ascii_lowercase();
    if !content_type.starts_with("image/") {
        return Err(AppError::BadRequest("Only image files are allowed".into()));
    }
    if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Unsupported image type '{}'; allowed: {}",
            content_type,
            ALLOWED_IMAGE_TYPES.join(", ")
        )));
    }
    if file.data.is_empty() {
        return Err(AppError::BadRequest("Uploaded file is empty".into()));
    }

    // 3. Store the bytes under a unique key
    let filename = format!(
        "{}_{}",
        now.timestamp_millis(),
        sanitize_file_name(&file.file_name)
    );
    let key = format!("{}{}", MEDIA_PREFIX, filename);
    let filesize = file.data.len() as i64;
    storage
        .put_object(&key, file.data, &content_type)
        .await?;

    // 4. Record the metadata, dropping the object again if that fails
    let doc = Media {
        id: uuid::Uuid::new_v4().to_string(),
        url: media_url(&filename),
        filename,
        mime_type: content_type,
        filesize,
        alt: alt.filter(|a| !a.trim().is_empty()),
        created_at: now,
        updated_at: now,
    };
    if let Err(e) = media.insert(doc.clone()).await {
        if let Err(cleanup) = storage.delete_object(&key).await {
            tracing::warn!(key = %key, error = %cleanup, "Failed to remove orphaned media object");
        }
        return Err(e);
    }

    tracing::info!(id = %doc.id, key = %key, size = filesize, "Media uploaded");
    Ok(doc)
}

/// Delete the media document, then its stored bytes.
pub async fn process_media_delete(
    media: &dyn Repository<Media>,
    storage: &dyn StorageClient,
    actor: Option<&Actor>,
    id: &str,
) -> Result<Media, AppError> {
    let doc = process_delete(media, actor, id).await?;
    storage
        .delete_object(&format!("{}{}", MEDIA_PREFIX, doc.filename))
        .await?;
    Ok(doc)
}

/// `POST /api/media`: multipart form with a `file` field and optional `alt`.
pub async fn upload_media_handler(
    State(state): State<AppState>,
    actor: CurrentActor,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DocResponse<Media>>), AppError> {
    let mut file = None;
    let mut alt = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload.bin").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            "alt" => {
                alt = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Failed to read alt: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::BadRequest("No file field found in request".into()))?;

    let doc = process_media_upload(
        state.media.as_ref(),
        state.storage_client.as_ref(),
        actor.actor(),
        file,
        alt,
        Utc::now(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(DocResponse {
            message: "Upload successful.".into(),
            doc,
        }),
    ))
}

/// `DELETE /api/media/{id}`
pub async fn delete_media_handler(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<DocResponse<Media>>, AppError> {
    let doc = process_media_delete(
        state.media.as_ref(),
        state.storage_client.as_ref(),
        actor.actor(),
        &id,
    )
    .await?;
    Ok(Json(DocResponse {
        message: "Deleted successfully.".into(),
        doc,
    }))
}

/// `GET /api/media/file/{filename}`: serve the stored bytes.
pub async fn serve_media_handler(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    if filename.contains('/') {
        return Err(not_found());
    }

    let data = state
        .storage_client
        .get_object(&format!("{}{}", MEDIA_PREFIX, filename))
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".into()))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&filename)),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
            (header::CONTENT_SECURITY_POLICY, MEDIA_CSP),
        ],
        data,
    )
        .into_response())
}

/// Infer the content type from the file extension.
fn content_type_for(filename: &str) -> &'static str {
    let lower = filename.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        "image/jpeg"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else if lower.ends_with(".avif") {
        "image/avif"
    } else {
        "application/octet-stream"
    }
}
