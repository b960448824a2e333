use axum::extract::Path;
use axum::Json;
use serde::Serialize;

use crate::error::AppError;
use crate::policy::access::Collection;
use crate::schema::registry::{self, CollectionSchema};

/// Everything that has a schema, in the order they are listed.
const SCHEMA_COLLECTIONS: [Collection; 6] = [
    Collection::Articles,
    Collection::Gallery,
    Collection::Sessions,
    Collection::Media,
    Collection::Users,
    Collection::Homepage,
];

/// Entry of the schema index.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaListItem {
    pub slug: &'static str,
    pub fields: usize,
}

pub fn process_list_schemas() -> Vec<SchemaListItem> {
    SCHEMA_COLLECTIONS
        .iter()
        .map(|collection| SchemaListItem {
            slug: collection.slug(),
            fields: registry::schema_for(*collection).fields.len(),
        })
        .collect()
}

pub fn process_get_schema(name: &str) -> Result<CollectionSchema, AppError> {
    Collection::from_slug(name)
        .map(registry::schema_for)
        .ok_or_else(|| AppError::NotFound(format!("Unknown collection '{}'", name)))
}

/// `GET /api/schemas`
pub async fn list_schemas_handler() -> Json<Vec<SchemaListItem>> {
    Json(process_list_schemas())
}

/// `GET /api/schemas/{collection}`
pub async fn get_schema_handler(
    Path(name): Path<String>,
) -> Result<Json<CollectionSchema>, AppError> {
    Ok(Json(process_get_schema(&name)?))
}
