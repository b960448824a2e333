use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::db::query::{SortField, SortValue};
use crate::models::publication::{Publication, PublicationState};
use crate::models::timestamp;
use crate::policy::access::Collection;
use crate::policy::filter::{Filterable, Flag};
use crate::schema::registry::{self, CollectionSchema};

/// A document type persisted in its own collection.
pub trait StoredDocument:
    Serialize + DeserializeOwned + Filterable + Clone + Debug + Send + Sync + Unpin + 'static
{
    const COLLECTION: Collection;

    /// JSON pointers of the fields holding media ids.
    const MEDIA_FIELDS: &'static [&'static str] = &[];

    fn id(&self) -> &str;

    fn slug(&self) -> Option<&str> {
        None
    }

    fn sort_value(&self, field: SortField) -> SortValue;

    fn schema() -> CollectionSchema {
        registry::schema_for(Self::COLLECTION)
    }
}

fn default_true() -> bool {
    true
}

/// A blog article (`blogs` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub slug: String,
    /// Id of the authoring user.
    pub author: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Markdown body.
    pub content: String,
    #[serde(default, with = "timestamp::option")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: PublicationState,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn publication(&self) -> Publication {
        Publication {
            state: self.status,
            published_at: self.published_at,
        }
    }

    pub fn set_publication(&mut self, publication: Publication) {
        self.status = publication.state;
        self.published_at = publication.published_at;
    }
}

impl Filterable for Article {
    fn publication_state(&self) -> Option<PublicationState> {
        Some(self.status)
    }

    fn author_id(&self) -> Option<&str> {
        Some(&self.author)
    }
}

impl StoredDocument for Article {
    const COLLECTION: Collection = Collection::Articles;
    const MEDIA_FIELDS: &'static [&'static str] = &["/featuredImage"];

    fn id(&self) -> &str {
        &self.id
    }

    fn slug(&self) -> Option<&str> {
        Some(&self.slug)
    }

    fn sort_value(&self, field: SortField) -> SortValue {
        match field {
            SortField::CreatedAt => SortValue::Time(self.created_at),
            SortField::UpdatedAt => SortValue::Time(self.updated_at),
            SortField::PublishedAt => self.published_at.into(),
            SortField::Title => SortValue::Text(self.title.clone()),
            SortField::SortOrder => SortValue::Missing,
        }
    }
}

/// A gallery image (`gallery` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    pub id: String,
    pub title: String,
    /// Media id of the photo.
    pub photo: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub featured: bool,
    /// Lower numbers appear first.
    #[serde(default)]
    pub sort_order: i64,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Filterable for GalleryItem {
    fn flag(&self, flag: Flag) -> Option<bool> {
        match flag {
            Flag::Featured => Some(self.featured),
            Flag::Active => None,
        }
    }
}

impl StoredDocument for GalleryItem {
    const COLLECTION: Collection = Collection::Gallery;
    const MEDIA_FIELDS: &'static [&'static str] = &["/photo"];

    fn id(&self) -> &str {
        &self.id
    }

    fn sort_value(&self, field: SortField) -> SortValue {
        match field {
            SortField::CreatedAt => SortValue::Time(self.created_at),
            SortField::UpdatedAt => SortValue::Time(self.updated_at),
            SortField::SortOrder => SortValue::Int(self.sort_order),
            SortField::Title => SortValue::Text(self.title.clone()),
            SortField::PublishedAt => SortValue::Missing,
        }
    }
}

/// A bookable healing session (`sessions` collection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    /// Markdown body.
    pub description: String,
    /// Free text, e.g. "60 minutes".
    pub duration: String,
    #[serde(default)]
    pub hero_image: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Filterable for Session {
    fn flag(&self, flag: Flag) -> Option<bool> {
        match flag {
            Flag::Active => Some(self.is_active),
            Flag::Featured => None,
        }
    }
}

impl StoredDocument for Session {
    const COLLECTION: Collection = Collection::Sessions;
    const MEDIA_FIELDS: &'static [&'static str] = &["/heroImage"];

    fn id(&self) -> &str {
        &self.id
    }

    fn slug(&self) -> Option<&str> {
        Some(&self.slug)
    }

    fn sort_value(&self, field: SortField) -> SortValue {
        match field {
            SortField::CreatedAt => SortValue::Time(self.created_at),
            SortField::UpdatedAt => SortValue::Time(self.updated_at),
            SortField::Title => SortValue::Text(self.title.clone()),
            SortField::PublishedAt | SortField::SortOrder => SortValue::Missing,
        }
    }
}

/// Metadata of an uploaded image (`media` collection). The bytes live in
/// object storage under `media/{filename}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: String,
    /// Stored file name, unique per upload.
    pub filename: String,
    pub mime_type: String,
    pub filesize: i64,
    #[serde(default)]
    pub alt: Option<String>,
    /// Path the image is served from.
    pub url: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Filterable for Media {}

impl StoredDocument for Media {
    const COLLECTION: Collection = Collection::Media;

    fn id(&self) -> &str {
        &self.id
    }

    fn sort_value(&self, field: SortField) -> SortValue {
        match field {
            SortField::CreatedAt => SortValue::Time(self.created_at),
            SortField::UpdatedAt => SortValue::Time(self.updated_at),
            SortField::Title | SortField::PublishedAt | SortField::SortOrder => {
                SortValue::Missing
            }
        }
    }
}
