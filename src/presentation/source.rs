use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::collection::{list_documents, process_find_by_slug};
use crate::api::homepage::process_get_homepage;
use crate::db::homepage::HomepageRepository;
use crate::db::models::{Article, GalleryItem, Media, Session, StoredDocument};
use crate::db::query::{ListQuery, Page};
use crate::db::repository::Repository;
use crate::error::AppError;
use crate::policy::access::Collection;

/// Where the public pages get their content from.
///
/// Every method answers `None` when the content is unavailable, whatever the
/// reason; pages fall back to defaults or empty lists.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// The homepage global with media populated.
    async fn homepage(&self) -> Option<Value>;

    /// One page of a collection, as seen by an anonymous visitor.
    async fn list(&self, collection: Collection, query: &ListQuery) -> Option<Page<Value>>;

    /// One document by slug, media populated.
    async fn find_by_slug(&self, collection: Collection, slug: &str) -> Option<Value>;
}

/// Fetches content from a remote CMS over its JSON API.
pub struct HttpContentSource {
    client: reqwest::Client,
    base_url: url::Url,
}

impl HttpContentSource {
    pub fn new(cms_url: &str) -> Result<Self, AppError> {
        let base_url = url::Url::parse(cms_url.trim())
            .map_err(|e| AppError::Internal(format!("Invalid CMS URL '{}': {}", cms_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Internal(format!(
                "Invalid CMS URL '{}': not a base URL",
                cms_url
            )));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    /// The CMS URL for `segments` below the base URL. Each segment is
    /// percent-encoded on its own, so `/`, `?` or `..` inside one cannot
    /// leave it.
    fn endpoint(&self, segments: &[&str], params: &[(String, String)]) -> Option<url::Url> {
        let mut url = self.base_url.clone();
        match url.path_segments_mut() {
            Ok(mut path) => {
                path.pop_if_empty().extend(segments);
            }
            Err(()) => {
                tracing::warn!(base_url = %self.base_url, "CMS URL cannot take a path");
                return None;
            }
        }
        url.query_pairs_mut().clear().extend_pairs(params);
        Some(url)
    }

    async fn get_json(&self, url: url::Url) -> Option<Value> {
        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "CMS request failed");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(url = %url, status = %response.status(), "CMS request unsuccessful");
            return None;
        }
        match response.json::<Value>().await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "CMS returned invalid JSON");
                None
            }
        }
    }
}

fn depth_param() -> Vec<(String, String)> {
    vec![("depth".to_string(), "1".to_string())]
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn homepage(&self) -> Option<Value> {
        let url = self.endpoint(&["api", "globals", "homepage"], &depth_param())?;
        self.get_json(url).await
    }

    async fn list(&self, collection: Collection, query: &ListQuery) -> Option<Page<Value>> {
        let url = self.endpoint(&["api", collection.slug()], &query.to_query_pairs())?;
        let value = self.get_json(url).await?;
        match serde_json::from_value(value) {
            Ok(page) => Some(page),
            Err(e) => {
                tracing::warn!(%collection, error = %e, "CMS returned an unexpected list shape");
                None
            }
        }
    }

    async fn find_by_slug(&self, collection: Collection, slug: &str) -> Option<Value> {
        // a dot segment would be dropped from the path and hit the list route
        if matches!(slug, "" | "." | "..") {
            return None;
        }
        let url = self.endpoint(&["api", collection.slug(), "slug", slug], &depth_param())?;
        self.get_json(url).await
    }
}

/// Reads straight from the local store as an anonymous visitor.
pub struct StoreContentSource {
    articles: Arc<dyn Repository<Article>>,
    gallery: Arc<dyn Repository<GalleryItem>>,
    sessions: Arc<dyn Repository<Session>>,
    media: Arc<dyn Repository<Media>>,
    homepage: Arc<dyn HomepageRepository>,
}

impl StoreContentSource {
    pub fn new(
        articles: Arc<dyn Repository<Article>>,
        gallery: Arc<dyn Repository<GalleryItem>>,
        sessions: Arc<dyn Repository<Session>>,
        media: Arc<dyn Repository<Media>>,
        homepage: Arc<dyn HomepageRepository>,
    ) -> Self {
        Self {
            articles,
            gallery,
            sessions,
            media,
            homepage,
        }
    }

    async fn list_in<T: StoredDocument>(
        &self,
        repo: &dyn Repository<T>,
        query: &ListQuery,
    ) -> Option<Page<Value>> {
        list_documents(repo, self.media.as_ref(), None, query)
            .await
            .map_err(|e| tracing::warn!(collection = %T::COLLECTION, error = %e, "Failed to list content"))
            .ok()
    }

    async fn find_in<T: StoredDocument>(
        &self,
        repo: &dyn Repository<T>,
        slug: &str,
    ) -> Option<Value> {
        match process_find_by_slug(repo, self.media.as_ref(), None, slug, true).await {
            Ok(doc) => Some(doc),
            Err(AppError::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!(collection = %T::COLLECTION, slug, error = %e, "Failed to load content");
                None
            }
        }
    }
}

#[async_trait]
impl ContentSource for StoreContentSource {
    async fn homepage(&self) -> Option<Value> {
        process_get_homepage(self.homepage.as_ref(), self.media.as_ref(), None, true)
            .await
            .map_err(|e| tracing::warn!(error = %e, "Failed to load homepage"))
            .ok()
    }

    async fn list(&self, collection: Collection, query: &ListQuery) -> Option<Page<Value>> {
        match collection {
            Collection::Articles => self.list_in(self.articles.as_ref(), query).await,
            Collection::Gallery => self.list_in(self.gallery.as_ref(), query).await,
            Collection::Sessions => self.list_in(self.sessions.as_ref(), query).await,
            Collection::Media => self.list_in(self.media.as_ref(), query).await,
            Collection::Users | Collection::Homepage => None,
        }
    }

    async fn find_by_slug(&self, collection: Collection, slug: &str) -> Option<Value> {
        match collection {
            Collection::Articles => self.find_in(self.articles.as_ref(), slug).await,
            Collection::Sessions => self.find_in(self.sessions.as_ref(), slug).await,
            _ => None,
        }
    }
}
