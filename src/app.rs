use std::sync::Arc;

use axum::extract::FromRef;
use axum::routing::get;
use axum::Router;
use axum_extra::extract::cookie::Key;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::auth::accounts::{self, AccountDirectory};
use crate::config::{AppConfig, MediaBackend, SiteConfig, StoreBackend, MIN_COOKIE_SECRET_LEN};
use crate::db::homepage::{HomepageRepository, MemoryHomepageRepository, MongoHomepageRepository};
use crate::db::memory::MemoryRepository;
use crate::db::models::{Article, GalleryItem, Media, Session, StoredDocument};
use crate::db::repository::{MongoRepository, Repository};
use crate::error::AppError;
use crate::presentation::pages;
use crate::presentation::source::{ContentSource, HttpContentSource, StoreContentSource};
use crate::rendering::templates::Templates;
use crate::storage::client::{MemoryStorageClient, S3StorageClient, StorageClient};

/// Everything the handlers share.
#[derive(Clone)]
pub struct AppState {
    pub articles: Arc<dyn Repository<Article>>,
    pub gallery: Arc<dyn Repository<GalleryItem>>,
    pub sessions: Arc<dyn Repository<Session>>,
    pub media: Arc<dyn Repository<Media>>,
    pub homepage: Arc<dyn HomepageRepository>,
    pub storage_client: Arc<dyn StorageClient>,
    pub content_source: Arc<dyn ContentSource>,
    pub accounts: Arc<AccountDirectory>,
    pub templates: Arc<Templates>,
    pub site: SiteConfig,
    pub cookie_key: Key,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Signing key for session cookies, derived from the configured secret with HKDF.
pub fn cookie_key(secret: &str) -> Result<Key, AppError> {
    if secret.len() < MIN_COOKIE_SECRET_LEN {
        return Err(AppError::Internal(format!(
            "Cookie secret must be at least {} bytes long",
            MIN_COOKIE_SECRET_LEN
        )));
    }
    Ok(Key::derive_from(secret.as_bytes()))
}

/// The collection repositories, before the rest of the state is assembled.
struct Stores {
    articles: Arc<dyn Repository<Article>>,
    gallery: Arc<dyn Repository<GalleryItem>>,
    sessions: Arc<dyn Repository<Session>>,
    media: Arc<dyn Repository<Media>>,
    homepage: Arc<dyn HomepageRepository>,
}

impl Stores {
    fn in_memory() -> Self {
        Self {
            articles: Arc::new(MemoryRepository::<Article>::new()),
            gallery: Arc::new(MemoryRepository::<GalleryItem>::new()),
            sessions: Arc::new(MemoryRepository::<Session>::new()),
            media: Arc::new(MemoryRepository::<Media>::new()),
            homepage: Arc::new(MemoryHomepageRepository::default()),
        }
    }

    async fn mongo(db: &mongodb::Database) -> Result<Self, AppError> {
        let homepage = MongoHomepageRepository::new(db);
        homepage.ensure_indexes().await?;
        Ok(Self {
            articles: mongo_repository::<Article>(db).await?,
            gallery: mongo_repository::<GalleryItem>(db).await?,
            sessions: mongo_repository::<Session>(db).await?,
            media: mongo_repository::<Media>(db).await?,
            homepage: Arc::new(homepage),
        })
    }
}

async fn mongo_repository<T: StoredDocument>(
    db: &mongodb::Database,
) -> Result<Arc<dyn Repository<T>>, AppError> {
    let repo = MongoRepository::<T>::new(db);
    repo.ensure_indexes().await?;
    Ok(Arc::new(repo))
}

impl AppState {
    /// State backed entirely by in-memory stores, whatever the configured backends.
    pub fn in_memory(config: &AppConfig) -> Result<Self, AppError> {
        Self::assemble(config, Stores::in_memory(), Arc::new(MemoryStorageClient::new()))
    }

    /// State for the configured backends.
    pub async fn connect(config: &AppConfig) -> Result<Self, AppError> {
        let stores = match config.store.backend {
            StoreBackend::Memory => {
                tracing::info!("Using the in-memory document store");
                Stores::in_memory()
            }
            StoreBackend::Mongo => {
                let client = mongodb::Client::with_uri_str(&config.store.mongodb_uri)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                let db = client.database(&config.store.mongodb_database);
                let stores = Stores::mongo(&db).await?;
                tracing::info!(
                    database = %config.store.mongodb_database,
                    "Connected to MongoDB"
                );
                stores
            }
        };

        let storage_client: Arc<dyn StorageClient> = match config.media.backend {
            MediaBackend::Memory => Arc::new(MemoryStorageClient::new()),
            MediaBackend::S3 => {
                let client = S3StorageClient::from_config(&config.media).await?;
                tracing::info!(bucket = %config.media.s3_bucket, "S3 storage client initialized");
                Arc::new(client)
            }
        };

        Self::assemble(config, stores, storage_client)
    }

    fn assemble(
        config: &AppConfig,
        stores: Stores,
        storage_client: Arc<dyn StorageClient>,
    ) -> Result<Self, AppError> {
        let content_source: Arc<dyn ContentSource> = match config
            .site
            .cms_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
        {
            Some(cms_url) => {
                tracing::info!(cms_url, "Pages read content from a remote CMS");
                Arc::new(HttpContentSource::new(cms_url)?)
            }
            None => Arc::new(StoreContentSource::new(
                stores.articles.clone(),
                stores.gallery.clone(),
                stores.sessions.clone(),
                stores.media.clone(),
                stores.homepage.clone(),
            )),
        };

        Ok(Self {
            articles: stores.articles,
            gallery: stores.gallery,
            sessions: stores.sessions,
            media: stores.media,
            homepage: stores.homepage,
            storage_client,
            content_source,
            accounts: Arc::new(AccountDirectory::from_config(&config.auth, config.demo_mode)),
            templates: Arc::new(Templates::new()?),
            site: config.site.clone(),
            cookie_key: cookie_key(&config.auth.cookie_secret)?,
        })
    }
}

/// Routes of one collection: list/create, by id, and optionally by slug.
fn collection_routes<T: api::collection::ApiCollection>(with_slug: bool) -> Router<AppState> {
    use api::collection::*;

    let router = Router::new()
        .route("/", get(list_handler::<T>).post(create_handler::<T>))
        .route(
            "/{id}",
            get(find_handler::<T>)
                .patch(update_handler::<T>)
                .delete(delete_handler::<T>),
        );
    if with_slug {
        router.route("/slug/{slug}", get(find_by_slug_handler::<T>))
    } else {
        router
    }
}

fn media_routes() -> Router<AppState> {
    use api::collection::{find_handler, list_handler, update_handler};
    use api::media::*;

    Router::new()
        .route("/", get(list_handler::<Media>).post(upload_media_handler))
        .route(
            "/{id}",
            get(find_handler::<Media>)
                .patch(update_handler::<Media>)
                .delete(delete_media_handler),
        )
        .route("/file/{filename}", get(serve_media_handler))
}

/// The complete application: Content API, sign-in and public pages.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/blogs", collection_routes::<Article>(true))
        .nest("/gallery", collection_routes::<GalleryItem>(false))
        .nest("/sessions", collection_routes::<Session>(true))
        .nest("/media", media_routes())
        .route(
            "/globals/homepage",
            get(api::homepage::get_homepage_handler).post(api::homepage::update_homepage_handler),
        )
        .route("/users/login", axum::routing::post(accounts::login_handler))
        .route("/users/me", get(accounts::me_handler))
        .route("/users/logout", axum::routing::post(accounts::logout_handler))
        .route("/schemas", get(api::schemas::list_schemas_handler))
        .route("/schemas/{collection}", get(api::schemas::get_schema_handler));

    Router::new()
        .nest("/api", api)
        .route("/", get(pages::home_page))
        .route("/blogs", get(pages::blogs_page))
        .route("/blogs/{slug}", get(pages::blog_post_page))
        .route("/gallery", get(pages::gallery_page))
        .route("/sessions", get(pages::sessions_page))
        .route("/about", get(pages::about_page))
        .route("/contact", get(pages::contact_page))
        .route("/donation", get(pages::donation_page))
        .route("/dashboard/blogs", get(pages::blogs_dashboard_page))
        .route("/dashboard/gallery", get(pages::gallery_dashboard_page))
        .nest_service("/static", ServeDir::new("static"))
        .fallback(pages::not_found_page)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_key_is_deterministic() {
        let a = cookie_key("a-secret-that-is-long-enough-for-hkdf").unwrap();
        let b = cookie_key("a-secret-that-is-long-enough-for-hkdf").unwrap();
        let c = cookie_key("another-secret-that-is-long-enough-too").unwrap();
        assert_eq!(a.master(), b.master());
        assert_ne!(a.master(), c.master());
    }

    #[test]
    fn test_short_cookie_secret_is_rejected() {
        assert!(matches!(cookie_key("secret"), Err(AppError::Internal(_))));
    }

    #[test]
    fn test_in_memory_state_reads_from_store() {
        let state = AppState::in_memory(&AppConfig::demo()).unwrap();
        assert!(!state.accounts.is_empty());
        assert!(state.site.cms_url.is_none());
    }
}
