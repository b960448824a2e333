use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use tera::Context;

use crate::api::collection::list_documents;
use crate::app::AppState;
use crate::auth::accounts::CurrentActor;
use crate::auth::models::Actor;
use crate::config::SiteConfig;
use crate::db::models::{Article, GalleryItem, Media};
use crate::db::query::{ListParams, ListQuery, Page, SortField, SortSpec, MAX_LIMIT};
use crate::db::repository::Repository;
use crate::error::AppError;
use crate::models::publication::PublicationState;
use crate::models::timestamp;
use crate::policy::access::Collection;
use crate::policy::filter::{Filter, Flag};
use crate::presentation::homepage::{
    build_homepage, default_navigation, resolve_media_url, LinkView,
};
use crate::presentation::source::ContentSource;
use crate::rendering::markdown::{excerpt, render_markdown};
use crate::rendering::templates::Templates;

const EXCERPT_CHARS: usize = 200;
const DASHBOARD_BLOGS_LIMIT: u64 = 20;
const DASHBOARD_GALLERY_LIMIT: u64 = 50;

/// Last resort when even the error template fails.
const FALLBACK_ERROR_HTML: &str =
    "<!DOCTYPE html><html><body><h1>Something went wrong</h1></body></html>";

/// Placeholder copy for sections that are not built out yet.
struct ComingSoon {
    title: &'static str,
    description: &'static str,
}

const ABOUT: ComingSoon = ComingSoon {
    title: "About Christos Medicine",
    description: "This page will present the story, mission, and personal background of Christos Medicine.",
};

const CONTACT: ComingSoon = ComingSoon {
    title: "Contact",
    description: "This page will share the ways to reach Christos Medicine for questions and session enquiries.",
};

const DONATION: ComingSoon = ComingSoon {
    title: "Support Christos Medicine",
    description: "This page will explain how donations sustain this healing space and the sessions it offers.",
};

// ---------------------------------------------------------------------------
// View models
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct PostView {
    title: String,
    slug: String,
    published: Option<String>,
    excerpt: String,
    image_url: Option<String>,
    image_alt: String,
}

#[derive(Debug, Serialize)]
struct GalleryView {
    title: String,
    description: Option<String>,
    featured: bool,
    image_url: Option<String>,
    image_alt: String,
}

#[derive(Debug, Serialize)]
struct SessionView {
    title: String,
    slug: String,
    duration: String,
    short_description: String,
    description_html: String,
    image_url: Option<String>,
    image_alt: String,
}

#[derive(Debug, Serialize)]
struct BlogRow {
    title: String,
    status: String,
    created: String,
}

#[derive(Debug, Serialize)]
struct GalleryRow {
    title: String,
    featured: bool,
    sort_order: i64,
}

fn text(doc: &Value, field: &str) -> String {
    doc.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn display_date(raw: Option<&str>) -> Option<String> {
    timestamp::parse(raw?).map(|at| at.format("%B %-d, %Y").to_string())
}

/// Image URL and alt text of a populated media field.
fn image(doc: &Value, field: &str, site: &SiteConfig) -> (Option<String>, String) {
    let media = doc.get(field);
    let url = resolve_media_url(media, site.base_url.as_deref());
    let alt = media
        .and_then(|m| m.get("alt"))
        .and_then(Value::as_str)
        .filter(|alt| !alt.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| text(doc, "title"));
    (url, alt)
}

fn post_view(doc: &Value, site: &SiteConfig) -> PostView {
    let (image_url, image_alt) = image(doc, "featuredImage", site);
    let teaser = doc
        .get("excerpt")
        .and_then(Value::as_str)
        .filter(|e| !e.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| excerpt(&text(doc, "content"), EXCERPT_CHARS));
    PostView {
        title: text(doc, "title"),
        slug: text(doc, "slug"),
        published: display_date(doc.get("publishedAt").and_then(Value::as_str)),
        excerpt: teaser,
        image_url,
        image_alt,
    }
}

fn gallery_view(doc: &Value, site: &SiteConfig) -> GalleryView {
    let (image_url, image_alt) = image(doc, "photo", site);
    GalleryView {
        title: text(doc, "title"),
        description: doc
            .get("description")
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
            .map(str::to_string),
        featured: doc.get("featured").and_then(Value::as_bool).unwrap_or(false),
        image_url,
        image_alt,
    }
}

fn session_view(doc: &Value, site: &SiteConfig) -> SessionView {
    let (image_url, image_alt) = image(doc, "heroImage", site);
    SessionView {
        title: text(doc, "title"),
        slug: text(doc, "slug"),
        duration: text(doc, "duration"),
        short_description: text(doc, "shortDescription"),
        description_html: render_markdown(&text(doc, "description")),
        image_url,
        image_alt,
    }
}

fn page_context(title: &str) -> Context {
    let mut context = Context::new();
    context.insert("title", title);
    context.insert("navigation", &default_navigation());
    context
}

// ---------------------------------------------------------------------------
// Core rendering, separated from the handlers for testability
// ---------------------------------------------------------------------------

pub async fn render_home(
    source: &dyn ContentSource,
    templates: &Templates,
    site: &SiteConfig,
) -> Result<String, AppError> {
    let remote = source.homepage().await;
    if remote.is_none() {
        tracing::debug!("Homepage global unavailable, rendering defaults");
    }
    let view = build_homepage(remote.as_ref(), site);

    let mut context = page_context("Home");
    context.insert("page", &view);
    templates.render("home.html", &context)
}

pub async fn render_blog_index(
    source: &dyn ContentSource,
    templates: &Templates,
    site: &SiteConfig,
    page: u64,
) -> Result<String, AppError> {
    let mut query = ListQuery::new(SortSpec::descending(SortField::PublishedAt))
        .with_filter(Filter::published())
        .populated();
    query.page = page;

    let listing = source
        .list(Collection::Articles, &query)
        .await
        .unwrap_or_else(|| Page::empty(&query));
    let posts: Vec<PostView> = listing.docs.iter().map(|doc| post_view(doc, site)).collect();

    let mut context = page_context("Blog");
    context.insert("posts", &posts);
    context.insert("pagination", &listing.map(|_| ()));
    templates.render("blogs.html", &context)
}

/// `Ok(None)` when no published article has this slug.
pub async fn render_blog_post(
    source: &dyn ContentSource,
    templates: &Templates,
    site: &SiteConfig,
    slug: &str,
) -> Result<Option<String>, AppError> {
    let Some(doc) = source.find_by_slug(Collection::Articles, slug).await else {
        return Ok(None);
    };
    if doc.get("status").and_then(Value::as_str) != Some(PublicationState::Published.as_str()) {
        return Ok(None);
    }

    let post = post_view(&doc, site);
    let mut context = page_context(&post.title);
    context.insert("body_html", &render_markdown(&text(&doc, "content")));
    context.insert("post", &post);
    templates.render("blog.html", &context).map(Some)
}

pub async fn render_gallery(
    source: &dyn ContentSource,
    templates: &Templates,
    site: &SiteConfig,
) -> Result<String, AppError> {
    let query = ListQuery::new(SortSpec::ascending(SortField::SortOrder))
        .with_limit(MAX_LIMIT)
        .populated();
    let items: Vec<GalleryView> = source
        .list(Collection::Gallery, &query)
        .await
        .map(|listing| listing.docs.iter().map(|doc| gallery_view(doc, site)).collect())
        .unwrap_or_default();

    let mut context = page_context("Gallery");
    context.insert("items", &items);
    templates.render("gallery.html", &context)
}

pub async fn render_sessions(
    source: &dyn ContentSource,
    templates: &Templates,
    site: &SiteConfig,
) -> Result<String, AppError> {
    let query = ListQuery::new(SortSpec::ascending(SortField::CreatedAt))
        .with_limit(MAX_LIMIT)
        .with_filter(Filter::FlagEquals(Flag::Active, true))
        .populated();
    let sessions: Vec<SessionView> = source
        .list(Collection::Sessions, &query)
        .await
        .map(|listing| listing.docs.iter().map(|doc| session_view(doc, site)).collect())
        .unwrap_or_default();

    let booking_href = site
        .session_payment_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or("/contact");

    let mut context = page_context("Sessions");
    context.insert("sessions", &sessions);
    context.insert("booking", &LinkView::new("Book this session", booking_href));
    templates.render("sessions.html", &context)
}

fn render_coming_soon(templates: &Templates, page: &ComingSoon) -> Result<String, AppError> {
    let mut context = page_context(page.title);
    context.insert("description", page.description);
    templates.render("placeholder.html", &context)
}

/// The newest articles the actor may read, for the editors' overview.
pub async fn render_blogs_dashboard(
    articles: &dyn Repository<Article>,
    media: &dyn Repository<Media>,
    actor: Option<&Actor>,
    templates: &Templates,
) -> Result<String, AppError> {
    let query = ListQuery::new(SortSpec::descending(SortField::CreatedAt))
        .with_limit(DASHBOARD_BLOGS_LIMIT);
    let listing = list_documents(articles, media, actor, &query).await?;

    let rows: Vec<BlogRow> = listing
        .docs
        .iter()
        .map(|doc| BlogRow {
            title: text(doc, "title"),
            status: text(doc, "status"),
            created: doc
                .get("createdAt")
                .and_then(Value::as_str)
                .and_then(timestamp::parse)
                .map(|at| at.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_default(),
        })
        .collect();

    let mut context = page_context("Blogs dashboard");
    context.insert("rows", &rows);
    templates.render("dashboard_blogs.html", &context)
}

pub async fn render_gallery_dashboard(
    gallery: &dyn Repository<GalleryItem>,
    media: &dyn Repository<Media>,
    actor: Option<&Actor>,
    templates: &Templates,
) -> Result<String, AppError> {
    let query = ListQuery::new(SortSpec::ascending(SortField::SortOrder))
        .with_limit(DASHBOARD_GALLERY_LIMIT);
    let listing = list_documents(gallery, media, actor, &query).await?;

    let rows: Vec<GalleryRow> = listing
        .docs
        .iter()
        .map(|doc| GalleryRow {
            title: text(doc, "title"),
            featured: doc.get("featured").and_then(Value::as_bool).unwrap_or(false),
            sort_order: doc.get("sortOrder").and_then(Value::as_i64).unwrap_or(0),
        })
        .collect();

    let mut context = page_context("Gallery dashboard");
    context.insert("rows", &rows);
    templates.render("dashboard_gallery.html", &context)
}

/// An HTML error page with the given status.
pub fn error_page(templates: &Templates, status: StatusCode, message: &str) -> Response {
    let title = status.canonical_reason().unwrap_or("Error");
    let mut context = page_context(title);
    context.insert("message", message);
    match templates.render("error.html", &context) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render error page");
            (status, Html(FALLBACK_ERROR_HTML)).into_response()
        }
    }
}

fn into_page(templates: &Templates, result: Result<String, AppError>) -> Response {
    match result {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render page");
            error_page(
                templates,
                StatusCode::INTERNAL_SERVER_ERROR,
                "This page could not be loaded right now.",
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /`
pub async fn home_page(State(state): State<AppState>) -> Response {
    let result = render_home(state.content_source.as_ref(), &state.templates, &state.site).await;
    into_page(&state.templates, result)
}

/// `GET /blogs`
pub async fn blogs_page(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Response {
    let result = render_blog_index(
        state.content_source.as_ref(),
        &state.templates,
        &state.site,
        params.page(),
    )
    .await;
    into_page(&state.templates, result)
}

/// `GET /blogs/{slug}`
pub async fn blog_post_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Response {
    match render_blog_post(state.content_source.as_ref(), &state.templates, &state.site, &slug)
        .await
    {
        Ok(Some(html)) => Html(html).into_response(),
        Ok(None) => error_page(
            &state.templates,
            StatusCode::NOT_FOUND,
            "This article does not exist or is not published.",
        ),
        Err(e) => into_page(&state.templates, Err(e)),
    }
}

/// `GET /gallery`
pub async fn gallery_page(State(state): State<AppState>) -> Response {
    let result =
        render_gallery(state.content_source.as_ref(), &state.templates, &state.site).await;
    into_page(&state.templates, result)
}

/// `GET /sessions`
pub async fn sessions_page(State(state): State<AppState>) -> Response {
    let result =
        render_sessions(state.content_source.as_ref(), &state.templates, &state.site).await;
    into_page(&state.templates, result)
}

pub async fn about_page(State(state): State<AppState>) -> Response {
    into_page(&state.templates, render_coming_soon(&state.templates, &ABOUT))
}

pub async fn contact_page(State(state): State<AppState>) -> Response {
    into_page(&state.templates, render_coming_soon(&state.templates, &CONTACT))
}

pub async fn donation_page(State(state): State<AppState>) -> Response {
    into_page(&state.templates, render_coming_soon(&state.templates, &DONATION))
}

/// `GET /dashboard/blogs`
pub async fn blogs_dashboard_page(State(state): State<AppState>, actor: CurrentActor) -> Response {
    let result = render_blogs_dashboard(
        state.articles.as_ref(),
        state.media.as_ref(),
        actor.actor(),
        &state.templates,
    )
    .await;
    into_page(&state.templates, result)
}

/// `GET /dashboard/gallery`
pub async fn gallery_dashboard_page(
    State(state): State<AppState>,
    actor: CurrentActor,
) -> Response {
    let result = render_gallery_dashboard(
        state.gallery.as_ref(),
        state.media.as_ref(),
        actor.actor(),
        &state.templates,
    )
    .await;
    into_page(&state.templates, result)
}

/// Fallback for unknown paths.
pub async fn not_found_page(State(state): State<AppState>) -> Response {
    error_page(
        &state.templates,
        StatusCode::NOT_FOUND,
        "The page you are looking for does not exist.",
    )
}
