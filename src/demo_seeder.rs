use chrono::{Duration, Utc};

use crate::app::AppState;
use crate::db::models::{Article, Session};
use crate::models::publication::{Publication, PublicationState};
use crate::models::slug::derive_slug;

/// Author id of the seeded articles: the demo admin account.
const DEMO_AUTHOR: &str = "admin";

struct DemoArticle {
    title: &'static str,
    content: &'static str,
    categories: &'static [&'static str],
    state: PublicationState,
}

// Using include_str! to embed demo content directly into the binary
const DEMO_ARTICLES: &[DemoArticle] = &[
    DemoArticle {
        title: "Returning to the Body",
        content: include_str!("../demo_data/returning_to_the_body.md"),
        categories: &["practice"],
        state: PublicationState::Published,
    },
    DemoArticle {
        title: "The Five Elements",
        content: include_str!("../demo_data/the_five_elements.md"),
        categories: &["teaching"],
        state: PublicationState::Draft,
    },
];

/// Insert sample articles and a session into an empty store. Existing
/// documents with the same slug are left alone.
pub async fn seed_demo_data(state: &AppState) {
    tracing::info!("Starting demo data seeding...");
    let now = Utc::now();

    for (index, demo) in DEMO_ARTICLES.iter().enumerate() {
        let slug = derive_slug(demo.title);
        match state.articles.find_by_slug(&slug, None).await {
            Ok(Some(_)) => {
                tracing::info!(slug = %slug, "Article already exists, skipping");
                continue;
            }
            Err(e) => {
                tracing::error!(slug = %slug, error = %e, "Failed to check for existing article");
                continue;
            }
            Ok(None) => {}
        }

        // older entries first so the newest-first listings look natural
        let created_at = now - Duration::days((DEMO_ARTICLES.len() - index) as i64);
        let mut article = Article {
            id: uuid::Uuid::new_v4().to_string(),
            title: demo.title.to_string(),
            slug: slug.clone(),
            author: DEMO_AUTHOR.to_string(),
            categories: demo.categories.iter().map(|c| c.to_string()).collect(),
            featured_image: None,
            excerpt: None,
            content: demo.content.to_string(),
            published_at: None,
            status: PublicationState::Draft,
            created_at,
            updated_at: created_at,
        };
        if let Ok(publication) = Publication::draft().transition(Some(demo.state), created_at) {
            article.set_publication(publication);
        }

        match state.articles.insert(article).await {
            Ok(()) => tracing::info!(slug = %slug, "Seeded demo article"),
            Err(e) => tracing::error!(slug = %slug, error = %e, "Failed to seed demo article"),
        }
    }

    let session_slug = derive_slug("Heart Opening Session");
    match state.sessions.find_by_slug(&session_slug, None).await {
        Ok(Some(_)) => tracing::info!(slug = %session_slug, "Session already exists, skipping"),
        Ok(None) => {
            let session = Session {
                id: uuid::Uuid::new_v4().to_string(),
                title: "Heart Opening Session".to_string(),
                slug: session_slug.clone(),
                short_description: "A gentle online session to reconnect with the heart centre."
                    .to_string(),
                description: include_str!("../demo_data/heart_opening_session.md").to_string(),
                duration: "60 minutes".to_string(),
                hero_image: None,
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            match state.sessions.insert(session).await {
                Ok(()) => tracing::info!(slug = %session_slug, "Seeded demo session"),
                Err(e) => tracing::error!(error = %e, "Failed to seed demo session"),
            }
        }
        Err(e) => tracing::error!(error = %e, "Failed to check for existing session"),
    }

    tracing::info!("Demo data seeding completed.");
}
