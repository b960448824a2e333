use anyhow::Context;
use christos::app::{build_router, AppState};
use christos::config::AppConfig;
use christos::demo_seeder::seed_demo_data;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "christos=info,tower_http=info".into()),
        )
        .init();

    tracing::info!("Starting Christos server...");

    let config = AppConfig::load().context("Failed to load configuration")?;
    if config.demo_mode {
        tracing::warn!("Demo mode is enabled; do not expose this instance publicly");
        if config.uses_default_secret() {
            tracing::warn!("Session cookies are signed with the development secret");
        }
    }

    let state = AppState::connect(&config)
        .await
        .context("Failed to initialize application state")?;

    if config.demo_mode {
        seed_demo_data(&state).await;
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server_addr))?;
    tracing::info!("Listening on http://{}", config.server_addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
