#![allow(dead_code)]

use axum::Router;
use serde_json::{json, Value};

use christos::app::{build_router, AppState};
use christos::config::AppConfig;

/// Minimal 1x1 PNG.
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, // PNG signature
    0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, // IHDR chunk
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, // 1x1
    0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE, // bit depth, color type, CRC
    0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, // IDAT chunk
    0x08, 0xD7, 0x63, 0xF8, 0xCF, 0xC0, 0x00, 0x00, // compressed data
    0x00, 0x02, 0x00, 0x01, 0xE2, 0x21, 0xBC, 0x33, // CRC
    0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, // IEND chunk
    0xAE, 0x42, 0x60, 0x82,
];

/// The full application on in-memory stores, with the demo accounts
/// `admin/admin` and `editor/editor`.
pub struct TestEnv {
    pub state: AppState,
    pub router: Router,
}

impl TestEnv {
    pub fn start() -> Self {
        Self::with_config(AppConfig::demo())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let state = AppState::in_memory(&config).expect("Failed to build in-memory state");
        let router = build_router(state.clone());
        Self { state, router }
    }

    /// Build an `axum_test::TestServer` from this environment's router.
    pub fn server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .save_cookies()
            .expect_success_by_default()
            .build(self.router.clone())
    }

    /// Build a `TestServer` that does NOT expect success by default (for error tests).
    pub fn server_permissive(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .save_cookies()
            .build(self.router.clone())
    }
}

/// Sign in with a demo account; the session cookie is kept by the server.
pub async fn login(server: &axum_test::TestServer, account: &str) {
    server
        .post("/api/users/login")
        .json(&json!({ "email": account, "password": account }))
        .await
        .assert_status_ok();
}

pub async fn logout(server: &axum_test::TestServer) {
    server.post("/api/users/logout").await.assert_status_ok();
}

/// Create an article and return the stored document.
pub async fn create_article(server: &axum_test::TestServer, title: &str) -> Value {
    let response = server
        .post("/api/blogs")
        .json(&json!({ "title": title, "content": format!("About {title}.") }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()["doc"].clone()
}

/// Upload [`PNG_BYTES`] and return the media document.
pub async fn upload_png(server: &axum_test::TestServer, file_name: &str) -> Value {
    use axum_test::multipart::{MultipartForm, Part};

    let form = MultipartForm::new()
        .add_part(
            "file",
            Part::bytes(PNG_BYTES.to_vec())
                .file_name(file_name.to_string())
                .mime_type("image/png"),
        )
        .add_text("alt", "A test image");
    let response = server.post("/api/media").multipart(form).await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json::<Value>()["doc"].clone()
}
