mod common;

use serde_json::{json, Value};

#[tokio::test]
async fn login_success_sets_cookie() {
    let env = common::TestEnv::start();
    let server = env.server();

    let response = server
        .post("/api/users/login")
        .json(&json!({ "email": "admin", "password": "admin" }))
        .await;

    response.assert_status_ok();
    let cookie = response.cookie("christos_session");
    assert!(cookie.http_only().unwrap_or(false));
    assert_eq!(cookie.path(), Some("/"));

    let body: Value = response.json();
    assert_eq!(body["user"]["id"], "admin");
    assert_eq!(body["user"]["roles"], json!(["admin"]));
}

#[tokio::test]
async fn login_accepts_email_case_insensitively() {
    let env = common::TestEnv::start();
    let server = env.server();

    let response = server
        .post("/api/users/login")
        .json(&json!({ "email": "Editor@Demo.Christos.Local", "password": "editor" }))
        .await;

    let body: Value = response.json();
    assert_eq!(body["user"]["id"], "editor");
    assert_eq!(body["user"]["email"], "editor@demo.christos.local");
}

#[tokio::test]
async fn login_invalid_credentials() {
    let env = common::TestEnv::start();
    let server = env.server_permissive();

    let response = server
        .post("/api/users/login")
        .json(&json!({ "email": "admin", "password": "wrongpassword" }))
        .await;

    response.assert_status_unauthorized();
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn me_with_valid_cookie() {
    let env = common::TestEnv::start();
    let server = env.server();

    common::login(&server, "editor").await;

    let response = server.get("/api/users/me").await;
    response.assert_status_ok();
    let user: Value = response.json();
    assert_eq!(user["id"], "editor");
    assert_eq!(user["roles"], json!(["editor"]));
}

#[tokio::test]
async fn me_without_cookie() {
    let env = common::TestEnv::start();
    let server = env.server_permissive();

    server.get("/api/users/me").await.assert_status_unauthorized();
}

#[tokio::test]
async fn tampered_cookie_is_anonymous() {
    let env = common::TestEnv::start();
    let server = env.server_permissive();

    let forged = serde_json::to_string(&json!({
        "id": "mallory",
        "email": "mallory@example.com",
        "roles": ["admin"],
    }))
    .unwrap();

    server
        .get("/api/users/me")
        .add_cookie(cookie::Cookie::new("christos_session", forged))
        .await
        .assert_status_unauthorized();
}

#[tokio::test]
async fn logout_clears_session() {
    let env = common::TestEnv::start();
    let server = env.server_permissive();

    common::login(&server, "admin").await;
    server.get("/api/users/me").await.assert_status_ok();

    common::logout(&server).await;
    server.get("/api/users/me").await.assert_status_unauthorized();
}

#[tokio::test]
async fn configured_accounts_replace_demo_accounts() {
    let mut config = christos::config::AppConfig::default();
    config.auth.accounts = vec![christos::config::AccountConfig {
        id: "christa".into(),
        email: "christa@example.com".into(),
        password_hash: christos::auth::accounts::hash_password("s3cret").unwrap(),
        roles: vec!["admin".into()],
    }];
    let env = common::TestEnv::with_config(config);
    let server = env.server_permissive();

    server
        .post("/api/users/login")
        .json(&json!({ "email": "admin", "password": "admin" }))
        .await
        .assert_status_unauthorized();

    server
        .post("/api/users/login")
        .json(&json!({ "email": "christa@example.com", "password": "s3cret" }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn demo_accounts_need_demo_mode() {
    let env = common::TestEnv::with_config(christos::config::AppConfig::default());
    let server = env.server_permissive();

    server
        .post("/api/users/login")
        .json(&json!({ "email": "admin", "password": "admin" }))
        .await
        .assert_status_unauthorized();
}
