mod common;

use serde_json::{json, Value};

#[tokio::test]
async fn homepage_defaults_are_public() {
    let env = common::TestEnv::start();
    let server = env.server();

    let homepage: Value = server.get("/api/globals/homepage").await.json();
    assert_eq!(homepage["globalType"], "homepage");
    assert_eq!(homepage["navigation"].as_array().unwrap().len(), 6);
    assert_eq!(homepage["elements"].as_array().unwrap().len(), 5);
    assert_eq!(homepage["hero"]["learnMoreHref"], "/about");
}

#[tokio::test]
async fn anonymous_cannot_update_homepage() {
    let env = common::TestEnv::start();
    let server = env.server_permissive();

    server
        .post("/api/globals/homepage")
        .json(&json!({ "hero": { "title": "Defaced" } }))
        .await
        .assert_status_forbidden();
}

#[tokio::test]
async fn update_merges_groups_and_populates_images() {
    let env = common::TestEnv::start();
    let server = env.server();
    common::login(&server, "editor").await;

    let image = common::upload_png(&server, "hero.png").await;

    let response: Value = server
        .post("/api/globals/homepage")
        .json(&json!({
            "hero": { "title": "Welcome home", "heroImage": image["id"] },
            "navigation": [{ "label": "Home", "href": "/" }],
        }))
        .await
        .json();
    assert_eq!(response["message"], "Global saved successfully.");
    assert_eq!(response["doc"]["hero"]["title"], "Welcome home");
    assert_eq!(response["doc"]["hero"]["kicker"], "Christos Medicine");
    assert_eq!(response["doc"]["navigation"].as_array().unwrap().len(), 1);

    let populated: Value = server
        .get("/api/globals/homepage")
        .add_query_param("depth", 1)
        .await
        .json();
    assert_eq!(populated["hero"]["heroImage"]["url"], image["url"]);

    let page = server.get("/").await.text();
    assert!(page.contains("Welcome home"));
    assert!(page.contains(image["url"].as_str().unwrap().replace('/', "&#x2F;").as_str()));
}

#[tokio::test]
async fn navigation_rows_are_bounded() {
    let env = common::TestEnv::start();
    let server = env.server_permissive();
    common::login(&server, "admin").await;

    let rows: Vec<Value> = (0..9)
        .map(|i| json!({ "label": format!("Link {i}"), "href": format!("/{i}") }))
        .collect();

    server
        .post("/api/globals/homepage")
        .json(&json!({ "navigation": rows }))
        .await
        .assert_status_bad_request();
}
