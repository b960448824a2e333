mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

async fn create_item(server: &axum_test::TestServer, body: Value) -> Value {
    let response = server.post("/api/gallery").json(&body).await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["doc"].clone()
}

#[tokio::test]
async fn gallery_items_sort_by_sort_order_and_populate_photos() {
    let env = common::TestEnv::start();
    let server = env.server();
    common::login(&server, "editor").await;

    let photo = common::upload_png(&server, "sunrise.png").await;
    let photo_id = photo["id"].as_str().unwrap();

    create_item(&server, json!({ "title": "Later", "photo": photo_id, "sortOrder": 5 })).await;
    let first = create_item(
        &server,
        json!({ "title": "First", "photo": photo_id, "sortOrder": 1, "featured": true }),
    )
    .await;
    assert_eq!(first["featured"], true);

    common::logout(&server).await;

    let page: Value = server.get("/api/gallery").await.json();
    assert_eq!(page["docs"][0]["title"], "First");
    assert_eq!(page["docs"][1]["title"], "Later");
    assert_eq!(page["docs"][0]["photo"], photo_id);

    let populated: Value = server
        .get("/api/gallery")
        .add_query_param("depth", 1)
        .await
        .json();
    assert_eq!(populated["docs"][0]["photo"]["id"], photo_id);
    assert_eq!(populated["docs"][0]["photo"]["alt"], "A test image");

    let featured: Value = server
        .get("/api/gallery")
        .add_query_param("featured", true)
        .await
        .json();
    assert_eq!(featured["totalDocs"], 1);
}

#[tokio::test]
async fn gallery_item_requires_existing_photo() {
    let env = common::TestEnv::start();
    let server = env.server_permissive();
    common::login(&server, "editor").await;

    let response = server
        .post("/api/gallery")
        .json(&json!({ "title": "Ghost", "photo": "missing-media" }))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(
        body["error"],
        "The following fields are invalid: photo: Media 'missing-media' does not exist"
    );

    server
        .post("/api/gallery")
        .json(&json!({ "title": "No photo" }))
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn only_admins_delete_gallery_items() {
    let env = common::TestEnv::start();
    let server = env.server_permissive();
    common::login(&server, "editor").await;

    let photo = common::upload_png(&server, "river.png").await;
    let item = create_item(&server, json!({ "title": "River", "photo": photo["id"] })).await;
    let url = format!("/api/gallery/{}", item["id"].as_str().unwrap());

    server
        .patch(&url)
        .json(&json!({ "description": "Where the water bends" }))
        .await
        .assert_status_ok();
    server.delete(&url).await.assert_status_forbidden();
    common::logout(&server).await;

    common::login(&server, "admin").await;
    server.delete(&url).await.assert_status_ok();
    server.get(&url).await.assert_status_not_found();
}
