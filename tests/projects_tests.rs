mod common;

use axum::http::StatusCode;
use serde_json::json;

// ============================================================================
// POST /projects
// ============================================================================

#[tokio::test]
async fn create_project_success() {
    let pool = common::test_pool().await;
    let token = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;

    let app = common::create_test_app(pool);
    let (status, body) = common::post_json_authed(
        app,
        "/projects",
        &token,
        json!({
            "name": "Side Project",
            "github": "https://github.com/me/side-project",
            "live_preview": "https://side.example.com"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Side Project");
    assert_eq!(body["github"], "https://github.com/me/side-project");
    assert_eq!(body["live_preview"], "https://side.example.com");
}

#[tokio::test]
async fn create_project_links_are_optional() {
    let pool = common::test_pool().await;
    let token = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;

    let app = common::create_test_app(pool);
    let (status, body) =
        common::post_json_authed(app, "/projects", &token, json!({ "name": "Bare" })).await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["github"].is_null());
    assert!(body["live_preview"].is_null());
}

#[tokio::test]
async fn create_project_rejects_empty_name() {
    let pool = common::test_pool().await;
    let token = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;

    let app = common::create_test_app(pool);
    let (status, _) =
        common::post_json_authed(app, "/projects", &token, json!({ "name": "" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_project_requires_auth() {
    let pool = common::test_pool().await;
    let app = common::create_test_app(pool);

    let (status, _) = common::post_json(app, "/projects", json!({ "name": "NoAuth" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// PATCH /projects/:id
// ============================================================================

#[tokio::test]
async fn update_project_github_link() {
    let pool = common::test_pool().await;
    let token = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;
    let project =
        common::create_project(common::create_test_app(pool.clone()), &token, "Tool Shed").await;
    let id = project["id"].as_str().unwrap();

    let (status, body) = common::patch_json_authed(
        common::create_test_app(pool),
        &format!("/projects/{id}"),
        &token,
        json!({ "github": "https://github.com/me/tool-shed" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["github"], "https://github.com/me/tool-shed");
    assert_eq!(body["name"], "Tool Shed", "unset fields stay unchanged");
}

#[tokio::test]
async fn explicit_null_clears_project_link() {
    let pool = common::test_pool().await;
    let token = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;
    let (status, project) = common::post_json_authed(
        common::create_test_app(pool.clone()),
        "/projects",
        &token,
        json!({ "name": "Linked", "github": "https://github.com/me/linked" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = project["id"].as_str().unwrap();

    let (status, body) = common::patch_json_authed(
        common::create_test_app(pool),
        &format!("/projects/{id}"),
        &token,
        json!({ "github": null }),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "clear failed: {body}");
    assert!(body["github"].is_null(), "github should be cleared: {body}");
}

#[tokio::test]
async fn omitted_links_are_left_unchanged() {
    let pool = common::test_pool().await;
    let token = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;
    let (status, project) = common::post_json_authed(
        common::create_test_app(pool.clone()),
        "/projects",
        &token,
        json!({
            "name": "Keeper",
            "github": "https://github.com/me/keeper",
            "live_preview": "https://keeper.example.com"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = project["id"].as_str().unwrap();

    let (status, body) = common::patch_json_authed(
        common::create_test_app(pool),
        &format!("/projects/{id}"),
        &token,
        json!({ "name": "Renamed" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Renamed");
    assert_eq!(body["github"], "https://github.com/me/keeper");
    assert_eq!(body["live_preview"], "https://keeper.example.com");
}

#[tokio::test]
async fn update_rejects_invalid_link() {
    let pool = common::test_pool().await;
    let token = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;
    let project =
        common::create_project(common::create_test_app(pool.clone()), &token, "Strict").await;
    let id = project["id"].as_str().unwrap();

    let (status, _) = common::patch_json_authed(
        common::create_test_app(pool),
        &format!("/projects/{id}"),
        &token,
        json!({ "github": "not a url" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn cannot_update_another_users_project() {
    let pool = common::test_pool().await;
    let token_a = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;
    let token_b = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;
    let project =
        common::create_project(common::create_test_app(pool.clone()), &token_a, "Mine").await;
    let id = project["id"].as_str().unwrap();

    let (status, _) = common::patch_json_authed(
        common::create_test_app(pool),
        &format!("/projects/{id}"),
        &token_b,
        json!({ "name": "Stolen" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Associations
// ============================================================================

#[tokio::test]
async fn link_and_list_project_bookmarks() {
    let pool = common::test_pool().await;
    let token = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;
    let project =
        common::create_project(common::create_test_app(pool.clone()), &token, "Dash").await;
    let project_id = project["id"].as_str().unwrap();
    let bookmark = common::create_bookmark(
        common::create_test_app(pool.clone()),
        &token,
        "https://docs.rs",
        "docs",
    )
    .await;
    let bookmark_id = bookmark["id"].as_str().unwrap();

    let (status, body) = common::post_json_authed(
        common::create_test_app(pool.clone()),
        &format!("/projects/{project_id}/bookmarks"),
        &token,
        json!({ "bookmark_id": bookmark_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "link failed: {body}");

    let (status, body) = common::get_authed(
        common::create_test_app(pool),
        &format!("/projects/{project_id}/bookmarks"),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let linked = body.as_array().unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0]["url"], "https://docs.rs");
}

#[tokio::test]
async fn duplicate_link_conflicts() {
    let pool = common::test_pool().await;
    let token = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;
    let project =
        common::create_project(common::create_test_app(pool.clone()), &token, "Dash").await;
    let project_id = project["id"].as_str().unwrap();
    let bookmark = common::create_bookmark(
        common::create_test_app(pool.clone()),
        &token,
        "https://docs.rs",
        "docs",
    )
    .await;
    let bookmark_id = bookmark["id"].as_str().unwrap();

    let uri = format!("/projects/{project_id}/bookmarks");
    let (status, _) = common::post_json_authed(
        common::create_test_app(pool.clone()),
        &uri,
        &token,
        json!({ "bookmark_id": bookmark_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = common::post_json_authed(
        common::create_test_app(pool),
        &uri,
        &token,
        json!({ "bookmark_id": bookmark_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn cannot_link_another_users_bookmark() {
    let pool = common::test_pool().await;
    let token_a = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;
    let token_b = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;
    let project =
        common::create_project(common::create_test_app(pool.clone()), &token_a, "Dash").await;
    let project_id = project["id"].as_str().unwrap();
    let foreign_bookmark = common::create_bookmark(
        common::create_test_app(pool.clone()),
        &token_b,
        "https://other.example.com",
        "misc",
    )
    .await;
    let bookmark_id = foreign_bookmark["id"].as_str().unwrap();

    let (status, _) = common::post_json_authed(
        common::create_test_app(pool),
        &format!("/projects/{project_id}/bookmarks"),
        &token_a,
        json!({ "bookmark_id": bookmark_id }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unlink_bookmark() {
    let pool = common::test_pool().await;
    let token = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;
    let project =
        common::create_project(common::create_test_app(pool.clone()), &token, "Dash").await;
    let project_id = project["id"].as_str().unwrap();
    let bookmark = common::create_bookmark(
        common::create_test_app(pool.clone()),
        &token,
        "https://docs.rs",
        "docs",
    )
    .await;
    let bookmark_id = bookmark["id"].as_str().unwrap();

    common::post_json_authed(
        common::create_test_app(pool.clone()),
        &format!("/projects/{project_id}/bookmarks"),
        &token,
        json!({ "bookmark_id": bookmark_id }),
    )
    .await;

    let (status, _) = common::delete_authed(
        common::create_test_app(pool.clone()),
        &format!("/projects/{project_id}/bookmarks/{bookmark_id}"),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = common::get_authed(
        common::create_test_app(pool),
        &format!("/projects/{project_id}/bookmarks"),
        &token,
    )
    .await;
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unlink_missing_association_is_404() {
    let pool = common::test_pool().await;
    let token = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;
    let project =
        common::create_project(common::create_test_app(pool.clone()), &token, "Dash").await;
    let project_id = project["id"].as_str().unwrap();

    let (status, _) = common::delete_authed(
        common::create_test_app(pool),
        &format!("/projects/{project_id}/bookmarks/{}", uuid::Uuid::new_v4()),
        &token,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_project_cascades_associations() {
    let pool = common::test_pool().await;
    let token = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;
    let project =
        common::create_project(common::create_test_app(pool.clone()), &token, "Doomed").await;
    let project_id = project["id"].as_str().unwrap();
    let bookmark = common::create_bookmark(
        common::create_test_app(pool.clone()),
        &token,
        "https://docs.rs",
        "docs",
    )
    .await;
    let bookmark_id = bookmark["id"].as_str().unwrap();

    common::post_json_authed(
        common::create_test_app(pool.clone()),
        &format!("/projects/{project_id}/bookmarks"),
        &token,
        json!({ "bookmark_id": bookmark_id }),
    )
    .await;

    let (status, _) = common::delete_authed(
        common::create_test_app(pool.clone()),
        &format!("/projects/{project_id}"),
        &token,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) =
        common::get_authed(common::create_test_app(pool), "/project-bookmarks", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        body.as_array().unwrap().is_empty(),
        "association should cascade away with the project"
    );
}

#[tokio::test]
async fn list_all_associations_is_owner_scoped() {
    let pool = common::test_pool().await;
    let token_a = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;
    let token_b = common::register_and_get_token(
        common::create_test_app(pool.clone()),
        &common::unique_username(),
        "password123",
    )
    .await;
    let project =
        common::create_project(common::create_test_app(pool.clone()), &token_a, "Dash").await;
    let project_id = project["id"].as_str().unwrap();
    let bookmark = common::create_bookmark(
        common::create_test_app(pool.clone()),
        &token_a,
        "https://docs.rs",
        "docs",
    )
    .await;
    let bookmark_id = bookmark["id"].as_str().unwrap();

    common::post_json_authed(
        common::create_test_app(pool.clone()),
        &format!("/projects/{project_id}/bookmarks"),
        &token_a,
        json!({ "bookmark_id": bookmark_id }),
    )
    .await;

    let (status, body) =
        common::get_authed(common::create_test_app(pool), "/project-bookmarks", &token_b).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}
