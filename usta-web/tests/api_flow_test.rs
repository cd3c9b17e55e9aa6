//! HTTP flows through the full router

mod helpers;

use axum::http::{Method, StatusCode};
use helpers::{TestApp, DEV_CODE};
use serde_json::json;

#[tokio::test]
async fn test_health() {
    let app = TestApp::spawn().await;
    let response = app.get("/api/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
}

#[tokio::test]
async fn test_login_then_me() {
    let app = TestApp::spawn().await;

    let response = app
        .post("/api/auth/otp", None, json!({ "phone": "+998901234567", "role": "client" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);

    let response = app
        .post(
            "/api/auth/verify",
            None,
            json!({ "phone": "+998901234567", "code": DEV_CODE }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["registered"], true);
    assert_eq!(response.body["account"]["role"], "client");
    let token = response.body["token"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let me = app.get("/api/auth/me", Some(&token)).await;
        assert_eq!(me.status, StatusCode::OK);
        assert_eq!(me.body["account"]["phone"], "+998901234567");
    }
}

#[tokio::test]
async fn test_me_without_session_is_null() {
    let app = TestApp::spawn().await;

    let response = app.get("/api/auth/me", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["account"].is_null());

    let response = app.get("/api/auth/me", Some("not-a-token")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["account"].is_null());
}

#[tokio::test]
async fn test_wrong_code_is_invalid_input() {
    let app = TestApp::spawn().await;
    let response = app
        .post(
            "/api/auth/verify",
            None,
            json!({ "phone": "+998901234567", "code": "000000" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "invalid_input");
    assert_eq!(response.body["field"], "code");
}

#[tokio::test]
async fn test_admin_role_cannot_self_register() {
    let app = TestApp::spawn().await;
    let response = app
        .post(
            "/api/auth/verify",
            None,
            json!({ "phone": "+998901234567", "code": DEV_CODE, "role": "admin" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["field"], "role");
}

#[tokio::test]
async fn test_protected_routes_need_bearer() {
    let app = TestApp::spawn().await;

    let response = app.get("/api/requests", None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "unauthenticated");

    let response = app
        .send(
            Method::POST,
            "/api/auth/logout",
            None,
            Some(json!({})),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_invalidates_token() {
    let app = TestApp::spawn().await;
    let token = app.login("+998901234567", "client").await;

    let response = app.post("/api/auth/logout", Some(&token), json!({})).await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.get("/api/requests", Some(&token)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_request_lifecycle_over_http() {
    let app = TestApp::spawn().await;
    let client = app.login("+998901111111", "client").await;
    let (master, profile_id) = app.onboarded_master("+998902222222").await;

    let response = app
        .post(
            "/api/requests",
            Some(&client),
            json!({ "master_id": profile_id, "message": "Kitchen sink leaks" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["status"], "new");
    let request_id = response.body["id"].as_str().unwrap().to_string();
    let status_uri = format!("/api/requests/{}/status", request_id);

    // client cannot accept
    let response = app
        .send(
            Method::PATCH,
            &status_uri,
            Some(&client),
            Some(json!({ "status": "accepted" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["field"], "status");

    let response = app
        .send(
            Method::PATCH,
            &status_uri,
            Some(&master),
            Some(json!({ "status": "accepted", "expected_version": 0 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "accepted");
    assert_eq!(response.body["version"], 1);

    // stale version
    let response = app
        .send(
            Method::PATCH,
            &status_uri,
            Some(&master),
            Some(json!({ "status": "in_progress", "expected_version": 0 })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let listed = app.get("/api/requests", Some(&master)).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body.as_array().unwrap().len(), 1);

    let single = app
        .get(&format!("/api/requests/{}", request_id), Some(&client))
        .await;
    assert_eq!(single.body["status"], "accepted");
}

#[tokio::test]
async fn test_stranger_is_forbidden() {
    let app = TestApp::spawn().await;
    let client = app.login("+998901111111", "client").await;
    let stranger = app.login("+998903333333", "client").await;
    let (_, profile_id) = app.onboarded_master("+998902222222").await;

    let response = app
        .post("/api/requests", Some(&client), json!({ "master_id": profile_id }))
        .await;
    let request_id = response.body["id"].as_str().unwrap().to_string();

    let response = app
        .get(&format!("/api/requests/{}", request_id), Some(&stranger))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .send(
            Method::PATCH,
            &format!("/api/requests/{}/status", request_id),
            Some(&stranger),
            Some(json!({ "status": "cancelled" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["error"], "forbidden");
}

#[tokio::test]
async fn test_unknown_status_value() {
    let app = TestApp::spawn().await;
    let client = app.login("+998901111111", "client").await;
    let (_, profile_id) = app.onboarded_master("+998902222222").await;
    let response = app
        .post("/api/requests", Some(&client), json!({ "master_id": profile_id }))
        .await;
    let request_id = response.body["id"].as_str().unwrap().to_string();

    let response = app
        .send(
            Method::PATCH,
            &format!("/api/requests/{}/status", request_id),
            Some(&client),
            Some(json!({ "status": "done" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["field"], "status");
}

#[tokio::test]
async fn test_malformed_body_uses_error_shape() {
    let app = TestApp::spawn().await;
    let response = app
        .post("/api/auth/verify", None, json!({ "phone": "+998901234567" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "invalid_input");
}

#[tokio::test]
async fn test_malformed_path_id_uses_error_shape() {
    let app = TestApp::spawn().await;
    let token = app.login("+998901234567", "client").await;

    let response = app.get("/api/requests/not-a-uuid", Some(&token)).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "invalid_input");
    assert!(response.body["message"].is_string());

    let response = app.get("/api/masters/not-a-uuid", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "invalid_input");
}

#[tokio::test]
async fn test_master_directory() {
    let app = TestApp::spawn().await;
    let (_, profile_id) = app.onboarded_master("+998902222222").await;
    app.login("+998905555555", "master").await;

    let response = app.get("/api/masters?city=tashkent", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let masters = response.body.as_array().unwrap();
    assert_eq!(masters.len(), 1);
    assert_eq!(masters[0]["id"], profile_id.as_str());

    let response = app.get(&format!("/api/masters/{}", profile_id), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["profession"], "plumber");

    let response = app
        .get("/api/masters/00000000-0000-0000-0000-000000000000", None)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "not_found");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = TestApp::spawn().await;
    let response = app.get("/api/api-docs/openapi.json", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["info"]["title"], "Usta API");
}
