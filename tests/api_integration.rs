//! Integration tests for the Wasteboard API endpoints.
//!
//! These tests verify the full request/response cycle through the HTTP API,
//! backed by an in-memory SQLite database.

use axum::http::{HeaderValue, StatusCode, header::AUTHORIZATION};
use axum_test::TestServer;
use serde_json::json;

use wasteboard::api::{AppState, router};
use wasteboard::auth::StaffCredentials;
use wasteboard::storage::Storage;

async fn create_test_server() -> TestServer {
    let storage = Storage::new("sqlite::memory:").await.unwrap();
    let state = AppState {
        storage,
        credentials: StaffCredentials::new("admin", "secret"),
    };

    TestServer::new(router(state)).unwrap()
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

async fn login(server: &TestServer) -> String {
    let response = server
        .post("/login")
        .json(&json!({ "username": "admin", "password": "secret" }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    body["token"].as_str().unwrap().to_string()
}

async fn submit_complaint(server: &TestServer, location: &str) -> i64 {
    let response = server
        .post("/complaint")
        .json(&json!({
            "type": "overflow",
            "location": location,
            "description": "Bin overflowing onto the pavement"
        }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], true);
    body["complaint_id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server().await;

    server.get("/health").await.assert_status_ok();
}

#[tokio::test]
async fn test_login_wrong_password() {
    let server = create_test_server().await;

    let response = server
        .post("/login")
        .json(&json!({ "username": "admin", "password": "wrong" }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_staff_endpoints_require_token() {
    let server = create_test_server().await;

    server
        .get("/government-dashboard")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .post("/dispatch")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .get("/alerts")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    server
        .post("/bins")
        .json(&json!({ "location": "Main St" }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_invalidates_token() {
    let server = create_test_server().await;
    let token = login(&server).await;

    server
        .post("/logout")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status_ok();

    server
        .get("/government-dashboard")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_submit_complaint_appears_pending() {
    let server = create_test_server().await;

    let complaint_id = submit_complaint(&server, "Main St").await;

    let response = server.get("/").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let complaints = body["complaints"].as_array().unwrap();
    assert_eq!(complaints.len(), 1);
    assert_eq!(complaints[0]["id"].as_i64().unwrap(), complaint_id);
    assert_eq!(complaints[0]["status"], "pending");
    assert_eq!(complaints[0]["progress_percentage"], 0);
    assert_eq!(complaints[0]["gov_notified"], false);
    assert_eq!(body["complaint_counts"]["pending"], 1);
}

#[tokio::test]
async fn test_submit_complaint_invalid_payloads() {
    let server = create_test_server().await;

    let response = server
        .post("/complaint")
        .json(&json!({
            "type": "alien_invasion",
            "location": "Main St",
            "description": "Something"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .post("/complaint")
        .json(&json!({
            "type": "overflow",
            "location": "  ",
            "description": "Something"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_complaint_lifecycle_start_then_complete() {
    let server = create_test_server().await;
    let complaint_id = submit_complaint(&server, "Main St").await;
    let token = login(&server).await;

    // "Start" button
    let response = server
        .post(&format!("/update-status/{complaint_id}/progress"))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "acknowledged");
    assert_eq!(body["progress_percentage"], 50);
    assert_eq!(body["gov_notified"], true);

    // "Complete" button
    let response = server
        .post(&format!("/update-status/{complaint_id}/resolved"))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "resolved");
    assert_eq!(body["progress_percentage"], 100);

    // Freshly resolved complaints are still in the visible list
    let body: serde_json::Value = server.get("/").await.json();
    assert_eq!(body["complaints"].as_array().unwrap().len(), 1);
    assert_eq!(body["complaint_counts"]["resolved"], 1);
}

#[tokio::test]
async fn test_custom_progress_derives_status() {
    let server = create_test_server().await;
    let complaint_id = submit_complaint(&server, "Main St").await;
    let token = login(&server).await;

    for (progress, expected) in [(55, "acknowledged"), (100, "resolved"), (0, "pending")] {
        let response = server
            .post(&format!("/update-status/{complaint_id}/custom"))
            .add_header(AUTHORIZATION, bearer(&token))
            .json(&json!({ "progress": progress }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], expected);
        assert_eq!(body["progress_percentage"], progress);
    }
}

#[tokio::test]
async fn test_update_status_rejects_bad_input() {
    let server = create_test_server().await;
    let complaint_id = submit_complaint(&server, "Main St").await;
    let token = login(&server).await;

    // Out-of-range progress
    server
        .post(&format!("/update-status/{complaint_id}/custom"))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "progress": 150 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    // Custom without a body
    server
        .post(&format!("/update-status/{complaint_id}/custom"))
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    // Unknown action
    server
        .post(&format!("/update-status/{complaint_id}/escalated"))
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    // Unknown complaint
    server
        .post("/update-status/9999/progress")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bin_registration_and_dashboard() {
    let server = create_test_server().await;
    let token = login(&server).await;

    let response = server
        .post("/bins")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "location": "Main St" }))
        .await;
    response.assert_status_ok();
    let bin: serde_json::Value = response.json();
    assert_eq!(bin["fill_level"], 0);
    assert_eq!(bin["status"], "safe");

    let response = server
        .get("/government-dashboard")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["bin_counts"]["total"], 1);
    assert_eq!(body["bin_counts"]["safe"], 1);
    assert!(body["refresh_failures"].as_array().unwrap().is_empty());

    // A just-registered bin is below the dispatch threshold
    let response = server
        .post("/dispatch")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["bins_reset"], 0);
}

#[tokio::test]
async fn test_alert_polling_is_at_most_once() {
    let server = create_test_server().await;
    let token = login(&server).await;

    submit_complaint(&server, "Main St").await;

    let response = server
        .post("/bins")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "location": "Dock Rd" }))
        .await;
    let bin: serde_json::Value = response.json();
    let bin_id = bin["id"].as_i64().unwrap();

    server
        .post(&format!("/bins/{bin_id}/overflow-risk"))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "overflow_risk": true }))
        .await
        .assert_status_ok();

    // First poll delivers both alerts
    let response = server
        .get("/alerts")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let alerts = body["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().any(|a| a["type"] == "complaint" && a["priority"] == "high"));
    assert!(alerts
        .iter()
        .any(|a| a["type"] == "bin_overflow" && a["priority"] == "critical"));

    // Second poll is silent for both sources
    let body: serde_json::Value = server
        .get("/alerts")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert!(body["alerts"].as_array().unwrap().is_empty());

    // Re-flagging the bin re-arms its alert
    server
        .post(&format!("/bins/{bin_id}/overflow-risk"))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "overflow_risk": true }))
        .await
        .assert_status_ok();

    let body: serde_json::Value = server
        .get("/alerts")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    let alerts = body["alerts"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["type"], "bin_overflow");
}

#[tokio::test]
async fn test_recent_complaints_listing() {
    let server = create_test_server().await;

    submit_complaint(&server, "First St").await;
    submit_complaint(&server, "Second St").await;

    let response = server.get("/complaints/recent").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let complaints = body["complaints"].as_array().unwrap();
    assert_eq!(complaints.len(), 2);
    assert_eq!(complaints[0]["type"], "Overflow");
    assert_eq!(complaints[0]["status"], "pending");
}

#[tokio::test]
async fn test_full_workflow() {
    let server = create_test_server().await;

    // 1. Citizen submits a complaint
    let complaint_id = submit_complaint(&server, "Main St").await;

    // 2. Staff logs in and sees it on the dashboard
    let token = login(&server).await;
    let body: serde_json::Value = server
        .get("/government-dashboard")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(body["complaint_counts"]["pending"], 1);

    // 3. The alert feed announces it exactly once
    let body: serde_json::Value = server
        .get("/alerts")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(body["alerts"].as_array().unwrap().len(), 1);

    // 4. Staff works the complaint to completion
    server
        .post(&format!("/update-status/{complaint_id}/progress"))
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status_ok();
    server
        .post(&format!("/update-status/{complaint_id}/resolved"))
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .assert_status_ok();

    let body: serde_json::Value = server
        .get("/government-dashboard")
        .add_header(AUTHORIZATION, bearer(&token))
        .await
        .json();
    assert_eq!(body["complaint_counts"]["resolved"], 1);
    assert_eq!(body["complaint_counts"]["pending"], 0);
}
