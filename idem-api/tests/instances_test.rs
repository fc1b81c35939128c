// Integration tests for instance listing and power actions (mock provider only)

mod common;

use axum::http::StatusCode;
use common::{create_failing_server, create_test_server, fast_poll, wait_for_job};
use serde_json::{json, Value};

#[tokio::test]
async fn test_health_and_dashboard_page() {
    let (server, _) = create_test_server(1, fast_poll());

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "ok");

    let page = server.get("/").await;
    assert_eq!(page.status_code(), StatusCode::OK);
    let html = page.text();
    assert!(html.contains("/instances"));
    // Running jobs can be cancelled from the page, settled ones show their error.
    assert!(html.contains("/cancel`, { method: \"POST\" }"));
    assert!(html.contains("job.error"));
    assert!(html.contains("e.text"));
}

#[tokio::test]
async fn test_list_instances_with_available_actions() {
    let (server, _) = create_test_server(1, fast_poll());

    let response = server.get("/instances").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Vec<Value> = response.json();
    assert_eq!(body.len(), 3);

    let web = body.iter().find(|i| i["id"] == "mock-1").unwrap();
    assert_eq!(web["display_name"], "web-1");
    assert_eq!(web["lifecycle_state"], "RUNNING");
    assert_eq!(web["available_actions"], json!(["stop"]));

    let worker = body.iter().find(|i| i["id"] == "mock-2").unwrap();
    assert_eq!(worker["lifecycle_state"], "STOPPED");
    assert_eq!(worker["available_actions"], json!(["start"]));
}

#[tokio::test]
async fn test_start_action_runs_to_completion() {
    let (server, _) = create_test_server(2, fast_poll());

    let response = server
        .post("/actions")
        .json(&json!({ "instance_id": "mock-2", "verb": "start" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let body: Value = response.json();
    let job_id = body["job_id"].as_str().unwrap().to_string();

    let job = wait_for_job(&server, &job_id).await;
    assert_eq!(job["status"], "succeeded");
    assert_eq!(job["verb"], "start");
    let kinds: Vec<&str> = job["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds.first(), Some(&"action_starting"));
    assert!(kinds.contains(&"waiting"));
    assert_eq!(kinds.last(), Some(&"completed"));

    let instances: Vec<Value> = server.get("/instances").await.json();
    let worker = instances.iter().find(|i| i["id"] == "mock-2").unwrap();
    assert_eq!(worker["lifecycle_state"], "RUNNING");
}

#[tokio::test]
async fn test_action_validation() {
    let (server, _) = create_test_server(1, fast_poll());

    let unknown_verb = server
        .post("/actions")
        .json(&json!({ "instance_id": "mock-2", "verb": "reboot" }))
        .await;
    assert_eq!(unknown_verb.status_code(), StatusCode::BAD_REQUEST);

    let missing = server
        .post("/actions")
        .json(&json!({ "instance_id": "nope", "verb": "start" }))
        .await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

    // web-1 is already running
    let wrong_state = server
        .post("/actions")
        .json(&json!({ "instance_id": "mock-1", "verb": "start" }))
        .await;
    assert_eq!(wrong_state.status_code(), StatusCode::CONFLICT);
    let body: Value = wrong_state.json();
    assert!(body["error"].as_str().unwrap().contains("RUNNING"));
}

#[tokio::test]
async fn test_provider_failure_is_reported_as_bad_gateway() {
    let server = create_failing_server("quota service unavailable");

    let response = server.get("/instances").await;
    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("quota service unavailable"));

    let response = server
        .post("/actions")
        .json(&json!({ "instance_id": "mock-1", "verb": "stop" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("quota service unavailable"));

    // The service is still up after the failures.
    assert_eq!(server.get("/health").await.status_code(), StatusCode::OK);
}
