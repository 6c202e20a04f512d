mod support;

use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use carebot::tool_protocol::{ToolProtocol, ToolRegistry};
use carebot::tools::{ReminderTool, TavilySearchTool};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use support::spawn_server;

async fn reminder_service(status: StatusCode, body: &'static str) -> (String, Arc<Mutex<Vec<Value>>>) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    let app = Router::new().route(
        "/api/reminders",
        post(move |Json(payload): Json<Value>| {
            let sink = sink.clone();
            async move {
                sink.lock().unwrap().push(payload);
                (status, body)
            }
        }),
    );
    let addr = spawn_server(app).await;
    (format!("http://{}/api/reminders", addr), received)
}

#[tokio::test]
async fn reminder_success_body_is_returned_verbatim() {
    let (url, received) =
        reminder_service(StatusCode::CREATED, "{\"id\": 17, \"status\": \"scheduled\"}").await;
    let tool = ReminderTool::new(Some(url.clone()));
    assert_eq!(tool.endpoint(), Some(url.as_str()));

    let result = tool
        .execute(
            "create_reminder",
            json!({"username": "7", "description": "take medicine at 9pm"}),
        )
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.to_content(), "{\"id\": 17, \"status\": \"scheduled\"}");
    assert_eq!(result.metadata["status"], json!(201));
    assert_eq!(
        received.lock().unwrap()[0],
        json!({"username": "7", "description": "take medicine at 9pm"})
    );
}

#[tokio::test]
async fn reminder_http_failure_is_an_error_result() {
    let (url, _) = reminder_service(StatusCode::INTERNAL_SERVER_ERROR, "database down").await;
    let tool = ReminderTool::new(Some(url));

    let result = tool.create("7", "dentist on Friday").await;
    assert!(!result.success);
    assert_eq!(
        result.to_content(),
        "Error: reminder service returned 500: database down"
    );
}

#[tokio::test]
async fn reminder_without_endpoint_fails_softly() {
    let tool = ReminderTool::new(None);
    assert!(tool.endpoint().is_none());
    let result = tool.create("7", "walk").await;
    assert!(!result.success);
    assert!(result.to_content().contains("not configured"));
}

#[tokio::test]
async fn reminder_unreachable_service_fails_softly() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = ReminderTool::new(Some(format!("http://{}/api", addr)))
        .create("7", "walk")
        .await;
    assert!(!result.success);
    assert!(result.to_content().starts_with("Error: reminder service unreachable"));
}

#[tokio::test]
async fn search_sends_key_and_truncates_results() {
    let captured: Arc<Mutex<Vec<(Option<String>, Value)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    let app = Router::new().route(
        "/search",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let sink = sink.clone();
            async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                sink.lock().unwrap().push((auth, body));
                Json(json!({
                    "query": "migraine triggers",
                    "results": [
                        {"title": "A", "url": "https://a.example", "content": "aa", "score": 0.9},
                        {"title": "B", "url": "https://b.example", "content": "bb", "score": 0.8},
                        {"title": "C", "url": "https://c.example", "content": "cc", "score": 0.7}
                    ]
                }))
            }
        }),
    );
    let addr = spawn_server(app).await;

    let tool = TavilySearchTool::new(Some("tvly-test".into()), 2)
        .with_base_url(&format!("http://{}/", addr));
    assert_eq!(tool.max_results(), 2);
    let result = tool.search("migraine triggers").await;

    assert!(result.success);
    let hits = result.output["results"].as_array().unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(
        hits[0],
        json!({"title": "A", "url": "https://a.example", "content": "aa"})
    );

    let (auth, body) = captured.lock().unwrap()[0].clone();
    assert_eq!(auth.as_deref(), Some("Bearer tvly-test"));
    assert_eq!(body, json!({"query": "migraine triggers", "max_results": 2}));
}

#[tokio::test]
async fn search_error_status_is_an_error_result() {
    let app = Router::new().route(
        "/search",
        post(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
    );
    let addr = spawn_server(app).await;

    let tool =
        TavilySearchTool::new(Some("bad".into()), 3).with_base_url(&format!("http://{}", addr));
    let result = tool.search("flu").await;
    assert!(!result.success);
    assert!(result.to_content().contains("401"));
}

#[tokio::test]
async fn registry_validates_before_calling_the_service() {
    let (url, received) = reminder_service(StatusCode::OK, "ok").await;
    let mut registry = ToolRegistry::empty();
    registry
        .add_protocol(Arc::new(ReminderTool::new(Some(url))))
        .await
        .unwrap();

    let err = registry
        .execute_tool("create_reminder", json!({"username": "7"}))
        .await
        .err()
        .unwrap();
    assert_eq!(
        err.to_string(),
        "Invalid parameters: missing required parameter 'description'"
    );
    assert!(received.lock().unwrap().is_empty());

    let schema = &registry.definitions()[0].parameters_schema;
    assert_eq!(schema["required"], json!(["username", "description"]));
}
