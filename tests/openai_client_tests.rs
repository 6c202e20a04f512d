mod support;

use axum::{http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use carebot::client_wrapper::ToolDefinition;
use carebot::clients::openai::OpenAIClient;
use carebot::{AssistantReply, ClientWrapper, ToolCall, Turn};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use support::spawn_server;

type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

async fn mock_completions(response: Value, status: StatusCode) -> (String, Captured) {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();
    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let sink = sink.clone();
            let response = response.clone();
            async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                sink.lock().unwrap().push((auth, body));
                (status, Json(response))
            }
        }),
    );
    let addr = spawn_server(app).await;
    (format!("http://{}/v1/", addr), captured)
}

fn reminder_definition() -> ToolDefinition {
    ToolDefinition {
        name: "create_reminder".into(),
        description: "set reminder with name and description provided".into(),
        parameters_schema: json!({
            "type": "object",
            "properties": {
                "username": {"type": "string"},
                "description": {"type": "string"}
            },
            "required": ["username", "description"]
        }),
    }
}

#[tokio::test]
async fn tool_calls_are_parsed_and_usage_recorded() {
    let (base, captured) = mock_completions(
        json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {
                            "name": "create_reminder",
                            "arguments": "{\"username\":\"7\",\"description\":\"medicine at 9pm\"}"
                        }
                    }]
                }
            }],
            "usage": {"prompt_tokens": 120, "completion_tokens": 20, "total_tokens": 140}
        }),
        StatusCode::OK,
    )
    .await;

    let client = OpenAIClient::new_with_base_url("sk-test", "gpt-4o", &base).with_temperature(0.1);
    let reply = client
        .send_message(
            &[Turn::system("sys"), Turn::user("remind me to take medicine at 9pm")],
            &[reminder_definition()],
        )
        .await
        .unwrap();

    assert_eq!(
        reply,
        AssistantReply::WithToolCalls(
            String::new(),
            vec![ToolCall::new(
                "call_abc",
                "create_reminder",
                json!({"username": "7", "description": "medicine at 9pm"})
            )]
        )
    );

    let usage = client.get_last_usage().await.unwrap();
    assert_eq!(usage.input_tokens, 120);
    assert_eq!(usage.total_tokens, 140);

    let requests = captured.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "remind me to take medicine at 9pm");
    assert_eq!(body["tools"][0]["type"], "function");
    assert_eq!(body["tools"][0]["function"]["name"], "create_reminder");
}

#[tokio::test]
async fn plain_answer_is_plain_reply() {
    let (base, _) = mock_completions(
        json!({
            "choices": [{"message": {"role": "assistant", "content": "Drink water and rest."}}]
        }),
        StatusCode::OK,
    )
    .await;

    let client = OpenAIClient::new_with_base_url("sk-test", "gpt-3.5-turbo", &base);
    let reply = client
        .send_message(&[Turn::user("I have a mild headache")], &[])
        .await
        .unwrap();
    assert_eq!(reply, AssistantReply::Plain("Drink water and rest.".into()));
    assert!(client.get_last_usage().await.is_none());
}

#[tokio::test]
async fn provider_errors_become_model_errors() {
    let (base, _) = mock_completions(
        json!({"error": {"message": "Rate limit reached"}}),
        StatusCode::TOO_MANY_REQUESTS,
    )
    .await;

    let client = OpenAIClient::new_with_base_url("sk-test", "gpt-4o", &base);
    let err = client
        .send_message(&[Turn::user("hi")], &[])
        .await
        .unwrap_err();
    assert!(err.message().contains("429"));
    assert!(err.message().contains("Rate limit reached"));
}

#[tokio::test]
async fn unreachable_provider_is_a_model_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = OpenAIClient::new_with_base_url("sk-test", "gpt-4o", &format!("http://{}", addr));
    let err = client.send_message(&[Turn::user("hi")], &[]).await;
    assert!(err.is_err());
}
