//! HTTP surface for the conversation engine (feature `http-server`).
//!
//! | Route                          | Agent kind        |
//! |--------------------------------|-------------------|
//! | `GET /`                        | liveness probe    |
//! | `POST /service/chat_bot`       | `chat`            |
//! | `POST /service/symptom_checker`| `symptom_checker` |
//!
//! Both service routes take `{"user_id": <string or number>, "query": <string>}` and answer
//! `200 {"reply": <text>}`. Engine failures map to a JSON body
//! `{"error": <kind>, "message": <text>}` with a status per kind.

use crate::carebot::engine::{ConversationEngine, EngineError};
use crate::carebot::session_store::{AgentKind, SessionKey};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value as JsonValue};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Build the service router around a shared engine.
pub fn router(engine: Arc<ConversationEngine>) -> Router {
    let chat_engine = engine.clone();
    let symptom_engine = engine;

    Router::new()
        .route("/", get(|| async { Json(json!({"message": "hello"})) }))
        .route(
            "/service/chat_bot",
            post(move |Json(payload): Json<JsonValue>| {
                let engine = chat_engine.clone();
                async move { handle(engine, AgentKind::Chat, payload).await }
            }),
        )
        .route(
            "/service/symptom_checker",
            post(move |Json(payload): Json<JsonValue>| {
                let engine = symptom_engine.clone();
                async move { handle(engine, AgentKind::SymptomChecker, payload).await }
            }),
        )
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(
    engine: Arc<ConversationEngine>,
    addr: &str,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    let local: SocketAddr = listener.local_addr()?;
    log::info!("carebot listening on http://{}", local);
    axum::serve(listener, router(engine)).await?;
    Ok(())
}

async fn handle(engine: Arc<ConversationEngine>, kind: AgentKind, payload: JsonValue) -> Response {
    let (user_id, query) = match parse_request(&payload) {
        Ok(parts) => parts,
        Err(message) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "invalid_request", "message": message})),
            )
                .into_response()
        }
    };

    let key = SessionKey::new(user_id, kind);
    match engine.process(&key, &query).await {
        Ok(reply) => (StatusCode::OK, Json(json!({"reply": reply}))).into_response(),
        Err(err) => {
            log::warn!("[{}] request failed: {}", key, err);
            (
                status_for(&err),
                Json(json!({"error": err.kind(), "message": err.to_string()})),
            )
                .into_response()
        }
    }
}

fn parse_request(payload: &JsonValue) -> Result<(String, String), String> {
    let user_id = match payload.get("user_id") {
        Some(JsonValue::String(id)) if !id.is_empty() => id.clone(),
        Some(JsonValue::Number(id)) => id.to_string(),
        Some(_) => return Err("'user_id' must be a non-empty string or a number".into()),
        None => return Err("missing 'user_id'".into()),
    };
    let query = payload
        .get("query")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| "missing 'query'".to_string())?;
    Ok((user_id, query.to_string()))
}

fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        EngineError::ModelUnavailable(_) => StatusCode::BAD_GATEWAY,
        EngineError::RoutingLoopExceeded { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        EngineError::UnknownAgent(_) => StatusCode::NOT_FOUND,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_ids_accept_strings_and_numbers() {
        assert_eq!(
            parse_request(&json!({"user_id": 42, "query": "hi"})),
            Ok(("42".to_string(), "hi".to_string()))
        );
        assert_eq!(
            parse_request(&json!({"user_id": "abc", "query": "hi"})),
            Ok(("abc".to_string(), "hi".to_string()))
        );
        assert!(parse_request(&json!({"user_id": true, "query": "hi"})).is_err());
        assert!(parse_request(&json!({"query": "hi"})).is_err());
        assert!(parse_request(&json!({"user_id": 1})).is_err());
    }

    #[test]
    fn failures_map_to_statuses() {
        assert_eq!(
            status_for(&EngineError::StorageUnavailable("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&EngineError::ModelUnavailable("x".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&EngineError::UnknownAgent(AgentKind::Chat)),
            StatusCode::NOT_FOUND
        );
    }
}
