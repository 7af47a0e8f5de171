//! HTTP surface: the chat command endpoint, analytics reads and liveness.

pub mod error;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::analytics::configure_analytics_routes;
use crate::core::shared::state::AppState;
use crate::interpreter::ChatResponse;
use crate::security::{validate_required, validate_uuid};

pub use error::ChatError;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub workspace_id: Option<String>,
    pub text: Option<String>,
}

pub fn parse_workspace_id(raw: Option<&str>) -> Result<Uuid, ChatError> {
    let raw = validate_required(raw, "workspace_id")?;
    Ok(validate_uuid(raw)?)
}

pub fn configure_chat_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/chat/command", post(handle_chat_command))
        .route("/health", get(health_check))
}

/// Every route with shared state, CORS and request tracing applied.
pub fn configure_routes(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(configure_chat_routes())
        .merge(configure_analytics_routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn handle_chat_command(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ChatError> {
    let Json(request) = payload.map_err(|e| ChatError::Validation(e.body_text()))?;
    let workspace_id = parse_workspace_id(request.workspace_id.as_deref())?;
    let text = validate_required(request.text.as_deref(), "text")?;

    let response = state.interpreter.handle(workspace_id, text).await?;
    Ok(Json(response))
}

async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": "ledgerbot",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::AppConfig;
    use crate::store::MemoryStore;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app(store: Arc<MemoryStore>) -> Router {
        configure_routes(Arc::new(AppState::new(AppConfig::default(), store).unwrap()))
    }

    async fn post_json(app: Router, body: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/chat/command")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_parse_workspace_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_workspace_id(Some(&id.to_string())).unwrap(), id);
        assert!(matches!(parse_workspace_id(None), Err(ChatError::Validation(_))));
        assert!(matches!(
            parse_workspace_id(Some("not-a-uuid")),
            Err(ChatError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_chat_command_records_sale() {
        let store = Arc::new(MemoryStore::new());
        let ws = Uuid::new_v4();
        store.seed_product(ws, "Rice", 5.0, 10.0).await;

        let body = serde_json::json!({"workspace_id": ws, "text": "I sold 2 rice for $4 each"});
        let (status, json) = post_json(app(store), &body.to_string()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["ok"], true);
        assert_eq!(json["reply"], "• Sale ✅ 2 x Rice @ $4.00 (stock: 8)");
        assert!(json["analytics"].is_null());
        assert!(json["suggestions"].as_array().is_some_and(|s| !s.is_empty()));
    }

    #[tokio::test]
    async fn test_chat_command_validation_errors() {
        let store = Arc::new(MemoryStore::new());

        let (status, json) = post_json(app(store.clone()), r#"{"text": "profit today"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"], "Field 'workspace_id' is required");

        let body = serde_json::json!({"workspace_id": Uuid::new_v4(), "text": "   "});
        let (status, json) = post_json(app(store.clone()), &body.to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Field 'text' is required");

        let (status, json) = post_json(app(store), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["ok"], false);
    }

    #[tokio::test]
    async fn test_store_failure_maps_to_500() {
        let store = Arc::new(MemoryStore::new());
        let ws = Uuid::new_v4();
        store.seed_product(ws, "Rice", 5.0, 10.0).await;
        store.set_fail_writes(true);

        let body = serde_json::json!({"workspace_id": ws, "text": "sold 1 rice for $2"});
        let (status, json) = post_json(app(store), &body.to_string()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["ok"], false);
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(Arc::new(MemoryStore::new()))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
