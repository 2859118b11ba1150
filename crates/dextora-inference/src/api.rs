//! HTTP and WebSocket surface
//!
//! - `GET /health`: liveness
//! - `GET /metrics`: Prometheus text exposition
//! - `GET /ws/:student_id`: one JSON batch in, one JSON reply out

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use prometheus::{Encoder as _, Registry, TextEncoder};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error};

use crate::session::{Session, SessionOrchestrator};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SessionOrchestrator>,
    pub registry: Arc<Registry>,
}

impl AppState {
    pub fn new(orchestrator: Arc<SessionOrchestrator>, registry: Arc<Registry>) -> Self {
        Self { orchestrator, registry }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/ws/:student_id", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": dextora_common::VERSION,
    }))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&state.registry.gather(), &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, String::new()).into_response();
    }

    match String::from_utf8(buffer) {
        Ok(body) => ([(header::CONTENT_TYPE, encoder.format_type().to_string())], body).into_response(),
        Err(e) => {
            error!(error = %e, "Metrics exposition is not UTF-8");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

// WebSocket handler
async fn websocket_handler(
    Path(student_id): Path<String>,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, student_id, state.orchestrator))
}

async fn handle_socket(socket: WebSocket, student_id: String, orchestrator: Arc<SessionOrchestrator>) {
    let (mut sender, mut receiver) = socket.split();
    let mut session = Session::open(student_id, orchestrator).await;

    while let Some(frame) = receiver.next().await {
        let reply = match frame {
            Ok(Message::Text(text)) => session.handle_text(&text).await,
            Ok(Message::Binary(bytes)) => session.handle_binary(&bytes).await,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                debug!(student_id = session.student_id(), error = %e, "WebSocket receive failed");
                break;
            }
        };

        if sender.send(Message::Text(reply.to_json())).await.is_err() {
            break;
        }
    }

    session.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::models::{HashingEncoder, PriorityPolicy};
    use crate::infra::profile_store::InMemoryProfileStore;
    use crate::infra::session_memory::SessionMemory;
    use crate::infra::vector_cache::{InMemoryVectorBackend, VectorCache};
    use crate::metrics::InferenceMetrics;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app() -> Router {
        let registry = Arc::new(Registry::new());
        let metrics = InferenceMetrics::new().unwrap();
        metrics.register(&registry).unwrap();

        let cache = VectorCache::new(
            Arc::new(InMemoryVectorBackend::new()),
            Arc::new(InMemoryProfileStore::new()),
        );
        let orchestrator = SessionOrchestrator::new(
            Arc::new(cache),
            Arc::new(HashingEncoder::new()),
            Arc::new(PriorityPolicy),
            Arc::new(SessionMemory::new()),
            metrics,
        );
        router(AppState::new(Arc::new(orchestrator), registry))
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_metrics_exposition() {
        let response = app()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("dextora_active_sessions"));
    }

    #[tokio::test]
    async fn test_ws_requires_upgrade() {
        let response = app()
            .oneshot(Request::builder().uri("/ws/STU_1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
