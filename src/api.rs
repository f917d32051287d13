//! REST API for the competitive intelligence advisor
//!
//! Exposes chat and the memory operations over HTTP. Every JSON response
//! uses the `ApiResponse` envelope.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::agent::Advisor;
use crate::error::AdvisorError;

/// =============================
/// Request Models
/// =============================

/// `query` is the documented field; `prompt` is accepted as an alias.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    pub query: Option<String>,
    pub prompt: Option<String>,
    pub session_id: Option<String>,
}

impl ChatRequest {
    fn text(&self) -> &str {
        self.query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .or(self.prompt.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MemoryParams {
    pub session_id: Option<String>,
    pub query: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ClearMemoryRequest {
    pub session_id: Option<String>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn ok<T: Serialize>(data: T) -> ApiResult {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

fn failure(e: AdvisorError) -> ApiResult {
    let status = e.status_code();
    if status.is_server_error() {
        error!(status = status.as_u16(), "Request failed: {}", e);
    } else {
        warn!(status = status.as_u16(), "Request rejected: {}", e);
    }
    (status, Json(ApiResponse::error(e.to_string())))
}

/// Extractor rejections are reported in the envelope like any other error.
fn rejected(what: &str, detail: String) -> AdvisorError {
    AdvisorError::InvalidRequest(format!("invalid {}: {}", what, detail))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub advisor: Arc<Advisor>,
}

/// =============================
/// Status Endpoints
/// =============================

async fn root() -> ApiResult {
    ok(serde_json::json!({
        "message": "Competitive Intelligence Advisor is ready"
    }))
}

async fn health(State(state): State<ApiState>) -> ApiResult {
    ok(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "memory_backend": state.advisor.memory().backend_name(),
        "model": state.advisor.model_name(),
        "tools": state.advisor.tools().list(),
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat_handler(
    State(state): State<ApiState>,
    body: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return failure(rejected("chat body", rejection.body_text())),
    };

    info!(session = ?req.session_id, "Received chat request");

    match state.advisor.chat(req.session_id.as_deref(), req.text()).await {
        Ok(reply) => ok(reply),
        Err(e) => failure(e),
    }
}

/// =============================
/// Memory Endpoints
/// =============================

async fn memory_handler(
    State(state): State<ApiState>,
    params: std::result::Result<Query<MemoryParams>, QueryRejection>,
) -> ApiResult {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return failure(rejected("memory query", rejection.body_text())),
    };

    let (session, turns) = match state
        .advisor
        .session_history(params.session_id.as_deref(), params.limit)
        .await
    {
        Ok(found) => found,
        Err(e) => return failure(e),
    };

    let messages: Vec<&str> = turns.iter().map(|t| t.text.as_str()).collect();
    let mut data = serde_json::json!({
        "session_id": session.label,
        "messages": messages,
        "turns": turns,
    });

    if let Some(query) = params.query.as_deref().filter(|q| !q.trim().is_empty()) {
        match state
            .advisor
            .memory()
            .retrieve(session.session_id, query)
            .await
        {
            Ok(recalled) => data["relevant"] = serde_json::json!(recalled.relevant),
            Err(e) => return failure(e),
        }
    }

    ok(data)
}

/// The body is optional; an empty body clears the default session.
async fn clear_memory_handler(State(state): State<ApiState>, body: Bytes) -> ApiResult {
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        ClearMemoryRequest::default()
    } else {
        match serde_json::from_slice::<ClearMemoryRequest>(&body) {
            Ok(req) => req,
            Err(e) => return failure(rejected("clear-memory body", e.to_string())),
        }
    };

    match state.advisor.clear_session(req.session_id.as_deref()).await {
        Ok((session, removed)) => ok(serde_json::json!({
            "status": "Memory cleared",
            "session_id": session.label,
            "removed": removed,
        })),
        Err(e) => failure(e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(advisor: Arc<Advisor>) -> Router {
    let state = ApiState { advisor };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/chat", post(chat_handler))
        .route("/memory", get(memory_handler))
        .route("/clear-memory", post(clear_memory_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    advisor: Arc<Advisor>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(advisor);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
