//! REST API server for the financial analyst agents
//!
//! Same coordinator as the terminal loop, exposed over HTTP

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::agent::Coordinator;
use crate::config::parse_or_stable_uuid;
use crate::models::ResolutionResult;
use crate::resolver::TickerResolver;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResolveRequest {
    pub company_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QueryRequest {
    pub query: String,
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

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub coordinator: Arc<Coordinator>,
    pub resolver: Arc<TickerResolver>,
    /// Session label used when a request carries none
    pub default_session: String,
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Ticker Resolution Endpoint
/// =============================

async fn resolve_handler(
    State(state): State<ApiState>,
    Json(req): Json<ResolveRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let company_name = req.company_name.trim();
    if company_name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("company_name is required".into())),
        );
    }

    info!(company = %company_name, "Received resolve request");

    let result = state.resolver.resolve(company_name).await;
    let status = match &result {
        ResolutionResult::Resolved(_) => "resolved",
        ResolutionResult::NotFound => "not_found",
        ResolutionResult::Error(cause) => {
            return (
                StatusCode::BAD_GATEWAY,
                Json(ApiResponse::error(format!(
                    "{}: {}",
                    result.as_sentinel(),
                    cause
                ))),
            );
        }
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "company_name": company_name,
            "ticker": result.as_sentinel(),
            "status": status,
        }))),
    )
}

/// =============================
/// Query Endpoint
/// =============================

async fn query_handler(
    State(state): State<ApiState>,
    Json(req): Json<QueryRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    if req.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("query is required".into())),
        );
    }

    let session_id = parse_or_stable_uuid(req.session_id.as_deref(), &state.default_session);
    info!(session = %session_id, "Received query: {}", req.query);

    // HTTP callers get the whole answer at once; drain the stream alongside the turn.
    let (tx, mut rx) = mpsc::channel::<String>(64);
    let coordinator = state.coordinator.clone();
    let query = req.query.clone();

    let turn = async move {
        let tx = tx;
        coordinator.run(&query, session_id, &tx).await
    };
    let drain = async { while rx.recv().await.is_some() {} };

    let (turn, ()) = tokio::join!(turn, drain);

    match turn {
        Ok(turn) => (StatusCode::OK, Json(ApiResponse::success(turn))),
        Err(e) => {
            error!(kind = ?e.kind(), "Query failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(ApiResponse::error(format!("Query failed: {}", e))),
            )
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/resolve", post(resolve_handler))
        .route("/api/query", post(query_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
