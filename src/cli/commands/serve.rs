//! HTTP API server for integration with other systems.
//!
//! Exposes chat management, document upload, and streaming question answering.
//! The caller's identity arrives in the `x-user-id` header and is trusted as-is;
//! authentication is handled by an upstream gateway.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::SvarError;
use crate::orchestrator::Orchestrator;
use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve) {
        Output::error(&format!("{}", e));
        Output::info("Run 'svar doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(settings)?;

    let state = Arc::new(AppState { orchestrator });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/chats", post(create_chat).get(list_chats))
        .route("/upload", post(upload))
        .route("/ask", post(ask))
        .route("/history/{chat_id}", get(history))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Svar API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Create Chat", "POST /chats");
    Output::kv("List Chats", "GET  /chats");
    Output::kv("Upload", "POST /upload");
    Output::kv("Ask (streaming)", "POST /ask");
    Output::kv("History", "GET  /history/:chat_id");
    println!();
    Output::info("Requests must carry the caller identity in the x-user-id header.");
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct CreateChatRequest {
    chat_name: String,
}

#[derive(Deserialize)]
struct UploadRequest {
    chat_id: String,
    /// Plain document text; it is split and embedded server-side.
    text: String,
}

#[derive(Serialize)]
struct UploadResponse {
    stored_count: usize,
}

#[derive(Deserialize)]
struct AskRequest {
    chat_id: String,
    question: String,
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateChatRequest>,
) -> Response {
    let owner_id = match owner_id(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state
        .orchestrator
        .create_chat(&owner_id, &req.chat_name)
        .await
    {
        Ok(chat) => Json(chat).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn list_chats(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let owner_id = match owner_id(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.orchestrator.list_chats(&owner_id).await {
        Ok(chats) => Json(chats).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<UploadRequest>,
) -> Response {
    let owner_id = match owner_id(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state
        .orchestrator
        .ingest_text(&owner_id, &req.chat_id, &req.text)
        .await
    {
        Ok(result) => Json(UploadResponse {
            stored_count: result.stored_count,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Streaming ask handler.
///
/// Validation and retrieval failures are reported as plain HTTP errors before
/// the response commits to streaming; after that, failures arrive in-band as a
/// terminal `error` event line.
async fn ask(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<AskRequest>,
) -> Response {
    let owner_id = match owner_id(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state
        .orchestrator
        .ask(&owner_id, &req.chat_id, &req.question)
        .await
    {
        Ok(events) => {
            let body = Body::from_stream(events.map(|event| {
                let mut line = serde_json::to_string(&event).unwrap_or_default();
                line.push('\n');
                Ok::<_, Infallible>(Bytes::from(line))
            }));

            (
                [(header::CONTENT_TYPE, "application/x-ndjson")],
                body,
            )
                .into_response()
        }
        Err(e) => error_response(&e),
    }
}

async fn history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(chat_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let owner_id = match owner_id(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let limit = query
        .limit
        .unwrap_or(state.orchestrator.settings().generation.history_limit);

    match state.orchestrator.history(&owner_id, &chat_id, limit).await {
        Ok(exchanges) => Json(exchanges).into_response(),
        Err(e) => error_response(&e),
    }
}

// === Helpers ===

/// Extract the trusted caller identity from the `x-user-id` header.
fn owner_id(headers: &HeaderMap) -> Result<String, Response> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "missing x-user-id header".to_string(),
                }),
            )
                .into_response()
        })
}

/// Map a library error to an HTTP response.
fn error_response(e: &SvarError) -> Response {
    let status = match e {
        SvarError::ChatNotFound(_) => StatusCode::NOT_FOUND,
        SvarError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SvarError::Embedding(_) | SvarError::OpenAI(_) | SvarError::Http(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SvarError::Storage(_) | SvarError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}
