//! HTTP request handlers

use super::assets::{get_asset, get_index_html};
use super::sse::sse_stream;
use super::types::{
    ChatRequest, ChatResponse, CreateSessionResponse, ErrorResponse, ModelsResponse,
    SuccessResponse, ToolsResponse,
};
use super::AppState;
use crate::llm::ModelVariant;
use crate::tools::{ToolContext, ToolOutput};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::Value;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_index))
        .route("/assets/*path", get(serve_asset))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", delete(delete_session))
        .route("/api/sessions/:id/stream", get(stream_session))
        .route("/api/sessions/:id/chat", post(send_chat))
        // Introspection
        .route("/api/models", get(list_models))
        .route("/api/tools", get(list_tools))
        .route("/api/tools/:name/run", post(run_tool))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// UI
// ============================================================

async fn serve_index() -> impl IntoResponse {
    match get_index_html() {
        Some(content) => Html(content).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html("<h1>404 - UI not found</h1>".to_string()),
        )
            .into_response(),
    }
}

async fn serve_asset(Path(path): Path<String>) -> Response {
    match get_asset(&path) {
        Some((bytes, mime)) => ([(header::CONTENT_TYPE, mime)], bytes).into_response(),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

// ============================================================
// Sessions
// ============================================================

async fn create_session(State(state): State<AppState>) -> Json<CreateSessionResponse> {
    let (session_id, channel) = state.sessions.create().await;
    let active = state.sessions.len().await;
    tracing::info!(session = %session_id, active, "Chat session started");

    state.chat.on_chat_start(channel.as_ref()).await;

    Json(CreateSessionResponse { session_id })
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.sessions.remove(&id).await {
        return Err(AppError::NotFound(format!("Unknown session: {id}")));
    }
    tracing::info!(session = %id, "Chat session closed");
    Ok(Json(SuccessResponse { success: true }))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let channel = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Unknown session: {id}")))?;

    let (transcript, rx) = channel.subscribe();
    Ok(sse_stream(transcript, rx))
}

async fn send_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let channel = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Unknown session: {id}")))?;

    let chat = state.chat.clone();
    tokio::spawn(async move {
        chat.on_message(&req.text, channel.as_ref()).await;
    });

    Ok(Json(ChatResponse { queued: true }))
}

// ============================================================
// Introspection
// ============================================================

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        fast: state.models.model_id(ModelVariant::Fast).to_string(),
        capable: state.models.model_id(ModelVariant::Capable).to_string(),
    })
}

async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    Json(ToolsResponse {
        tools: state.tools.definitions(),
    })
}

/// Run a tool directly. Off by default: the Python tool is unsandboxed.
async fn run_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<Value>,
) -> Result<Json<ToolOutput>, AppError> {
    if !state.enable_exec_endpoint {
        return Err(AppError::Forbidden(
            "Tool execution endpoint is disabled (set CHAT_ENABLE_EXEC_ENDPOINT=true)".to_string(),
        ));
    }

    state
        .tools
        .execute(&name, input, ToolContext::default())
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Unknown tool: {name}")))
}

async fn get_version() -> &'static str {
    concat!("gemini-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    Forbidden(String),
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
