use std::sync::Arc;

use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use browserpilot_agent::AgentRuntime;
use browserpilot_core::types::Message;
use browserpilot_core::{Config, Paths};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

#[derive(Clone)]
struct GatewayState {
    runtime: Arc<AgentRuntime>,
    model: String,
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct TranscriptResponse {
    session_id: String,
    messages: Vec<Message>,
}

pub async fn run(port: Option<u16>, host: Option<String>) -> anyhow::Result<()> {
    let paths = Paths::new();
    paths.ensure_dirs()?;
    let config = Config::load_or_default(&paths)?;

    let host = host.unwrap_or_else(|| config.gateway.host.clone());
    let port = port.unwrap_or(config.gateway.port);
    let model = config.agent.model.clone();

    let runtime = Arc::new(super::build_runtime(config, &paths)?);
    let state = GatewayState { runtime, model };

    let app = Router::new()
        .route(
            "/chat/:session_id",
            post(handle_chat).get(handle_transcript).delete(handle_clear),
        )
        .route("/health", get(handle_health))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Append the utterance, run the loop, and return the full transcript.
/// Provider and budget failures surface as request failures; action-level
/// errors are visible only inside the transcript.
async fn handle_chat(
    State(state): State<GatewayState>,
    AxumPath(session_id): AxumPath<String>,
    Json(req): Json<ChatRequest>,
) -> Response {
    match state.runtime.process_message(&session_id, &req.message).await {
        Ok(messages) => Json(TranscriptResponse {
            session_id,
            messages,
        })
        .into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn handle_transcript(
    State(state): State<GatewayState>,
    AxumPath(session_id): AxumPath<String>,
) -> Response {
    let messages = state.runtime.transcript(&session_id);
    Json(TranscriptResponse {
        session_id,
        messages,
    })
    .into_response()
}

async fn handle_clear(
    State(state): State<GatewayState>,
    AxumPath(session_id): AxumPath<String>,
) -> Response {
    state.runtime.clear_session(&session_id).await;
    Json(serde_json::json!({ "message": "Session cleared" })).into_response()
}

async fn handle_health(State(state): State<GatewayState>) -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "model": state.model,
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}
