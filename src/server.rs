use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, Request, State},
    handler::HandlerWithoutStateExt,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::cors::{self, AllowedOrigins};
use crate::relay::{self, RelayError};
use crate::session::SessionStore;
use crate::sweeper;

/// Body cap for the create route; the body carries at most a TTL.
const CREATE_BODY_LIMIT: usize = 32 * 1024;
/// Wire overhead allowed on top of the payload bound for the send envelope.
const SEND_ENVELOPE_BYTES: usize = 4096;

/// Start the relay server with the provided configuration.
///
/// Fails only on unrecoverable startup conditions: an unresolvable static
/// root or an unbindable listen address.
pub async fn start_server(config: AppConfig) -> anyhow::Result<()> {
    let static_root = std::fs::canonicalize(&config.server.static_root)
        .with_context(|| format!("cannot resolve static root {:?}", config.server.static_root))?;

    let sessions = SessionStore::new();
    sweeper::spawn(
        sessions.clone(),
        Duration::from_millis(config.relay.sweep_interval_ms),
    );

    let allowed_origins = Arc::new(AllowedOrigins::parse(&config.server.allowed_origins));
    info!(
        name: "relay.config.loaded",
        origins = %allowed_origins,
        max_payload_bytes = config.relay.max_payload_bytes,
        max_queue_messages = config.relay.max_queue_messages,
        "Relay configuration loaded"
    );

    let state = AppState {
        sessions,
        relay: config.relay.clone(),
        allowed_origins,
    };
    let app = build_router(state, static_root);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the relay router over the given state and static asset root.
pub fn build_router(state: AppState, static_root: PathBuf) -> Router {
    let api = Router::new()
        .route("/api/relay/session/create", post(create_session))
        .route("/api/relay/session/send", post(send_message))
        .route("/api/relay/session/receive", get(receive_messages))
        .method_not_allowed_fallback(method_not_allowed)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            cors::cors_middleware,
        ))
        .with_state(state);

    api.fallback_service(ServeDir::new(static_root).not_found_service(not_found.into_service()))
        .layer(TraceLayer::new_for_http())
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Expired => StatusCode::GONE,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for session creation.
#[derive(Debug, Deserialize)]
struct CreateRequest {
    /// Requested TTL in seconds; clamped server-side.
    #[serde(rename = "ttlSeconds")]
    ttl_seconds: Option<f64>,
}

/// POST /api/relay/session/create - Mint a session and its token pair.
async fn create_session(State(state): State<AppState>, request: Request) -> impl IntoResponse {
    // Malformed or missing JSON falls back to the default TTL rather than
    // erroring; the body read is capped to avoid abuse.
    let body = axum::body::to_bytes(request.into_body(), CREATE_BODY_LIMIT)
        .await
        .unwrap_or_default();
    let requested_ttl = serde_json::from_slice::<CreateRequest>(&body)
        .ok()
        .and_then(|req| req.ttl_seconds);

    let created = relay::create_session(&state.sessions, &state.relay, requested_ttl);
    (StatusCode::CREATED, Json(created))
}

/// Request body for sending a message.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest {
    #[serde(default)]
    session_id: String,
    #[serde(default)]
    write_token: String,
    #[serde(default)]
    payload: Value,
}

/// POST /api/relay/session/send - Append a payload to a session's queue.
async fn send_message(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, RelayError> {
    // Oversized bodies are rejected before parsing.
    let limit = state.relay.max_payload_bytes + SEND_ENVELOPE_BYTES;
    let body = axum::body::to_bytes(request.into_body(), limit)
        .await
        .map_err(|_| RelayError::PayloadTooLarge {
            max: state.relay.max_payload_bytes,
        })?;
    // Decode failures surface as missing required fields below.
    let req: SendRequest = serde_json::from_slice(&body).unwrap_or_default();

    let queued = relay::send_message(
        &state.sessions,
        &state.relay,
        &req.session_id,
        &req.write_token,
        req.payload,
    )?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "ok": true, "queued": queued }))).into_response())
}

/// Query parameters for receiving messages.
#[derive(Debug, Deserialize)]
struct ReceiveQuery {
    #[serde(default)]
    sid: String,
    #[serde(default)]
    rt: String,
    /// Kept as a raw string: an unparsable limit falls back to the default.
    #[serde(default)]
    limit: Option<String>,
}

/// GET /api/relay/session/receive - Drain queued messages, oldest-first.
async fn receive_messages(
    State(state): State<AppState>,
    Query(query): Query<ReceiveQuery>,
) -> Result<Response, RelayError> {
    let limit = query.limit.as_deref().and_then(|raw| raw.parse::<i64>().ok());
    let messages = relay::receive_messages(&state.sessions, &query.sid, &query.rt, limit)?;
    Ok(Json(json!({ "messages": messages })).into_response())
}

/// Fallback for relay routes hit with the wrong method.
async fn method_not_allowed() -> RelayError {
    RelayError::MethodNotAllowed
}

/// JSON 404 for paths outside the API that match no static file.
async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found." })))
}
