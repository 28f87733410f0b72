//! The relay operations: create session, send message, receive messages.
//!
//! These operate on the [`SessionStore`] and know nothing about HTTP framing;
//! the server module maps [`RelayError`] variants onto status codes.

use serde::Serialize;
use serde_json::Value;

use crate::config::RelayConfig;
use crate::session::{Message, ResolveError, Session, SessionStore, format_expiry, now_ms};
use crate::token;

/// Sessions never live shorter than this, regardless of the requested TTL.
const MIN_TTL_SECONDS: u64 = 30;
/// Ceiling on messages returned by a single receive call.
const MAX_RECEIVE_LIMIT: i64 = 20;
/// Receive limit when the client does not supply one.
const DEFAULT_RECEIVE_LIMIT: usize = 20;

/// Terminal, user-visible relay failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RelayError {
    /// A required field was missing or empty after trimming.
    #[error("{0}")]
    BadRequest(&'static str),

    /// Token mismatch for the requested operation.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// No session under that ID.
    #[error("Session not found.")]
    NotFound,

    /// The session existed but its TTL has passed.
    #[error("Session expired.")]
    Expired,

    /// Serialized payload or raw body exceeds the configured bound.
    #[error("Payload too large (max {max} bytes).")]
    PayloadTooLarge { max: usize },

    /// Wrong HTTP method for a relay route.
    #[error("Method not allowed")]
    MethodNotAllowed,
}

impl From<ResolveError> for RelayError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound => Self::NotFound,
            ResolveError::Expired => Self::Expired,
        }
    }
}

/// Result of a successful create operation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub session_id: String,
    pub read_token: String,
    pub write_token: String,
    /// RFC3339 expiry timestamp.
    pub expires_at: String,
    /// Effective TTL after clamping.
    pub ttl_seconds: u64,
}

/// Create a session with a clamped TTL and fresh credentials.
///
/// A missing or unparsable requested TTL falls back to the configured
/// default; there are no error conditions.
pub fn create_session(
    store: &SessionStore,
    cfg: &RelayConfig,
    requested_ttl: Option<f64>,
) -> CreatedSession {
    let ttl_seconds = match requested_ttl {
        Some(secs) => {
            // Negative and NaN requests saturate to zero and take the floor.
            let mut val = secs as u64;
            if val < MIN_TTL_SECONDS {
                val = MIN_TTL_SECONDS;
            } else if val > cfg.max_ttl_seconds {
                val = cfg.max_ttl_seconds;
            }
            val
        }
        None => cfg.default_ttl_seconds,
    };

    let session_id = token::generate(token::SESSION_ID_BYTES);
    let read_token = token::generate(token::ACCESS_TOKEN_BYTES);
    let write_token = token::generate(token::ACCESS_TOKEN_BYTES);
    let expires_at_ms = now_ms() + (ttl_seconds * 1000) as i64;

    store.insert(
        session_id.clone(),
        Session::new(read_token.clone(), write_token.clone(), expires_at_ms),
    );

    CreatedSession {
        session_id,
        read_token,
        write_token,
        expires_at: format_expiry(expires_at_ms),
        ttl_seconds,
    }
}

/// Append a payload to a session's queue.
///
/// Returns the resulting queue length. Serializes only against other
/// operations on the same session.
pub fn send_message(
    store: &SessionStore,
    cfg: &RelayConfig,
    session_id: &str,
    write_token: &str,
    payload: Value,
) -> Result<usize, RelayError> {
    let session_id = session_id.trim();
    let write_token = write_token.trim();
    if session_id.is_empty() || write_token.is_empty() {
        return Err(RelayError::BadRequest(
            "sessionId and writeToken are required.",
        ));
    }

    let session = store.resolve(session_id)?;

    if write_token != session.write_token() {
        return Err(RelayError::Unauthorized("Invalid write token."));
    }

    let serialized = serde_json::to_vec(&payload).map_err(|_| RelayError::PayloadTooLarge {
        max: cfg.max_payload_bytes,
    })?;
    if serialized.len() > cfg.max_payload_bytes {
        return Err(RelayError::PayloadTooLarge {
            max: cfg.max_payload_bytes,
        });
    }

    let queued = session.push_message(
        Message {
            id: token::generate(token::MESSAGE_ID_BYTES),
            created_at: now_ms(),
            payload,
        },
        cfg.max_queue_messages,
    );
    Ok(queued)
}

/// Destructively read up to `limit` messages from the front of a session's
/// queue, oldest-first.
///
/// An empty queue yields an empty vec, never an error.
pub fn receive_messages(
    store: &SessionStore,
    session_id: &str,
    read_token: &str,
    limit: Option<i64>,
) -> Result<Vec<Message>, RelayError> {
    let session_id = session_id.trim();
    let read_token = read_token.trim();
    if session_id.is_empty() || read_token.is_empty() {
        return Err(RelayError::BadRequest("sid and rt are required."));
    }

    let session = store.resolve(session_id)?;

    if read_token != session.read_token() {
        return Err(RelayError::Unauthorized("Invalid read token."));
    }

    let limit = match limit {
        Some(n) => n.clamp(1, MAX_RECEIVE_LIMIT) as usize,
        None => DEFAULT_RECEIVE_LIMIT,
    };
    Ok(session.drain_front(limit))
}
