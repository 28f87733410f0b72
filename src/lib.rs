//! Ephemeral Relay
//!
//! A server-mediated message relay: a client creates a short-lived session
//! identified by a secret pair of tokens (one for writing, one for reading),
//! and unrelated parties exchange small JSON payloads through it by polling.
//! Sessions expire on a TTL and queues are bounded with drop-oldest eviction.
//!
//! # Architecture
//!
//! - **Server**: Axum-based HTTP server with static asset serving
//! - **Session Store**: concurrent, TTL-expiring session map
//! - **Sweeper**: background task bounding memory for abandoned sessions
//!
//! # Modules
//!
//! - [`token`]: opaque credential generation
//! - [`session`]: session entities and the concurrent store
//! - [`relay`]: the create/send/receive operations
//! - [`cors`]: origin allow-list and middleware
//! - [`sweeper`]: periodic expiry sweep task
//! - [`config`]: layered configuration
//! - [`server`]: HTTP routing and startup

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::map_err_ignore)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod cors;
pub mod relay;
pub mod server;
pub mod session;
pub mod sweeper;
pub mod token;

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::cors::AllowedOrigins;
use crate::session::SessionStore;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Session store shared by handlers and the sweeper.
    pub sessions: SessionStore,
    /// Relay operation limits.
    pub relay: RelayConfig,
    /// CORS origin policy.
    pub allowed_origins: Arc<AllowedOrigins>,
}
