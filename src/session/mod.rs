//! Session and message queue management.
//!
//! This module provides in-memory session storage for relaying messages
//! between unrelated parties. Sessions are identified by an opaque random ID
//! and carry a bounded FIFO queue of messages.
//!
//! # Architecture
//!
//! - [`Session`]: a single relay session (credentials, expiry, queue)
//! - [`SessionStore`]: thread-safe store for all active sessions
//!
//! # Example
//!
//! ```rust
//! use ephemeral_relay::session::{Session, SessionStore};
//!
//! let store = SessionStore::new();
//! let session = Session::new("read-token", "write-token", i64::MAX);
//! store.insert("abc123", session);
//!
//! assert!(store.resolve("abc123").is_ok());
//! ```

mod store;

pub use store::{Message, ResolveError, Session, SessionStore, format_expiry, now_ms};
