//! Session entities and the concurrent session store.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

/// A single queued relay message.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    /// Opaque random identifier, not required to be unique across sessions.
    pub id: String,
    /// Creation instant, epoch milliseconds.
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    /// Arbitrary JSON payload, size-bounded at ingestion.
    pub payload: serde_json::Value,
}

/// Current time as epoch milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Render an epoch-ms instant as an RFC3339 UTC timestamp.
#[must_use]
pub fn format_expiry(expires_at_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(expires_at_ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A single relay session.
///
/// Sessions hold the read/write credentials, the fixed expiry instant, and
/// the bounded message queue. Handles are cheap to clone and share one
/// underlying session.
#[derive(Debug)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Capability for draining the queue.
    read_token: String,
    /// Capability for appending to the queue.
    write_token: String,
    /// Absolute expiry instant, fixed at creation.
    expires_at_ms: i64,
    /// FIFO message queue. Append and drain serialize on this lock only;
    /// operations on other sessions are unaffected.
    queue: Mutex<VecDeque<Message>>,
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.inner.read_token == other.inner.read_token
            && self.inner.write_token == other.inner.write_token
            && self.inner.expires_at_ms == other.inner.expires_at_ms
    }
}

impl Session {
    /// Create a session with the given credentials and expiry instant.
    #[must_use]
    pub fn new(
        read_token: impl Into<String>,
        write_token: impl Into<String>,
        expires_at_ms: i64,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                read_token: read_token.into(),
                write_token: write_token.into(),
                expires_at_ms,
                queue: Mutex::new(VecDeque::new()),
            }),
        }
    }

    /// The read capability token.
    #[must_use]
    pub fn read_token(&self) -> &str {
        &self.inner.read_token
    }

    /// The write capability token.
    #[must_use]
    pub fn write_token(&self) -> &str {
        &self.inner.write_token
    }

    /// The absolute expiry instant in epoch milliseconds.
    #[must_use]
    pub fn expires_at_ms(&self) -> i64 {
        self.inner.expires_at_ms
    }

    /// Whether the session is expired at the given instant.
    #[must_use]
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms > self.inner.expires_at_ms
    }

    /// Append a message, evicting from the front while the queue exceeds
    /// `max_len`. Returns the resulting queue length.
    pub fn push_message(&self, message: Message, max_len: usize) -> usize {
        let mut queue = self.inner.queue.lock().unwrap();
        queue.push_back(message);
        while queue.len() > max_len {
            queue.pop_front();
        }
        queue.len()
    }

    /// Atomically remove up to `limit` messages from the front of the queue
    /// and return them oldest-first. Messages not removed stay queued.
    pub fn drain_front(&self, limit: usize) -> Vec<Message> {
        let mut queue = self.inner.queue.lock().unwrap();
        let take = limit.min(queue.len());
        queue.drain(..take).collect()
    }

    /// Current queue length.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.inner.queue.lock().unwrap().len()
    }
}

/// Failure modes of an expiry-aware session lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// No session under that ID. A deleted session is indistinguishable from
    /// one that never existed.
    NotFound,
    /// The session existed but its TTL has passed; it has been removed.
    Expired,
}

/// Thread-safe store for sessions.
///
/// Map-level operations never hold any session's queue lock; callers clone
/// the session handle out and mutate the queue after the map guard is
/// dropped.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    /// Create a new session store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Insert or replace a session under the given ID.
    pub fn insert(&self, id: impl Into<String>, session: Session) {
        let mut guard = self.inner.sessions.write().unwrap();
        guard.insert(id.into(), session);
    }

    /// Pure lookup; does not check expiry.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Session> {
        let guard = self.inner.sessions.read().unwrap();
        guard.get(id).cloned()
    }

    /// Remove a session by ID. Idempotent.
    pub fn remove(&self, id: &str) -> Option<Session> {
        let mut guard = self.inner.sessions.write().unwrap();
        guard.remove(id)
    }

    /// Look up a session, evicting it if its TTL has passed.
    ///
    /// This is the lazy eviction path: no caller ever observes a logically
    /// expired session, even if the sweeper has not run yet.
    pub fn resolve(&self, id: &str) -> Result<Session, ResolveError> {
        self.resolve_at(id, now_ms())
    }

    /// [`resolve`](Self::resolve) against an explicit instant.
    pub fn resolve_at(&self, id: &str, now_ms: i64) -> Result<Session, ResolveError> {
        let session = self.get(id).ok_or(ResolveError::NotFound)?;
        if session.is_expired_at(now_ms) {
            self.remove(id);
            return Err(ResolveError::Expired);
        }
        Ok(session)
    }

    /// Remove all expired sessions.
    ///
    /// Returns the number of sessions removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(now_ms())
    }

    /// [`sweep`](Self::sweep) against an explicit instant.
    pub fn sweep_at(&self, now_ms: i64) -> usize {
        let mut guard = self.inner.sessions.write().unwrap();
        let before = guard.len();
        guard.retain(|_, session| !session.is_expired_at(now_ms));
        before - guard.len()
    }

    /// Number of live (unswept) sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.sessions.read().unwrap().len()
    }

    /// Whether the store holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(n: i64) -> Message {
        Message {
            id: format!("m{n}"),
            created_at: n,
            payload: json!(n),
        }
    }

    #[test]
    fn test_store_lifecycle() {
        let store = SessionStore::new();
        assert!(store.is_empty());

        store.insert("s1", Session::new("r", "w", i64::MAX));
        assert_eq!(store.len(), 1);

        let retrieved = store.get("s1").unwrap();
        assert_eq!(retrieved.read_token(), "r");
        assert_eq!(retrieved.write_token(), "w");

        store.remove("s1");
        assert!(store.is_empty());
        assert!(store.remove("s1").is_none());
    }

    #[test]
    fn test_queue_bound_front_drop() {
        let session = Session::new("r", "w", i64::MAX);

        for n in 1..=5 {
            session.push_message(message(n), 3);
        }
        assert_eq!(session.queue_len(), 3);

        // Oldest two were evicted; the last three survive in order.
        let drained = session.drain_front(10);
        let ids: Vec<&str> = drained.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m3", "m4", "m5"]);
    }

    #[test]
    fn test_drain_front_is_fifo_and_destructive() {
        let session = Session::new("r", "w", i64::MAX);
        for n in 1..=4 {
            session.push_message(message(n), 32);
        }

        let first = session.drain_front(2);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].id, "m1");
        assert_eq!(first[1].id, "m2");

        let rest = session.drain_front(10);
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].id, "m3");

        assert!(session.drain_front(10).is_empty());
    }

    #[test]
    fn test_resolve_expired_then_not_found() {
        let store = SessionStore::new();
        store.insert("stale", Session::new("r", "w", 1_000));

        assert_eq!(store.resolve_at("stale", 2_000), Err(ResolveError::Expired));
        // Lazy eviction removed it; the ID now looks like it never existed.
        assert_eq!(
            store.resolve_at("stale", 2_000),
            Err(ResolveError::NotFound)
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_resolve_live_session() {
        let store = SessionStore::new();
        store.insert("live", Session::new("r", "w", 5_000));

        // Expiry is strictly after the deadline.
        assert!(store.resolve_at("live", 5_000).is_ok());
        assert!(store.resolve_at("live", 5_001).is_err());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let store = SessionStore::new();
        store.insert("old", Session::new("r", "w", 1_000));
        store.insert("older", Session::new("r", "w", 500));
        store.insert("fresh", Session::new("r", "w", 10_000));

        assert_eq!(store.sweep_at(2_000), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get("fresh").is_some());
        assert_eq!(store.sweep_at(2_000), 0);
    }

    #[test]
    fn test_concurrent_pushes_respect_bound() {
        let session = Session::new("r", "w", i64::MAX);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let session = session.clone();
                std::thread::spawn(move || {
                    for n in 0..8 {
                        session.push_message(message(t * 8 + n), 64);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // 32 pushes below a bound of 64: nothing lost.
        assert_eq!(session.queue_len(), 32);
    }
}
