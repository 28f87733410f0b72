//! Background expiry sweeping.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::session::SessionStore;

/// Spawn the periodic sweep task.
///
/// The task runs for the lifetime of the process; there is no shutdown hook.
/// Lazy eviction on access keeps callers correct between ticks — the sweep
/// only bounds memory for sessions nobody polls again.
pub fn spawn(store: SessionStore, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of a tokio interval completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = store.sweep();
            if evicted > 0 {
                debug!(evicted, "swept expired sessions");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_expired_sessions() {
        let store = SessionStore::new();
        store.insert("stale", Session::new("r", "w", 0));
        store.insert("fresh", Session::new("r", "w", i64::MAX));

        let handle = spawn(store.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert!(store.get("stale").is_none());
        assert!(store.get("fresh").is_some());
    }
}
