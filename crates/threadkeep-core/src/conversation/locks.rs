//! Per-session mutual exclusion.
//!
//! Two concurrent requests on the same session would otherwise both read
//! the same history and interleave their appends. `SessionLocks` hands out
//! one async mutex per session key so the read-call-append sequence runs
//! one request at a time per session. Unrelated sessions never contend.
//!
//! Entries are dropped from the map as soon as no request holds or waits on
//! them, so idle sessions cost nothing.

use std::sync::Arc;

use dashmap::DashMap;
use threadkeep_types::chat::SessionKey;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-session locks.
#[derive(Default)]
pub struct SessionLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a session.
    pub async fn acquire(&self, key: &SessionKey) -> SessionGuard<'_> {
        // Clone the Arc out so no map shard is held across the await.
        let lock = self.locks.entry(key.as_str().to_string()).or_default().clone();
        let guard = lock.lock_owned().await;

        SessionGuard {
            locks: self,
            key: key.as_str().to_string(),
            guard: Some(guard),
        }
    }

    /// Number of sessions currently locked or awaited.
    pub fn active(&self) -> usize {
        self.locks.len()
    }
}

/// Exclusive access to one session; released on drop.
pub struct SessionGuard<'a> {
    locks: &'a SessionLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map still references the mutex: nobody holds or waits.
        self.locks
            .locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use threadkeep_types::chat::Namespace;

    fn key(id: &str) -> SessionKey {
        SessionKey::new(Namespace::Chat, id).unwrap()
    }

    #[tokio::test]
    async fn test_same_session_is_serialized() {
        let locks = Arc::new(SessionLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(&key("shared")).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_different_sessions_do_not_block() {
        let locks = SessionLocks::new();
        let _a = locks.acquire(&key("a")).await;

        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(&key("b"))).await;
        assert!(b.is_ok());
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn test_entry_pruned_after_release() {
        let locks = SessionLocks::new();
        {
            let _guard = locks.acquire(&key("idle")).await;
            assert_eq!(locks.active(), 1);
        }
        assert_eq!(locks.active(), 0);
    }
}
