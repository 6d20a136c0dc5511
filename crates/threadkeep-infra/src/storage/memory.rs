//! Process-local transcript backend.
//!
//! `DashMap`-backed; values are lost on restart. Used for
//! `storage.backend = "memory"` and in tests. Each key's entry lock makes a
//! push (append, trim, deadline) a single atomic step.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use threadkeep_core::clock::SharedClock;
use threadkeep_core::storage::transcript_backend::{PushOptions, TranscriptBackend};
use threadkeep_types::error::StoreError;

#[derive(Debug, Default)]
struct List {
    values: Vec<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl List {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// In-memory implementation of `TranscriptBackend`.
pub struct InMemoryTranscriptBackend {
    lists: DashMap<String, List>,
    clock: SharedClock,
}

impl InMemoryTranscriptBackend {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            lists: DashMap::new(),
            clock,
        }
    }

    /// Read a live list. Expired lists are evicted and read as absent.
    fn read<T>(&self, key: &str, f: impl FnOnce(&List) -> T) -> Option<T> {
        let now = self.clock.now();
        let found = self.lists.get(key).map(|list| {
            if list.is_expired(now) {
                None
            } else {
                Some(f(&list))
            }
        });

        match found {
            Some(Some(value)) => Some(value),
            Some(None) => {
                self.lists.remove_if(key, |_, list| list.is_expired(now));
                None
            }
            None => None,
        }
    }
}

impl TranscriptBackend for InMemoryTranscriptBackend {
    async fn push(&self, key: &str, values: &[String], options: PushOptions) -> Result<(), StoreError> {
        let now = self.clock.now();
        let mut list = self.lists.entry(key.to_string()).or_default();

        if list.is_expired(now) {
            *list = List::default();
        }

        list.values.extend_from_slice(values);
        if let Some(keep) = options.keep_last {
            let excess = list.values.len().saturating_sub(keep);
            list.values.drain(..excess);
        }
        if options.expires_at.is_some() {
            list.expires_at = options.expires_at;
        }
        Ok(())
    }

    async fn range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.read(key, |list| list.values.clone()).unwrap_or_default())
    }

    async fn len(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.read(key, |list| list.values.len()).unwrap_or(0))
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let now = self.clock.now();
        Ok(self
            .lists
            .remove(key)
            .is_some_and(|(_, list)| !list.is_expired(now)))
    }

    async fn expire(&self, key: &str, expires_at: DateTime<Utc>) -> Result<bool, StoreError> {
        let now = self.clock.now();
        match self.lists.get_mut(key) {
            Some(mut list) if !list.is_expired(now) => {
                list.expires_at = Some(expires_at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let before = self.lists.len();
        self.lists.retain(|_, list| !list.is_expired(now));
        Ok(before.saturating_sub(self.lists.len()) as u64)
    }
}
