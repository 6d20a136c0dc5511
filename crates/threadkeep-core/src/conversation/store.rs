//! Session-scoped, time-bounded turn log with replay support.
//!
//! `ConversationStore` owns the mapping from [`SessionKey`] to transcript on
//! top of any [`TranscriptBackend`]. It encodes turns on the way in, decodes
//! and filters them on the way out, applies the sliding TTL on every write,
//! and bounds each backend call with a timeout.

use std::future::Future;
use std::time::Duration;

use threadkeep_types::chat::{Role, SessionKey, Turn};
use threadkeep_types::config::StorageConfig;
use threadkeep_types::error::StoreError;
use tracing::{debug, warn};

use crate::clock::{deadline_after, SharedClock};
use crate::storage::transcript_backend::{PushOptions, TranscriptBackend};

/// Conversation memory over a transcript backend.
///
/// Generic over `TranscriptBackend` so core never depends on a concrete
/// database. Cheap to share behind an `Arc`; it holds no per-session state.
pub struct ConversationStore<B: TranscriptBackend> {
    backend: B,
    clock: SharedClock,
    ttl: Duration,
    timeout: Duration,
    max_turns: Option<usize>,
}

impl<B: TranscriptBackend> ConversationStore<B> {
    /// Create a store with TTL, timeout and optional cap taken from config.
    pub fn new(backend: B, clock: SharedClock, config: &StorageConfig) -> Self {
        Self {
            backend,
            clock,
            ttl: config.ttl(),
            timeout: config.timeout(),
            max_turns: config.max_turns,
        }
    }

    /// Access the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The sliding expiration window applied on every append.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Run one backend call under the configured timeout.
    async fn bounded<T>(
        &self,
        op: &'static str,
        fut: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::unavailable(format!(
                "{op} timed out after {:?}",
                self.timeout
            ))),
        }
    }

    fn push_options(&self) -> PushOptions {
        PushOptions {
            expires_at: Some(deadline_after(self.clock.now(), self.ttl)),
            keep_last: self.max_turns,
        }
    }

    /// Return the transcript for a session, oldest first.
    ///
    /// Missing and expired sessions yield an empty transcript. Records that
    /// fail to decode are skipped, so the result is best effort.
    pub async fn load(&self, key: &SessionKey) -> Result<Vec<Turn>, StoreError> {
        let raw = self.bounded("load", self.backend.range(key.as_str())).await?;

        let mut turns = Vec::with_capacity(raw.len());
        for (position, record) in raw.iter().enumerate() {
            match Turn::decode(record) {
                Ok(turn) => turns.push(turn),
                Err(e) => {
                    warn!(session = %key, position, error = %e, "Skipping malformed turn record");
                }
            }
        }

        debug!(session = %key, turns = turns.len(), skipped = raw.len() - turns.len(), "Transcript loaded");
        Ok(turns)
    }

    /// Append one turn, creating the transcript if needed and resetting its
    /// deadline to `now + ttl`.
    pub async fn append(&self, key: &SessionKey, role: Role, text: &str) -> Result<(), StoreError> {
        let record = Turn::new(role, text).encode();
        self.bounded(
            "append",
            self.backend
                .push(key.as_str(), std::slice::from_ref(&record), self.push_options()),
        )
        .await?;

        debug!(session = %key, role = %role, "Turn appended");
        Ok(())
    }

    /// Append a user turn and the model turn answering it as one unit.
    ///
    /// Either both turns are stored or neither is.
    pub async fn append_exchange(
        &self,
        key: &SessionKey,
        user_text: &str,
        model_text: &str,
    ) -> Result<(), StoreError> {
        let records = [Turn::user(user_text).encode(), Turn::model(model_text).encode()];
        self.bounded(
            "append_exchange",
            self.backend.push(key.as_str(), &records, self.push_options()),
        )
        .await?;

        debug!(session = %key, "Exchange appended");
        Ok(())
    }

    /// Reset the deadline to `now + ttl`. Returns false when the session
    /// does not exist (or already expired).
    pub async fn refresh_expiry(&self, key: &SessionKey, ttl: Duration) -> Result<bool, StoreError> {
        let deadline = deadline_after(self.clock.now(), ttl);
        self.bounded("refresh_expiry", self.backend.expire(key.as_str(), deadline))
            .await
    }

    /// Remove a transcript immediately. Returns whether one existed.
    pub async fn delete(&self, key: &SessionKey) -> Result<bool, StoreError> {
        let existed = self.bounded("delete", self.backend.remove(key.as_str())).await?;
        debug!(session = %key, existed, "Transcript deleted");
        Ok(existed)
    }

    /// Number of stored records for a live session (malformed ones included).
    pub async fn len(&self, key: &SessionKey) -> Result<usize, StoreError> {
        self.bounded("len", self.backend.len(key.as_str())).await
    }

    /// Physically remove expired transcripts.
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        self.bounded("purge_expired", self.backend.purge_expired()).await
    }
}
