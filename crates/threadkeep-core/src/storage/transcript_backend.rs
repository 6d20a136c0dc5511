//! Transcript backend trait.
//!
//! The minimal list-store contract the conversation store needs: ordered
//! append-to-tail, ordered full read, deletion, and per-key expiration that
//! is reset on write. Values are opaque encoded records; decoding happens in
//! [`ConversationStore`](crate::conversation::store::ConversationStore).
//! Implementations live in threadkeep-infra.

use chrono::{DateTime, Utc};
use threadkeep_types::error::StoreError;

/// Options applied atomically with a [`TranscriptBackend::push`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOptions {
    /// New deadline for the whole list. `None` leaves any existing deadline.
    pub expires_at: Option<DateTime<Utc>>,
    /// After appending, drop the oldest values so at most this many remain.
    pub keep_last: Option<usize>,
}

/// Ordered, expiring list storage keyed by string.
///
/// An expired key must read exactly like a missing key. Every method fails
/// with [`StoreError::StorageUnavailable`] only when the underlying store
/// cannot be reached.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait TranscriptBackend: Send + Sync {
    /// Append values to the tail of the list, creating it if absent.
    ///
    /// All values and the options are applied as one unit: either every
    /// value is stored or none is.
    fn push(
        &self,
        key: &str,
        values: &[String],
        options: PushOptions,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Read the whole list, oldest first. Missing or expired keys yield an
    /// empty list.
    fn range(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// Number of values in a live list.
    fn len(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<usize, StoreError>> + Send;

    /// Delete a list. Returns whether a live list existed.
    fn remove(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Set a new deadline on a live list. Returns false when there is
    /// nothing to expire.
    fn expire(
        &self,
        key: &str,
        expires_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    /// Physically delete every list whose deadline has passed. Returns the
    /// number of lists removed.
    fn purge_expired(&self) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;
}

impl<T: TranscriptBackend + ?Sized> TranscriptBackend for std::sync::Arc<T> {
    fn push(
        &self,
        key: &str,
        values: &[String],
        options: PushOptions,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send {
        (**self).push(key, values, options)
    }

    fn range(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>, StoreError>> + Send {
        (**self).range(key)
    }

    fn len(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<usize, StoreError>> + Send {
        (**self).len(key)
    }

    fn remove(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send {
        (**self).remove(key)
    }

    fn expire(
        &self,
        key: &str,
        expires_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send {
        (**self).expire(key, expires_at)
    }

    fn purge_expired(&self) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send {
        (**self).purge_expired()
    }
}
