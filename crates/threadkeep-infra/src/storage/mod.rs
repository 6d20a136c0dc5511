//! Transcript storage backends and runtime backend selection.
//!
//! `TranscriptBackend` uses RPITIT and is not object-safe, so the backend
//! picked from configuration is carried in the [`AnyTranscriptBackend`] enum.

use chrono::{DateTime, Utc};
use threadkeep_core::clock::SharedClock;
use threadkeep_core::storage::transcript_backend::{PushOptions, TranscriptBackend};
use threadkeep_types::config::{StorageBackendKind, StorageConfig};
use threadkeep_types::error::StoreError;

use crate::sqlite::pool::{default_database_url, DatabasePool};
use crate::sqlite::transcript::SqliteTranscriptBackend;

pub mod memory;

pub use memory::InMemoryTranscriptBackend;

/// The transcript backend selected by `storage.backend`.
pub enum AnyTranscriptBackend {
    Sqlite(SqliteTranscriptBackend),
    Memory(InMemoryTranscriptBackend),
}

impl AnyTranscriptBackend {
    /// Open the configured backend. SQLite failures surface as
    /// `StorageUnavailable`.
    pub async fn open(config: &StorageConfig, clock: SharedClock) -> Result<Self, StoreError> {
        match config.backend {
            StorageBackendKind::Memory => {
                tracing::info!("Using in-memory transcript store; history is lost on restart");
                Ok(Self::Memory(InMemoryTranscriptBackend::new(clock)))
            }
            StorageBackendKind::Sqlite => {
                let url = config
                    .database_url
                    .clone()
                    .unwrap_or_else(default_database_url);
                ensure_parent_dir(&url)?;
                let pool = DatabasePool::new(&url)
                    .await
                    .map_err(|e| StoreError::unavailable(format!("failed to open {url}: {e}")))?;
                tracing::info!(url = %url, "Opened SQLite transcript store");
                Ok(Self::Sqlite(SqliteTranscriptBackend::new(pool, clock)))
            }
        }
    }

    pub fn kind(&self) -> StorageBackendKind {
        match self {
            Self::Sqlite(_) => StorageBackendKind::Sqlite,
            Self::Memory(_) => StorageBackendKind::Memory,
        }
    }

    /// Release database connections, if any.
    pub async fn close(&self) {
        if let Self::Sqlite(backend) = self {
            backend.pool().close().await;
        }
    }
}

/// Create the directory holding a file-based SQLite database.
fn ensure_parent_dir(url: &str) -> Result<(), StoreError> {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }
    match std::path::Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .map_err(|e| StoreError::unavailable(format!("cannot create {}: {e}", parent.display()))),
        _ => Ok(()),
    }
}

impl TranscriptBackend for AnyTranscriptBackend {
    async fn push(&self, key: &str, values: &[String], options: PushOptions) -> Result<(), StoreError> {
        match self {
            Self::Sqlite(b) => b.push(key, values, options).await,
            Self::Memory(b) => b.push(key, values, options).await,
        }
    }

    async fn range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Sqlite(b) => b.range(key).await,
            Self::Memory(b) => b.range(key).await,
        }
    }

    async fn len(&self, key: &str) -> Result<usize, StoreError> {
        match self {
            Self::Sqlite(b) => b.len(key).await,
            Self::Memory(b) => b.len(key).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        match self {
            Self::Sqlite(b) => b.remove(key).await,
            Self::Memory(b) => b.remove(key).await,
        }
    }

    async fn expire(&self, key: &str, expires_at: DateTime<Utc>) -> Result<bool, StoreError> {
        match self {
            Self::Sqlite(b) => b.expire(key, expires_at).await,
            Self::Memory(b) => b.expire(key, expires_at).await,
        }
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        match self {
            Self::Sqlite(b) => b.purge_expired().await,
            Self::Memory(b) => b.purge_expired().await,
        }
    }
}
