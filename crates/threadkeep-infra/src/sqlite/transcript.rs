//! SQLite transcript backend.
//!
//! Implements `TranscriptBackend` from `threadkeep-core` on two tables:
//! `transcript_turns` holds one row per stored value (ordered by its
//! autoincrement id) and `transcript_expiry` holds one row per list with its
//! deadline in Unix milliseconds. A list is live while its expiry row exists
//! and the deadline is in the future; expired rows are treated as absent on
//! read, cleared lazily on the next write, and removed in bulk by
//! `purge_expired`.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, Transaction};
use threadkeep_core::clock::SharedClock;
use threadkeep_core::storage::transcript_backend::{PushOptions, TranscriptBackend};
use threadkeep_types::error::StoreError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `TranscriptBackend`.
pub struct SqliteTranscriptBackend {
    pool: DatabasePool,
    clock: SharedClock,
}

impl SqliteTranscriptBackend {
    pub fn new(pool: DatabasePool, clock: SharedClock) -> Self {
        Self { pool, clock }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    fn now_ms(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::unavailable(format!("sqlite: {e}"))
}

/// Drop a list whose deadline has passed so a write starts it fresh.
async fn clear_if_expired(
    tx: &mut Transaction<'_, Sqlite>,
    key: &str,
    now_ms: i64,
) -> Result<(), sqlx::Error> {
    let expired = sqlx::query(
        "DELETE FROM transcript_expiry WHERE list_key = ? AND expires_at_ms IS NOT NULL AND expires_at_ms <= ?",
    )
    .bind(key)
    .bind(now_ms)
    .execute(&mut **tx)
    .await?
    .rows_affected();

    if expired > 0 {
        sqlx::query("DELETE FROM transcript_turns WHERE list_key = ?")
            .bind(key)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// TranscriptBackend implementation
// ---------------------------------------------------------------------------

impl TranscriptBackend for SqliteTranscriptBackend {
    async fn push(&self, key: &str, values: &[String], options: PushOptions) -> Result<(), StoreError> {
        let now = self.clock.now();
        let now_ms = now.timestamp_millis();
        let created_at = now.to_rfc3339();

        let mut tx = self.pool.writer.begin().await.map_err(unavailable)?;

        clear_if_expired(&mut tx, key, now_ms).await.map_err(unavailable)?;

        for value in values {
            sqlx::query("INSERT INTO transcript_turns (list_key, payload, created_at) VALUES (?, ?, ?)")
                .bind(key)
                .bind(value)
                .bind(&created_at)
                .execute(&mut *tx)
                .await
                .map_err(unavailable)?;
        }

        match options.expires_at {
            Some(deadline) => {
                sqlx::query(
                    "INSERT INTO transcript_expiry (list_key, expires_at_ms) VALUES (?, ?) \
                     ON CONFLICT(list_key) DO UPDATE SET expires_at_ms = excluded.expires_at_ms",
                )
                .bind(key)
                .bind(deadline.timestamp_millis())
                .execute(&mut *tx)
                .await
                .map_err(unavailable)?;
            }
            None => {
                sqlx::query("INSERT OR IGNORE INTO transcript_expiry (list_key, expires_at_ms) VALUES (?, NULL)")
                    .bind(key)
                    .execute(&mut *tx)
                    .await
                    .map_err(unavailable)?;
            }
        }

        if let Some(keep) = options.keep_last {
            sqlx::query(
                "DELETE FROM transcript_turns WHERE list_key = ? AND id NOT IN \
                 (SELECT id FROM transcript_turns WHERE list_key = ? ORDER BY id DESC LIMIT ?)",
            )
            .bind(key)
            .bind(key)
            .bind(i64::try_from(keep).unwrap_or(i64::MAX))
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;
        }

        tx.commit().await.map_err(unavailable)?;
        Ok(())
    }

    async fn range(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT t.payload FROM transcript_turns t \
             JOIN transcript_expiry e ON e.list_key = t.list_key \
             WHERE t.list_key = ? AND (e.expires_at_ms IS NULL OR e.expires_at_ms > ?) \
             ORDER BY t.id ASC",
        )
        .bind(key)
        .bind(self.now_ms())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(unavailable)?;

        Ok(rows.into_iter().map(|(payload,)| payload).collect())
    }

    async fn len(&self, key: &str) -> Result<usize, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM transcript_turns t \
             JOIN transcript_expiry e ON e.list_key = t.list_key \
             WHERE t.list_key = ? AND (e.expires_at_ms IS NULL OR e.expires_at_ms > ?)",
        )
        .bind(key)
        .bind(self.now_ms())
        .fetch_one(&self.pool.reader)
        .await
        .map_err(unavailable)?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.writer.begin().await.map_err(unavailable)?;

        let live = sqlx::query(
            "DELETE FROM transcript_expiry WHERE list_key = ? AND (expires_at_ms IS NULL OR expires_at_ms > ?)",
        )
        .bind(key)
        .bind(self.now_ms())
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?
        .rows_affected()
            > 0;

        sqlx::query("DELETE FROM transcript_expiry WHERE list_key = ?")
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;
        sqlx::query("DELETE FROM transcript_turns WHERE list_key = ?")
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;

        tx.commit().await.map_err(unavailable)?;
        Ok(live)
    }

    async fn expire(&self, key: &str, expires_at: DateTime<Utc>) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE transcript_expiry SET expires_at_ms = ? \
             WHERE list_key = ? AND (expires_at_ms IS NULL OR expires_at_ms > ?)",
        )
        .bind(expires_at.timestamp_millis())
        .bind(key)
        .bind(self.now_ms())
        .execute(&self.pool.writer)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now_ms = self.now_ms();
        let mut tx = self.pool.writer.begin().await.map_err(unavailable)?;

        sqlx::query(
            "DELETE FROM transcript_turns WHERE list_key IN \
             (SELECT list_key FROM transcript_expiry WHERE expires_at_ms IS NOT NULL AND expires_at_ms <= ?)",
        )
        .bind(now_ms)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        let purged = sqlx::query(
            "DELETE FROM transcript_expiry WHERE expires_at_ms IS NOT NULL AND expires_at_ms <= ?",
        )
        .bind(now_ms)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?
        .rows_affected();

        tx.commit().await.map_err(unavailable)?;

        if purged > 0 {
            tracing::debug!(purged, "Purged expired transcripts");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use threadkeep_core::clock::ManualClock;
    use threadkeep_core::conversation::store::ConversationStore;
    use threadkeep_types::chat::{Namespace, Role, SessionKey, Turn};
    use threadkeep_types::config::StorageConfig;

    const TTL: Duration = Duration::from_secs(24 * 60 * 60);

    struct Fixture {
        store: ConversationStore<SqliteTranscriptBackend>,
        clock: Arc<ManualClock>,
        _dir: tempfile::TempDir,
    }

    async fn open(dir: &tempfile::TempDir, clock: Arc<ManualClock>, config: &StorageConfig) -> ConversationStore<SqliteTranscriptBackend> {
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("transcripts.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();
        ConversationStore::new(SqliteTranscriptBackend::new(pool, clock.clone()), clock, config)
    }

    async fn fixture_with(config: StorageConfig) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let store = open(&dir, clock.clone(), &config).await;
        Fixture {
            store,
            clock,
            _dir: dir,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(StorageConfig::default()).await
    }

    fn key(id: &str) -> SessionKey {
        SessionKey::new(Namespace::Chat, id).unwrap()
    }

    #[tokio::test]
    async fn test_append_then_load_in_order() {
        let f = fixture().await;
        let s1 = key("s1");

        f.store.append(&s1, Role::User, "Hi").await.unwrap();
        f.store.append(&s1, Role::Model, "Hello!").await.unwrap();

        assert_eq!(
            f.store.load(&s1).await.unwrap(),
            vec![Turn::user("Hi"), Turn::model("Hello!")]
        );
    }

    #[tokio::test]
    async fn test_missing_session_is_empty() {
        let f = fixture().await;
        assert!(f.store.load(&key("unknown-session")).await.unwrap().is_empty());
        assert_eq!(f.store.len(&key("unknown-session")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sliding_expiration() {
        let f = fixture().await;
        let s2 = key("s2");

        f.store.append(&s2, Role::User, "hello").await.unwrap();
        f.store.refresh_expiry(&s2, TTL).await.unwrap();

        f.clock.advance(TTL - Duration::from_secs(1));
        assert_eq!(f.store.load(&s2).await.unwrap().len(), 1);

        f.clock.advance(Duration::from_secs(2));
        assert!(f.store.load(&s2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_after_expiry_starts_fresh() {
        let f = fixture().await;
        let s = key("reborn");

        f.store.append_exchange(&s, "old q", "old a").await.unwrap();
        f.clock.advance(TTL + Duration::from_secs(1));
        f.store.append(&s, Role::User, "new").await.unwrap();

        assert_eq!(f.store.load(&s).await.unwrap(), vec![Turn::user("new")]);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_skipped() {
        let f = fixture().await;
        let s = key("corrupt");

        f.store.append(&s, Role::User, "first").await.unwrap();
        sqlx::query("INSERT INTO transcript_turns (list_key, payload, created_at) VALUES (?, ?, ?)")
            .bind(s.as_str())
            .bind("not json at all")
            .bind(Utc::now().to_rfc3339())
            .execute(&f.store.backend().pool().writer)
            .await
            .unwrap();
        f.store.append(&s, Role::Model, "second").await.unwrap();

        assert_eq!(
            f.store.load(&s).await.unwrap(),
            vec![Turn::user("first"), Turn::model("second")]
        );
    }

    #[tokio::test]
    async fn test_closed_pool_reports_unavailable() {
        let f = fixture().await;
        f.store.backend().pool().close().await;

        let err = f.store.append(&key("down"), Role::User, "hi").await.unwrap_err();
        assert!(matches!(err, StoreError::StorageUnavailable(_)));
        let err = f.store.load(&key("down")).await.unwrap_err();
        assert!(matches!(err, StoreError::StorageUnavailable(_)));
    }

    #[tokio::test]
    async fn test_keep_last_trims_oldest() {
        let f = fixture_with(StorageConfig {
            max_turns: Some(2),
            ..StorageConfig::default()
        })
        .await;
        let s = key("capped");

        f.store.append_exchange(&s, "q1", "a1").await.unwrap();
        f.store.append_exchange(&s, "q2", "a2").await.unwrap();

        assert_eq!(
            f.store.load(&s).await.unwrap(),
            vec![Turn::user("q2"), Turn::model("a2")]
        );
    }

    #[tokio::test]
    async fn test_delete_and_namespace_isolation() {
        let f = fixture().await;
        let chat = SessionKey::new(Namespace::Chat, "shared").unwrap();
        let mcp = SessionKey::new(Namespace::Mcp, "shared").unwrap();

        f.store.append(&chat, Role::User, "chat side").await.unwrap();
        f.store.append(&mcp, Role::User, "tool side").await.unwrap();

        assert!(f.store.delete(&chat).await.unwrap());
        assert!(f.store.load(&chat).await.unwrap().is_empty());
        assert_eq!(f.store.load(&mcp).await.unwrap(), vec![Turn::user("tool side")]);
        assert!(!f.store.delete(&chat).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired() {
        let f = fixture().await;

        f.store.append(&key("old"), Role::User, "x").await.unwrap();
        f.clock.advance(TTL + Duration::from_secs(1));
        f.store.append(&key("fresh"), Role::User, "y").await.unwrap();

        assert_eq!(f.store.purge_expired().await.unwrap(), 1);

        let (rows,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transcript_turns")
            .fetch_one(&f.store.backend().pool().reader)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_transcripts_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let config = StorageConfig::default();
        let s = key("durable");

        {
            let store = open(&dir, clock.clone(), &config).await;
            store.append_exchange(&s, "remember me", "noted").await.unwrap();
            store.backend().pool().close().await;
        }

        let store = open(&dir, clock, &config).await;
        assert_eq!(store.load(&s).await.unwrap().len(), 2);
    }
}
