//! libSQL-backed context store.
//!
//! Single-table durable backend. `expire_at` carries epoch seconds;
//! expired rows are filtered on read and pruned opportunistically on
//! write, so the trait's absent-or-expired contract holds without a
//! background sweeper.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use libsql::params;

use crate::error::StoreError;
use crate::store::ContextStore;

/// Schema for the context table. Applied on open; idempotent via
/// `IF NOT EXISTS`.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS context (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    expire_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_context_expire ON context(expire_at);
"#;

/// File-backed store for durable conversation context.
pub struct LibSqlStore {
    db: libsql::Database,
}

impl LibSqlStore {
    /// Open (or create) a local database file and apply the schema.
    pub async fn new_local(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(path.as_ref())
            .build()
            .await
            .map_err(|e| StoreError::Unavailable {
                reason: format!("open {}: {e}", path.as_ref().display()),
            })?;

        let store = Self { db };
        let conn = store.connect()?;
        conn.execute_batch(SCHEMA)
            .await
            .map_err(|e| StoreError::Unavailable {
                reason: format!("apply schema: {e}"),
            })?;
        Ok(store)
    }

    fn connect(&self) -> Result<libsql::Connection, StoreError> {
        self.db.connect().map_err(|e| StoreError::Unavailable {
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ContextStore for LibSqlStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.connect()?;
        let now = Utc::now().timestamp();
        let mut rows = conn
            .query(
                "SELECT value FROM context WHERE key = ?1 AND expire_at > ?2",
                params![key, now],
            )
            .await
            .map_err(|e| StoreError::Unavailable {
                reason: e.to_string(),
            })?;

        match rows.next().await.map_err(|e| StoreError::Unavailable {
            reason: e.to_string(),
        })? {
            Some(row) => {
                let value = row.get::<String>(0).map_err(|e| StoreError::Unavailable {
                    reason: e.to_string(),
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let now = Utc::now().timestamp();
        let expire_at = now + ttl.as_secs() as i64;

        // Prune rows that expired before this write.
        conn.execute("DELETE FROM context WHERE expire_at <= ?1", params![now])
            .await
            .map_err(|e| StoreError::Unavailable {
                reason: e.to_string(),
            })?;

        conn.execute(
            "INSERT INTO context (key, value, expire_at) VALUES (?1, ?2, ?3) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
             expire_at = excluded.expire_at",
            params![key, value, expire_at],
        )
        .await
        .map_err(|e| StoreError::Unavailable {
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
