//! Cold storage: profile records, the append-only relay log, and periodic
//! full-state snapshot blobs, on SQLite via sqlx.
//!
//! Best-effort by contract: callers log and swallow errors; in-memory state
//! stays authoritative.

pub mod error;
pub mod message_log;
pub mod profiles;
pub mod snapshot;

pub use error::{Error, Result};

/// Shared connection pool with the schema applied.
#[derive(Clone)]
pub struct Database {
    pool: sqlx::SqlitePool,
}

impl Database {
    /// Connect and apply the schema.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = sqlx::SqlitePool::connect(url).await?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS profiles (
                chat_id             INTEGER PRIMARY KEY,
                name                TEXT,
                phone               TEXT,
                birthday            TEXT,
                notifications       INTEGER NOT NULL DEFAULT 1,
                birthday_changed_at INTEGER,
                created_at          INTEGER NOT NULL,
                updated_at          INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS messages (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                from_id    INTEGER NOT NULL,
                to_id      INTEGER NOT NULL,
                body       TEXT NOT NULL,
                kind       TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS snapshots (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_from ON messages(from_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_messages_to ON messages(to_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

pub(crate) fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

#[cfg(test)]
pub(crate) async fn test_db() -> Database {
    Database::connect("sqlite::memory:")
        .await
        .expect("in-memory database")
}
