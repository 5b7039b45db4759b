//! Append-only log of relayed conversation, queried by the operator history
//! view.

use serde::Serialize;

use crate::{Database, Result, now_secs};

/// Who authored a logged line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Client,
    Operator,
}

impl LogKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Operator => "operator",
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LogEntry {
    pub id: i64,
    pub from_id: i64,
    pub to_id: i64,
    pub body: String,
    pub kind: String,
    pub created_at: i64,
}

impl Database {
    /// Append one relayed line. Bodies are truncated to keep rows bounded.
    pub async fn log_message(
        &self,
        from_id: i64,
        to_id: i64,
        body: &str,
        kind: LogKind,
    ) -> Result<()> {
        let body: String = body.chars().take(500).collect();
        sqlx::query(
            "INSERT INTO messages (from_id, to_id, body, kind, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(from_id)
        .bind(to_id)
        .bind(body)
        .bind(kind.as_str())
        .bind(now_secs())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// A client's conversation page, newest first.
    pub async fn client_history(
        &self,
        client_id: i64,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<LogEntry>> {
        let rows = sqlx::query_as::<_, LogEntry>(
            "SELECT id, from_id, to_id, body, kind, created_at FROM messages \
             WHERE from_id = ? OR to_id = ? \
             ORDER BY id DESC LIMIT ? OFFSET ?",
        )
        .bind(client_id)
        .bind(client_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Most recent log lines across all conversations, newest first.
    pub async fn recent_log(&self, limit: u32) -> Result<Vec<LogEntry>> {
        let rows = sqlx::query_as::<_, LogEntry>(
            "SELECT id, from_id, to_id, body, kind, created_at FROM messages \
             ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn message_count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_db;

    #[tokio::test]
    async fn log_and_page_history() {
        let db = test_db().await;
        for i in 0..5 {
            db.log_message(1, 100, &format!("line {i}"), LogKind::Client)
                .await
                .unwrap();
        }
        db.log_message(2, 100, "other client", LogKind::Client)
            .await
            .unwrap();

        let page = db.client_history(1, 3, 0).await.unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].body, "line 4", "newest first");

        let next = db.client_history(1, 3, 3).await.unwrap();
        assert_eq!(next.len(), 2);
    }

    #[tokio::test]
    async fn bodies_are_truncated() {
        let db = test_db().await;
        let long = "x".repeat(900);
        db.log_message(1, 2, &long, LogKind::Operator).await.unwrap();

        let page = db.client_history(1, 10, 0).await.unwrap();
        assert_eq!(page[0].body.len(), 500);
        assert_eq!(page[0].kind, "operator");
    }

    #[tokio::test]
    async fn recent_log_spans_conversations() {
        let db = test_db().await;
        db.log_message(1, 100, "a", LogKind::Client).await.unwrap();
        db.log_message(2, 100, "b", LogKind::Client).await.unwrap();

        let recent = db.recent_log(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(db.message_count().await.unwrap(), 2);
    }
}
