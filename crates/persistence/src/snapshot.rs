//! Generic key → JSON blob store for the periodic best-effort full-state
//! snapshot. Never read back into live state automatically.

use serde::{Serialize, de::DeserializeOwned};

use crate::{Database, Result, now_secs};

impl Database {
    pub async fn save_snapshot<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let blob = serde_json::to_string(value)?;
        sqlx::query(
            r#"INSERT INTO snapshots (key, value, updated_at) VALUES (?, ?, ?)
               ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at"#,
        )
        .bind(key)
        .bind(blob)
        .bind(now_secs())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn load_snapshot<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let blob = sqlx::query_scalar::<_, String>("SELECT value FROM snapshots WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool())
            .await?;
        match blob {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use crate::test_db;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Blob {
        waiting: Vec<i64>,
        chats: u32,
    }

    #[tokio::test]
    async fn snapshot_roundtrip_overwrites() {
        let db = test_db().await;
        db.save_snapshot("state", &Blob {
            waiting: vec![1, 2],
            chats: 1,
        })
        .await
        .unwrap();
        db.save_snapshot("state", &Blob {
            waiting: vec![3],
            chats: 0,
        })
        .await
        .unwrap();

        let loaded: Blob = db.load_snapshot("state").await.unwrap().unwrap();
        assert_eq!(loaded, Blob {
            waiting: vec![3],
            chats: 0,
        });
    }

    #[tokio::test]
    async fn missing_snapshot_is_none() {
        let db = test_db().await;
        let loaded: Option<Blob> = db.load_snapshot("nothing").await.unwrap();
        assert!(loaded.is_none());
    }
}
