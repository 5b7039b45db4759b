//! Client profile records: upsert, lookup, and the operator-facing search by
//! ID, name, or phone.

use serde::{Deserialize, Serialize};

use crate::{Database, Result, now_secs};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub chat_id: i64,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub birthday: Option<String>,
    pub notifications: bool,
    /// Epoch seconds of the last birthday edit; edits are throttled to once
    /// per 365 days.
    pub birthday_changed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Profile {
    pub fn new(chat_id: i64) -> Self {
        let now = now_secs();
        Self {
            chat_id,
            name: None,
            phone: None,
            birthday: None,
            notifications: true,
            birthday_changed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    chat_id: i64,
    name: Option<String>,
    phone: Option<String>,
    birthday: Option<String>,
    notifications: i64,
    birthday_changed_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl From<ProfileRow> for Profile {
    fn from(r: ProfileRow) -> Self {
        Self {
            chat_id: r.chat_id,
            name: r.name,
            phone: r.phone,
            birthday: r.birthday,
            notifications: r.notifications != 0,
            birthday_changed_at: r.birthday_changed_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

const COLUMNS: &str = "chat_id, name, phone, birthday, notifications, birthday_changed_at, \
                       created_at, updated_at";

impl Database {
    pub async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO profiles
               (chat_id, name, phone, birthday, notifications, birthday_changed_at,
                created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(chat_id) DO UPDATE SET
                 name = excluded.name,
                 phone = excluded.phone,
                 birthday = excluded.birthday,
                 notifications = excluded.notifications,
                 birthday_changed_at = excluded.birthday_changed_at,
                 updated_at = excluded.updated_at"#,
        )
        .bind(profile.chat_id)
        .bind(&profile.name)
        .bind(&profile.phone)
        .bind(&profile.birthday)
        .bind(profile.notifications as i64)
        .bind(profile.birthday_changed_at)
        .bind(profile.created_at)
        .bind(now_secs())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn profile(&self, chat_id: i64) -> Result<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {COLUMNS} FROM profiles WHERE chat_id = ?"
        ))
        .bind(chat_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Into::into))
    }

    /// Operator history search: substring match on ID, name, or phone.
    pub async fn search_profiles(&self, query: &str, limit: u32) -> Result<Vec<Profile>> {
        let pattern = format!("%{query}%");
        let rows = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {COLUMNS} FROM profiles \
             WHERE CAST(chat_id AS TEXT) LIKE ? OR name LIKE ? OR phone LIKE ? \
             ORDER BY updated_at DESC LIMIT ?"
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Clients who completed a profile and kept notifications on, i.e. the
    /// broadcast audience.
    pub async fn broadcast_audience(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT chat_id FROM profiles WHERE notifications = 1 AND name IS NOT NULL",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(ids)
    }

    pub async fn profile_count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM profiles")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}
