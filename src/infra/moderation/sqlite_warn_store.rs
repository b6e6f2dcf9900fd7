// SQLite-backed warn store for persistent warning ledgers.
//
// Tables:
// - warnings: One row per warning, insertion-ordered by rowid
//
// Expiry is swept lazily inside each call, mirroring the in-memory store:
// rows strictly older than the window are deleted before counting.

use crate::core::moderation::{WarnError, WarnSource, WarnStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Row, Sqlite};
use std::time::Duration;

pub struct SqliteWarnStore {
    pool: Pool<Sqlite>,
}

impl SqliteWarnStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), WarnError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS warnings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                issued_at TEXT NOT NULL,
                source TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| WarnError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_warnings_chat_user
                ON warnings(chat_id, user_id, issued_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| WarnError::Storage(e.to_string()))?;

        Ok(())
    }

    /// Delete rows strictly older than the expiry window.
    async fn sweep_expired(
        &self,
        chat_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
        expire_after: Option<Duration>,
    ) -> Result<(), WarnError> {
        let Some(window) = expire_after else {
            return Ok(());
        };
        let window = chrono::Duration::from_std(window)
            .map_err(|e| WarnError::Storage(e.to_string()))?;
        let cutoff = now - window;

        sqlx::query("DELETE FROM warnings WHERE chat_id = ? AND user_id = ? AND issued_at < ?")
            .bind(chat_id)
            .bind(user_id)
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| WarnError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn count(&self, chat_id: i64, user_id: i64) -> Result<u32, WarnError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS warn_count FROM warnings WHERE chat_id = ? AND user_id = ?",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| WarnError::Storage(e.to_string()))?;

        let count: i64 = row.get("warn_count");
        Ok(count as u32)
    }
}

#[async_trait]
impl WarnStore for SqliteWarnStore {
    async fn add_warning(
        &self,
        chat_id: i64,
        user_id: i64,
        source: WarnSource,
        now: DateTime<Utc>,
        expire_after: Option<Duration>,
    ) -> Result<u32, WarnError> {
        sqlx::query(
            r#"
            INSERT INTO warnings (chat_id, user_id, issued_at, source)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(now.to_rfc3339())
        .bind(source.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| WarnError::Storage(e.to_string()))?;

        self.sweep_expired(chat_id, user_id, now, expire_after).await?;
        self.count(chat_id, user_id).await
    }

    async fn count_active(
        &self,
        chat_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
        expire_after: Option<Duration>,
    ) -> Result<u32, WarnError> {
        self.sweep_expired(chat_id, user_id, now, expire_after).await?;
        self.count(chat_id, user_id).await
    }

    async fn remove_newest(&self, chat_id: i64, user_id: i64) -> Result<u32, WarnError> {
        sqlx::query(
            r#"
            DELETE FROM warnings WHERE id = (
                SELECT id FROM warnings
                WHERE chat_id = ? AND user_id = ?
                ORDER BY id DESC LIMIT 1
            )
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| WarnError::Storage(e.to_string()))?;

        self.count(chat_id, user_id).await
    }

    async fn reset(&self, chat_id: i64, user_id: i64) -> Result<(), WarnError> {
        sqlx::query("DELETE FROM warnings WHERE chat_id = ? AND user_id = ?")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| WarnError::Storage(e.to_string()))?;

        Ok(())
    }
}
