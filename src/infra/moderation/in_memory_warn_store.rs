// In-memory implementation of WarnStore.
//
// Backs tests and small single-process deployments; the SQLite store
// implements the same trait for persistence across restarts.

use crate::core::moderation::{WarnError, WarnSource, WarnStore, Warning};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::time::Duration;

/// Maps (chat_id, user_id) -> insertion-ordered warning ledger.
pub struct InMemoryWarnStore {
    ledgers: DashMap<(i64, i64), Vec<Warning>>,
}

impl InMemoryWarnStore {
    pub fn new() -> Self {
        Self {
            ledgers: DashMap::new(),
        }
    }

    /// Expiry is strict: a warning older than exactly the window survives
    /// only while `now - issued_at <= window`.
    fn sweep(entries: &mut Vec<Warning>, now: DateTime<Utc>, expire_after: Option<Duration>) {
        let Some(window) = expire_after.and_then(|w| chrono::Duration::from_std(w).ok()) else {
            return;
        };
        entries.retain(|w| now.signed_duration_since(w.issued_at) <= window);
    }
}

impl Default for InMemoryWarnStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WarnStore for InMemoryWarnStore {
    async fn add_warning(
        &self,
        chat_id: i64,
        user_id: i64,
        source: WarnSource,
        now: DateTime<Utc>,
        expire_after: Option<Duration>,
    ) -> Result<u32, WarnError> {
        let mut entry = self.ledgers.entry((chat_id, user_id)).or_default();
        entry.push(Warning {
            chat_id,
            user_id,
            issued_at: now,
            source,
        });
        Self::sweep(&mut entry, now, expire_after);
        Ok(entry.len() as u32)
    }

    async fn count_active(
        &self,
        chat_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
        expire_after: Option<Duration>,
    ) -> Result<u32, WarnError> {
        match self.ledgers.get_mut(&(chat_id, user_id)) {
            Some(mut entry) => {
                Self::sweep(&mut entry, now, expire_after);
                Ok(entry.len() as u32)
            }
            None => Ok(0),
        }
    }

    async fn remove_newest(&self, chat_id: i64, user_id: i64) -> Result<u32, WarnError> {
        match self.ledgers.get_mut(&(chat_id, user_id)) {
            Some(mut entry) => {
                entry.pop();
                Ok(entry.len() as u32)
            }
            None => Ok(0),
        }
    }

    async fn reset(&self, chat_id: i64, user_id: i64) -> Result<(), WarnError> {
        self.ledgers.remove(&(chat_id, user_id));
        Ok(())
    }
}
