// Moderation domain models - warnings, outcomes, gateway error taxonomy.
//
// These are pure domain types with no transport dependencies. The Telegram
// layer converts these to wire calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who issued a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarnSource {
    /// Produced by a rule (blacklisted link).
    Auto,
    /// Issued by an admin command.
    Manual,
}

impl WarnSource {
    pub fn as_str(self) -> &'static str {
        match self {
            WarnSource::Auto => "auto",
            WarnSource::Manual => "manual",
        }
    }
}

impl std::fmt::Display for WarnSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One warning in a user's ledger. Immutable once created; removed only by
/// the expiry sweep or a ban-triggered reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub chat_id: i64,
    pub user_id: i64,
    pub issued_at: DateTime<Utc>,
    pub source: WarnSource,
}

/// A message the gateway produced or acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Result of feeding one flagged message (or manual warn) through the
/// engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarnOutcome {
    Warned { count: u32, threshold: u32 },
    Banned { count: u32 },
}

/// Storage failures from a warn store.
#[derive(Debug, Error)]
pub enum WarnError {
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Transport-level failures, as seen by the engine.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Expected race: someone deleted the message before we did.
    #[error("Message already deleted")]
    AlreadyDeleted,

    /// Expected race: the user is already banned.
    #[error("User already banned")]
    AlreadyBanned,

    #[error("Operation forbidden: {0}")]
    Forbidden(String),

    #[error("Transport error: {message}")]
    Transport { message: String, transient: bool },
}

impl GatewayError {
    /// Transient failures get one retry with backoff; everything else is
    /// surfaced or swallowed depending on the call site.
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transport { transient: true, .. })
    }
}
