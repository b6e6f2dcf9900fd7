// Telegram layer - update routing and command handling.
//
// This layer is THIN - no business logic, just translation between wire
// types and the core services.

#[path = "commands.rs"]
pub mod commands;

#[path = "update_router.rs"]
pub mod router;

use crate::core::config::Config;
use crate::core::links::LinkRiskService;
use crate::core::moderation::ModerationService;
use crate::infra::links::HttpRedirectResolver;
use crate::infra::moderation::SqliteWarnStore;
use crate::infra::telegram::{TelegramApiClient, User};
use std::sync::Arc;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Shared state handed to every update handler.
#[derive(Clone)]
pub struct Data {
    pub config: Arc<Config>,
    pub api: Arc<TelegramApiClient>,
    pub engine: Arc<ModerationService<SqliteWarnStore, TelegramApiClient>>,
    pub links: Arc<LinkRiskService<HttpRedirectResolver>>,
    pub bot_username: String,
}

pub fn display_name(user: &User) -> String {
    match &user.username {
        Some(username) => format!("@{username}"),
        None => user.first_name.clone(),
    }
}
