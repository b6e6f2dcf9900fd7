// This is the entry point of the group moderation bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (transport-agnostic)
// - `infra/` = Implementations of core traits (database, HTTP APIs)
// - `telegram/` = Telegram-specific adapters (update routing, commands)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Run the long-polling update loop

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;
#[path = "telegram/telegram_layer.rs"]
mod telegram;

use crate::core::config::Config;
use crate::core::links::LinkRiskService;
use crate::core::moderation::ModerationService;
use crate::core::policy::DeletionPolicies;
use crate::core::scheduler::TimerScheduler;
use crate::infra::links::HttpRedirectResolver;
use crate::infra::moderation::SqliteWarnStore;
use crate::infra::telegram::TelegramApiClient;
use crate::telegram::{router, Data};
use std::sync::Arc;
use std::time::Duration;

/// Telegram-side long-poll window for getUpdates.
const POLL_SECS: u64 = 30;

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config_path =
        std::env::var("GUARD_CONFIG").unwrap_or_else(|_| "config.json".to_string());
    let config = Config::load(&config_path).expect("Failed to load config file");

    // The token can come from the environment or the config file; the
    // environment wins so deployments can keep it out of the file.
    let token = std::env::var("BOT_TOKEN")
        .ok()
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| config.token.clone());
    if token.is_empty() {
        panic!("No bot token: set BOT_TOKEN or the `token` config field");
    }

    if !config.plugins.is_empty() {
        tracing::warn!(
            "Plugin loading is not supported; ignoring {} configured plugins",
            config.plugins.len()
        );
    }

    // Keep runtime databases in a dedicated folder so the repo root stays tidy.
    let data_dir = "data";
    std::fs::create_dir_all(data_dir).expect("Failed to create data directory for SQLite files");
    let warns_db_path = format!("{}/warnings.db", data_dir);

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", warns_db_path))
        .await
        .expect("Failed to connect to warnings DB");
    let warn_store = SqliteWarnStore::new(pool);
    warn_store
        .migrate()
        .await
        .expect("Failed to migrate warnings DB");

    let policies =
        DeletionPolicies::from_config(&config).expect("Invalid deletion policy configuration");
    let expire_after = config
        .expire_warns_after()
        .expect("Invalid expireWarnsAfter value");

    let api = Arc::new(
        TelegramApiClient::new(&token, config.warn_inline_keyboard.clone())
            .expect("Failed to create Telegram API client"),
    );

    let me = api.get_me().await.expect("getMe failed - check the bot token");
    let bot_username = me.username.clone().unwrap_or_default();
    tracing::info!(bot = %bot_username, "Bot identity confirmed");

    let scheduler = TimerScheduler::new();
    let engine = Arc::new(ModerationService::new(
        warn_store,
        Arc::clone(&api),
        policies,
        scheduler,
        config.number_of_warns_to_ban,
        expire_after,
    ));

    let resolver = HttpRedirectResolver::new().expect("Failed to create redirect resolver");
    let links = Arc::new(LinkRiskService::new(
        resolver,
        &config.blacklisted_domains,
        config.exclude_links.entries(),
    ));

    let data = Data {
        config: Arc::new(config),
        api: Arc::clone(&api),
        engine,
        links,
        bot_username,
    };

    // ========================================================================
    // UPDATE LOOP
    // ========================================================================
    // Long-poll getUpdates and dispatch each update on its own task. The
    // engine's per-key locking keeps same-user sequences serialized; errors
    // inside a handler never reach this loop.

    tracing::info!("Bot is ready, polling for updates");

    let mut offset = 0i64;
    loop {
        match api.get_updates(offset, POLL_SECS).await {
            Ok(updates) => {
                for update in updates {
                    offset = offset.max(update.update_id + 1);
                    let data = data.clone();
                    tokio::spawn(async move {
                        router::handle_update(&data, update).await;
                    });
                }
            }
            Err(err) => {
                tracing::warn!("getUpdates failed: {err}");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}
