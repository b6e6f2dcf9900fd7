// Update router - classifies inbound updates and dispatches them.
//
// Per-message failures are isolated here: an error while handling one
// update is logged and never propagates into the polling loop.

use super::{commands, display_name, Data, Error};
use crate::core::moderation::WarnSource;
use crate::core::policy::DeleteCategory;
use crate::infra::telegram::{Message, Update};

pub async fn handle_update(data: &Data, update: Update) {
    let Some(message) = update.message else {
        return;
    };

    if let Err(err) = route_message(data, &message).await {
        tracing::error!(
            chat_id = message.chat.id,
            message_id = message.message_id,
            "Error handling update: {err}"
        );
    }
}

async fn route_message(data: &Data, message: &Message) -> Result<(), Error> {
    // This bot moderates groups; private chats and channels are ignored.
    if !matches!(message.chat.kind.as_str(), "group" | "supergroup") {
        return Ok(());
    }

    // Join/leave service messages get a presence-log entry and fall under
    // their own deletion policy.
    if !message.new_chat_members.is_empty() {
        return handle_presence(data, message, PresenceKind::Join).await;
    }
    if message.left_chat_member.is_some() {
        return handle_presence(data, message, PresenceKind::Leave).await;
    }

    // Ignore other bots (including ourselves).
    if message.from.as_ref().is_some_and(|u| u.is_bot) {
        return Ok(());
    }

    let Some(text) = message.text.as_deref() else {
        return Ok(());
    };

    if text.starts_with('/') {
        return commands::handle_command(data, message, text).await;
    }

    // Length-triggered housekeeping is independent of everything below.
    data.engine
        .apply_custom_policy(message.chat.id, message.message_id, text)
        .await?;

    scan_links(data, message, text).await
}

#[derive(Clone, Copy)]
enum PresenceKind {
    Join,
    Leave,
}

async fn handle_presence(
    data: &Data,
    message: &Message,
    kind: PresenceKind,
) -> Result<(), Error> {
    if let Some(log_chat) = data.config.chats.presence_log.id() {
        let text = match kind {
            PresenceKind::Join => {
                let names: Vec<String> =
                    message.new_chat_members.iter().map(display_name).collect();
                format!("{} joined chat {}.", names.join(", "), message.chat.id)
            }
            PresenceKind::Leave => {
                let name = message
                    .left_chat_member
                    .as_ref()
                    .map(display_name)
                    .unwrap_or_else(|| "someone".to_string());
                format!("{} left chat {}.", name, message.chat.id)
            }
        };

        // The log copy is best-effort; the service message cleanup below
        // still happens.
        if let Err(err) = data.api.send_message(log_chat, &text, None).await {
            tracing::warn!(log_chat, "Failed to write presence log: {err}");
        }
    }

    let category = match kind {
        PresenceKind::Join => DeleteCategory::Join,
        PresenceKind::Leave => DeleteCategory::Leave,
    };
    data.engine
        .apply_delete_policy(message.chat.id, message.message_id, category)
        .await?;

    Ok(())
}

async fn scan_links(data: &Data, message: &Message, text: &str) -> Result<(), Error> {
    let Some(user) = message.from.as_ref() else {
        return Ok(());
    };

    let verdicts = data.links.evaluate(text).await;
    let Some(bad) = verdicts.iter().find(|v| v.is_flagged()) else {
        return Ok(());
    };

    tracing::info!(
        chat_id = message.chat.id,
        user_id = user.id,
        url = %bad.url,
        host = %bad.resolved_host,
        "Message contained a blacklisted link"
    );

    data.engine
        .issue_warning(
            message.chat.id,
            user.id,
            Some(message.message_id),
            WarnSource::Auto,
        )
        .await?;

    Ok(())
}
