// Admin command handling: /warn, /unwarn, /report.
//
// Every command message also goes through the deleteCommands policy,
// including commands addressed to other bots (scope decides whether the
// policy applies).

use super::{display_name, Data, Error};
use crate::core::moderation::{WarnOutcome, WarnSource};
use crate::core::policy::{CommandScope, DeleteCategory};
use crate::infra::telegram::{Message, User};

#[derive(Debug, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    pub name: &'a str,
    pub target_bot: Option<&'a str>,
    pub args: &'a str,
}

/// Parse `/name@TargetBot args`. Returns None for text that only looks like
/// a command ("/" alone, "/ spaced").
pub fn parse_command(text: &str) -> Option<ParsedCommand<'_>> {
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    if head.is_empty() {
        return None;
    }

    let (name, target_bot) = match head.split_once('@') {
        Some((name, bot)) if !bot.is_empty() => (name, Some(bot)),
        Some((name, _)) => (name, None),
        None => (head, None),
    };
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    Some(ParsedCommand {
        name,
        target_bot,
        args,
    })
}

/// A bare `/cmd` is implicitly addressed to us; only an explicit
/// `@OtherBot` suffix makes it someone else's.
pub fn command_scope(parsed: &ParsedCommand<'_>, bot_username: &str) -> CommandScope {
    match parsed.target_bot {
        Some(target) if !target.eq_ignore_ascii_case(bot_username) => CommandScope::OtherBot,
        _ => CommandScope::ThisBot,
    }
}

pub async fn handle_command(data: &Data, message: &Message, text: &str) -> Result<(), Error> {
    let Some(parsed) = parse_command(text) else {
        return Ok(());
    };
    let scope = command_scope(&parsed, &data.bot_username);

    if scope == CommandScope::ThisBot {
        match parsed.name {
            "warn" => warn_command(data, message).await?,
            "unwarn" => unwarn_command(data, message).await?,
            "report" => report_command(data, message).await?,
            _ => {}
        }
    }

    // The command message itself is subject to the deleteCommands policy.
    data.engine
        .apply_delete_policy(
            message.chat.id,
            message.message_id,
            DeleteCategory::Command(scope),
        )
        .await?;

    Ok(())
}

async fn warn_command(data: &Data, message: &Message) -> Result<(), Error> {
    let Some(admin) = message.from.as_ref() else {
        return Ok(());
    };
    if !is_privileged(data, message.chat.id, admin).await {
        tracing::debug!(chat_id = message.chat.id, user_id = admin.id, "Ignoring /warn from non-admin");
        return Ok(());
    }

    let Some(target) = message.reply_to_message.as_deref() else {
        let sent = data
            .api
            .send_message(message.chat.id, "Reply to a message to warn its sender.", None)
            .await?;
        data.engine
            .apply_delete_policy(sent.chat.id, sent.message_id, DeleteCategory::WarnManual)
            .await?;
        return Ok(());
    };
    let Some(user) = target.from.as_ref() else {
        return Ok(());
    };
    if user.is_bot || is_privileged(data, message.chat.id, user).await {
        tracing::debug!(chat_id = message.chat.id, user_id = user.id, "Refusing to warn an admin or bot");
        return Ok(());
    }

    let outcome = data
        .engine
        .issue_warning(
            message.chat.id,
            user.id,
            Some(target.message_id),
            WarnSource::Manual,
        )
        .await?;

    if let WarnOutcome::Banned { count } = outcome {
        tracing::info!(
            chat_id = message.chat.id,
            user_id = user.id,
            count,
            "Manual warning reached the ban threshold"
        );
    }

    Ok(())
}

async fn unwarn_command(data: &Data, message: &Message) -> Result<(), Error> {
    let Some(admin) = message.from.as_ref() else {
        return Ok(());
    };
    if !is_privileged(data, message.chat.id, admin).await {
        return Ok(());
    }

    let Some(target) = message.reply_to_message.as_deref() else {
        return Ok(());
    };
    let Some(user) = target.from.as_ref() else {
        return Ok(());
    };

    let remaining = data.engine.unwarn(message.chat.id, user.id).await?;
    let text = format!(
        "Removed the last warning for {} ({remaining} remaining).",
        display_name(user)
    );
    let sent = data.api.send_message(message.chat.id, &text, None).await?;
    data.engine
        .apply_delete_policy(sent.chat.id, sent.message_id, DeleteCategory::WarnManual)
        .await?;

    Ok(())
}

async fn report_command(data: &Data, message: &Message) -> Result<(), Error> {
    let Some(report_chat) = data.config.chats.report.id() else {
        return Ok(());
    };
    let Some(reporter) = message.from.as_ref() else {
        return Ok(());
    };

    let notice = format!(
        "Report from {} in chat {}.",
        display_name(reporter),
        message.chat.id
    );
    data.api.send_message(report_chat, &notice, None).await?;

    // Forward the offending message when the report was a reply.
    if let Some(target) = message.reply_to_message.as_deref() {
        data.api
            .forward_message(report_chat, message.chat.id, target.message_id)
            .await?;
    }

    Ok(())
}

/// Masters from the config, plus chat creators/administrators. Transport
/// failures during the lookup deny, with a log line.
async fn is_privileged(data: &Data, chat_id: i64, user: &User) -> bool {
    if data.config.master.contains_id(user.id) {
        return true;
    }
    if let Some(username) = &user.username {
        if data.config.master.contains_username(username) {
            return true;
        }
    }

    match data.api.is_chat_admin(chat_id, user.id).await {
        Ok(is_admin) => is_admin,
        Err(err) => {
            tracing::warn!(chat_id, user_id = user.id, "Admin lookup failed: {err}");
            false
        }
    }
}
