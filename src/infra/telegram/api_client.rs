// Minimal Telegram Bot API client. It deliberately exposes only the calls
// the moderation engine and the update router need.
//
// Implements the ModerationGateway port; Telegram's error descriptions are
// mapped onto the gateway taxonomy so the engine can tell expected races
// (message already gone) from real failures.

use super::api_types::{ChatMember, Message, Update, User};
use crate::core::moderation::{GatewayError, MessageRef, ModerationGateway};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

pub struct TelegramApiClient {
    client: Client,
    base_url: String,
    warn_keyboard: Option<serde_json::Value>,
}

impl TelegramApiClient {
    pub fn new(
        token: &str,
        warn_keyboard: Option<serde_json::Value>,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .user_agent("GroupGuardBot/1.0")
            .build()
            .map_err(|e| GatewayError::Transport {
                message: e.to_string(),
                transient: false,
            })?;

        Ok(Self {
            client,
            base_url: format!("https://api.telegram.org/bot{token}"),
            warn_keyboard,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: serde_json::Value,
        timeout: Duration,
    ) -> Result<T, GatewayError> {
        let url = format!("{}/{}", self.base_url, method);
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GatewayError::Transport {
                message: format!("{method}: {e}"),
                transient: true,
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(GatewayError::Transport {
                message: format!("{method} returned {status}"),
                transient: true,
            });
        }

        let body: ApiResponse<T> = response.json().await.map_err(|e| GatewayError::Transport {
            message: format!("{method}: {e}"),
            transient: false,
        })?;

        if body.ok {
            body.result.ok_or_else(|| GatewayError::Transport {
                message: format!("{method} returned ok without a result"),
                transient: false,
            })
        } else {
            Err(map_api_error(
                method,
                status,
                body.description.unwrap_or_default(),
            ))
        }
    }

    pub async fn get_me(&self) -> Result<User, GatewayError> {
        self.call("getMe", json!({}), Duration::from_secs(10)).await
    }

    /// Long-poll for updates. Blocks up to `poll_secs` on the Telegram side.
    pub async fn get_updates(
        &self,
        offset: i64,
        poll_secs: u64,
    ) -> Result<Vec<Update>, GatewayError> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": poll_secs,
                "allowed_updates": ["message"],
            }),
            // Leave headroom over the long-poll window.
            Duration::from_secs(poll_secs + 10),
        )
        .await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&serde_json::Value>,
    ) -> Result<Message, GatewayError> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "Markdown",
        });
        if let Some(markup) = reply_markup {
            payload["reply_markup"] = markup.clone();
        }
        self.call("sendMessage", payload, Duration::from_secs(10)).await
    }

    pub async fn forward_message(
        &self,
        to_chat_id: i64,
        from_chat_id: i64,
        message_id: i64,
    ) -> Result<Message, GatewayError> {
        self.call(
            "forwardMessage",
            json!({
                "chat_id": to_chat_id,
                "from_chat_id": from_chat_id,
                "message_id": message_id,
            }),
            Duration::from_secs(10),
        )
        .await
    }

    pub async fn is_chat_admin(&self, chat_id: i64, user_id: i64) -> Result<bool, GatewayError> {
        let member: ChatMember = self
            .call(
                "getChatMember",
                json!({ "chat_id": chat_id, "user_id": user_id }),
                Duration::from_secs(10),
            )
            .await?;
        Ok(matches!(member.status.as_str(), "administrator" | "creator"))
    }
}

#[async_trait]
impl ModerationGateway for TelegramApiClient {
    async fn send_warning(
        &self,
        chat_id: i64,
        user_id: i64,
        count: u32,
        threshold: u32,
    ) -> Result<MessageRef, GatewayError> {
        let text = format!(
            "[You](tg://user?id={user_id}) have been warned ({count}/{threshold}). \
             Reaching {threshold} warnings means a ban."
        );
        let message = self
            .send_message(chat_id, &text, self.warn_keyboard.as_ref())
            .await?;
        Ok(MessageRef {
            chat_id: message.chat.id,
            message_id: message.message_id,
        })
    }

    async fn send_ban_notice(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<MessageRef, GatewayError> {
        let text = format!("[User](tg://user?id={user_id}) was banned for repeated violations.");
        let message = self.send_message(chat_id, &text, None).await?;
        Ok(MessageRef {
            chat_id: message.chat.id,
            message_id: message.message_id,
        })
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), GatewayError> {
        let _: bool = self
            .call(
                "deleteMessage",
                json!({ "chat_id": chat_id, "message_id": message_id }),
                Duration::from_secs(10),
            )
            .await?;
        Ok(())
    }

    async fn ban_user(&self, chat_id: i64, user_id: i64) -> Result<(), GatewayError> {
        let _: bool = self
            .call(
                "banChatMember",
                json!({ "chat_id": chat_id, "user_id": user_id }),
                Duration::from_secs(10),
            )
            .await?;
        Ok(())
    }
}

/// Map a Telegram API error onto the gateway taxonomy. Telegram reports
/// most of these only through the human-readable description.
fn map_api_error(method: &str, status: StatusCode, description: String) -> GatewayError {
    let lower = description.to_lowercase();

    if lower.contains("message to delete not found")
        || lower.contains("message_id_invalid")
        || lower.contains("message identifier is not specified")
    {
        return GatewayError::AlreadyDeleted;
    }
    if lower.contains("user_already_participant") || lower.contains("user_banned_in_channel") {
        return GatewayError::AlreadyBanned;
    }
    if status == StatusCode::FORBIDDEN
        || lower.contains("not enough rights")
        || lower.contains("can't be deleted")
        || lower.contains("user is an administrator")
    {
        return GatewayError::Forbidden(description);
    }
    if lower.contains("retry after") || lower.contains("too many requests") {
        return GatewayError::Transport {
            message: format!("{method}: {description}"),
            transient: true,
        };
    }

    GatewayError::Transport {
        message: format!("{method}: {description}"),
        transient: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_message_race_maps_to_already_deleted() {
        let err = map_api_error(
            "deleteMessage",
            StatusCode::BAD_REQUEST,
            "Bad Request: message to delete not found".to_string(),
        );
        assert!(matches!(err, GatewayError::AlreadyDeleted));
    }

    #[test]
    fn rights_problems_map_to_forbidden() {
        let err = map_api_error(
            "banChatMember",
            StatusCode::BAD_REQUEST,
            "Bad Request: user is an administrator of the chat".to_string(),
        );
        assert!(matches!(err, GatewayError::Forbidden(_)));

        let err = map_api_error(
            "sendMessage",
            StatusCode::FORBIDDEN,
            "Forbidden: bot was kicked from the group chat".to_string(),
        );
        assert!(matches!(err, GatewayError::Forbidden(_)));
    }

    #[test]
    fn rate_limits_are_transient() {
        let err = map_api_error(
            "sendMessage",
            StatusCode::BAD_REQUEST,
            "Too Many Requests: retry after 14".to_string(),
        );
        assert!(err.is_transient());
    }

    #[test]
    fn unknown_errors_are_permanent_transport_failures() {
        let err = map_api_error(
            "sendMessage",
            StatusCode::BAD_REQUEST,
            "Bad Request: chat not found".to_string(),
        );
        assert!(matches!(err, GatewayError::Transport { .. }));
        assert!(!err.is_transient());
    }
}
