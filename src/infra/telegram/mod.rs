// Telegram Bot API client and wire types.

pub mod api_client;
pub mod api_types;

pub use api_client::TelegramApiClient;
pub use api_types::{Chat, ChatMember, Message, Update, User};
