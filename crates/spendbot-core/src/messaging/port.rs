use async_trait::async_trait;

use crate::{domain::ChatId, Result};

/// Outbound chat port.
///
/// Telegram implements it in `spendbot-telegram`; tests use a recording fake.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Send a plain-text message.
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()>;
}
