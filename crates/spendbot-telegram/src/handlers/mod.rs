//! Telegram update handlers.
//!
//! Handlers only translate teloxide types into `spendbot-core` updates; rate limiting,
//! command dispatch and persistence happen in [`spendbot_core::bot::ExpenseBot`].

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use spendbot_core::{
    domain::{ChatId, TelegramId},
    messaging::types::IncomingUpdate,
};

use crate::router::AppState;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(update) = to_update(&msg) else {
        tracing::debug!(chat_id = msg.chat.id.0, "ignoring non-text message");
        return Ok(());
    };
    if let (IncomingUpdate::Command(cmd), Some(me)) = (&update, &state.bot_username) {
        if !cmd.is_for(me) {
            tracing::debug!(chat_id = msg.chat.id.0, "command addressed to another bot");
            return Ok(());
        }
    }

    state.expense_bot.handle(update).await;
    Ok(())
}

fn to_update(msg: &Message) -> Option<IncomingUpdate> {
    let text = msg.text()?;
    let user_id = msg.from().map(|u| TelegramId::from(u.id.0));
    Some(IncomingUpdate::from_text(ChatId(msg.chat.id.0), user_id, text))
}
