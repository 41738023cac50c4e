use crate::domain::{ChatId, TelegramId};

/// Transport-agnostic incoming update.
///
/// Telegram-specific fields stay in the Telegram adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IncomingUpdate {
    Command(Command),
    Text(TextMessage),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    pub chat_id: ChatId,
    pub user_id: Option<TelegramId>,
    pub name: String,
    /// The `@botname` suffix, when the command names a bot.
    pub addressee: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextMessage {
    pub chat_id: ChatId,
    pub user_id: Option<TelegramId>,
    pub text: String,
}

impl IncomingUpdate {
    /// Classify raw message text: a leading `/` makes it a command.
    pub fn from_text(chat_id: ChatId, user_id: Option<TelegramId>, text: &str) -> Self {
        if text.trim_start().starts_with('/') {
            let (name, addressee) = parse_command(text);
            return IncomingUpdate::Command(Command {
                chat_id,
                user_id,
                name,
                addressee,
            });
        }
        IncomingUpdate::Text(TextMessage {
            chat_id,
            user_id,
            text: text.to_string(),
        })
    }

    pub fn chat_id(&self) -> ChatId {
        match self {
            IncomingUpdate::Command(c) => c.chat_id,
            IncomingUpdate::Text(t) => t.chat_id,
        }
    }

    pub fn user_id(&self) -> Option<&TelegramId> {
        match self {
            IncomingUpdate::Command(c) => c.user_id.as_ref(),
            IncomingUpdate::Text(t) => t.user_id.as_ref(),
        }
    }
}

impl Command {
    /// Whether this command is meant for the bot named `bot_username`.
    ///
    /// Bare commands are for every bot in the chat.
    pub fn is_for(&self, bot_username: &str) -> bool {
        self.addressee
            .as_deref()
            .map_or(true, |name| name.eq_ignore_ascii_case(bot_username))
    }
}

/// Split `/cmd@botname args...` into a lower-cased command name and the bot name, if any.
///
/// Arguments are dropped; no command takes any.
pub fn parse_command(text: &str) -> (String, Option<String>) {
    let first = text.split_whitespace().next().unwrap_or("");
    let mut parts = first.trim_start_matches('/').splitn(2, '@');

    let cmd = parts.next().unwrap_or("").to_lowercase();
    let addressee = parts
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    (cmd, addressee)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_splits_bot_name_and_lowercases() {
        assert_eq!(
            parse_command("/List@spend_bot extra args"),
            ("list".to_string(), Some("spend_bot".to_string()))
        );
        assert_eq!(parse_command("/start"), ("start".to_string(), None));
        assert_eq!(parse_command("/help@"), ("help".to_string(), None));
    }

    #[test]
    fn commands_for_other_bots_are_not_ours() {
        let command = |text: &str| match IncomingUpdate::from_text(ChatId(5), None, text) {
            IncomingUpdate::Command(c) => c,
            other => panic!("expected command, got {other:?}"),
        };

        assert!(command("/list").is_for("spend_bot"));
        assert!(command("/list@Spend_Bot").is_for("spend_bot"));
        assert!(!command("/list@some_other_bot").is_for("spend_bot"));
    }

    #[test]
    fn text_starting_with_slash_is_a_command() {
        let update = IncomingUpdate::from_text(ChatId(5), Some(TelegramId::from("9")), "/list");
        match update {
            IncomingUpdate::Command(c) => {
                assert_eq!(c.name, "list");
                assert_eq!(c.chat_id, ChatId(5));
            }
            other => panic!("expected command, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_kept_verbatim() {
        let update = IncomingUpdate::from_text(ChatId(5), None, "25.50 food Lunch");
        assert_eq!(update.user_id(), None);
        assert_eq!(
            update,
            IncomingUpdate::Text(TextMessage {
                chat_id: ChatId(5),
                user_id: None,
                text: "25.50 food Lunch".to_string(),
            })
        );
    }
}
