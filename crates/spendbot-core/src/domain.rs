use std::fmt;

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram user id in its persisted string form.
///
/// Used both as the user lookup key and as the rate limiter's chat key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TelegramId(pub String);

impl TelegramId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for TelegramId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for TelegramId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for TelegramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
