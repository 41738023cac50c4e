/// Core error type for the expense tracker.
///
/// Adapter crates (Postgres, Telegram, remote analysis) map their specific errors into
/// this type so the bot and the HTTP API can decide between a user-facing message,
/// a 4xx response, or a logged internal failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
