use reqwest::StatusCode;
use thiserror::Error;

/// Why an exchange with the chat endpoint failed.
///
/// The variants only matter for the log; the user sees the same apology
/// for all of them.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat endpoint answered with status {0}")]
    Status(StatusCode),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("stream read error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChatError>;
