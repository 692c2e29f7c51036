use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScreeningError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Transport error: {message}")]
    Transport { message: String, timed_out: bool },

    #[error("Remote service returned {status}: {message}")]
    Remote {
        status: u16,
        message: String,
        endpoint_missing: bool,
    },

    #[error("Unexpected response format: {0}")]
    Format(String),

    #[error("Analysis service unavailable: {0}")]
    Unavailable(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl ScreeningError {
    /// Classify a reqwest failure that happened before a status was received.
    pub fn from_reqwest(err: reqwest::Error, context: &str) -> Self {
        if err.is_timeout() {
            ScreeningError::Transport {
                message: format!("{} timed out: {}", context, err),
                timed_out: true,
            }
        } else if err.is_decode() {
            ScreeningError::Format(format!("{}: {}", context, err))
        } else {
            ScreeningError::Transport {
                message: format!("{} failed: {}", context, err),
                timed_out: false,
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ScreeningError::Transport { timed_out: true, .. })
    }
}

pub type Result<T> = std::result::Result<T, ScreeningError>;
