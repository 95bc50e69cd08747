use thiserror::Error;

/// Shown to the user when a failure carries no server-provided message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{}", rejected_text(.message))]
    Rejected {
        status: Option<u16>,
        message: Option<String>,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn rejected_text(message: &Option<String>) -> &str {
    message
        .as_deref()
        .filter(|message| !message.is_empty())
        .unwrap_or(GENERIC_FAILURE_MESSAGE)
}

impl AppError {
    /// The message to surface to the user: the server's own message when it
    /// sent one, otherwise the generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Rejected { message: Some(message), .. } if !message.is_empty() => {
                message.clone()
            }
            AppError::Auth(message) => message.clone(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::Rejected { status, .. } => *status,
            _ => None,
        }
    }
}
