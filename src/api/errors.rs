//! API error types

use thiserror::Error;

use crate::validation::ValidationError;

const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error (status {status_code}): {message}")]
    Application { status_code: u16, message: String },

    #[error("Not authenticated. Run 'ledgerdesk login' first")]
    Unauthorized,

    #[error("Failed to parse API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Text shown to the user for this failure
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Application { message, .. } if !message.trim().is_empty() => message.clone(),
            ApiError::Application { .. } => FALLBACK_MESSAGE.to_string(),
            ApiError::Transport(e) if e.is_timeout() => {
                "The server took too long to respond. Please try again.".to_string()
            }
            ApiError::Transport(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ApiError::Decode(_) => FALLBACK_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_message_passes_through() {
        let err = ApiError::Application {
            status_code: 400,
            message: "Investor not found".to_string(),
        };
        assert_eq!(err.user_message(), "Investor not found");
    }

    #[test]
    fn test_blank_application_message_falls_back() {
        let err = ApiError::Application {
            status_code: 500,
            message: " ".to_string(),
        };
        assert_eq!(err.user_message(), FALLBACK_MESSAGE);
    }

    #[test]
    fn test_validation_message() {
        let err = ApiError::from(ValidationError::MissingField("from".to_string()));
        assert_eq!(err.user_message(), "'from' is required");
    }
}
