//! Error types
//!
//! Every library call returns [`SupersetResult`]. The variants split the failure modes
//! callers usually branch on: bad credentials, an unexpected HTTP status, a resource that
//! does not exist (yet), and a response that does not match the expected schema.

use thiserror::Error;

pub type SupersetResult<T> = Result<T, SupersetError>;

#[derive(Debug, Error)]
pub enum SupersetError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("{message} (HTTP {status})")]
    Api {
        status: u16,
        message: String,
        body: String,
    },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SupersetError {
    pub fn api(status: u16, message: impl Into<String>, body: impl Into<String>) -> Self {
        SupersetError::Api {
            status,
            message: message.into(),
            body: body.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        SupersetError::NotFound(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        SupersetError::MalformedResponse(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        SupersetError::Config(message.into())
    }

    /// HTTP status carried by the error, if it came from the API
    pub fn status(&self) -> Option<u16> {
        match self {
            SupersetError::Api { status, .. } => Some(*status),
            SupersetError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SupersetError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_includes_status() {
        let err = SupersetError::api(422, "Dataset creation failed", "{\"message\":\"x\"}");
        assert_eq!(err.to_string(), "Dataset creation failed (HTTP 422)");
        assert_eq!(err.status(), Some(422));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_has_no_status() {
        let err = SupersetError::not_found("user 'ghost'");
        assert!(err.is_not_found());
        assert_eq!(err.status(), None);
    }
}
