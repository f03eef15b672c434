//! Error types shared by the API clients and the session layer.

use thiserror::Error;

/// Every failure an API call can produce, normalized at the client boundary.
///
/// Callers are expected to turn these into a user-visible notice; nothing
/// here is fatal and nothing is retried.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No bearer token in the token store; the request was never sent.
    #[error("Not logged in")]
    NotAuthenticated,

    /// Question submitted with the "all documents" scope.
    #[error("No document selected")]
    NoDocumentSelected,

    /// Connectivity failure (DNS, refused connection, timeout, ...).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response; `message` is taken from the backend's error body.
    #[error("{message}")]
    Backend { status: u16, message: String },

    /// The body did not match the expected schema.
    #[error("Unexpected response from server: {0}")]
    Decode(String),

    /// Local validation failure or an empty result the caller asked about.
    #[error("{0}")]
    Invalid(String),

    /// The owning view went away before the response arrived.
    #[error("Request cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// HTTP status for backend errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the backend rejected the bearer token (expired or revoked).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
            || matches!(self.status(), Some(401) | Some(422))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_displays_message_only() {
        let err = ApiError::backend(400, "Passwords do not match");
        assert_eq!(err.to_string(), "Passwords do not match");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_unauthorized_detection() {
        assert!(ApiError::NotAuthenticated.is_unauthorized());
        assert!(ApiError::backend(401, "Token has expired").is_unauthorized());
        assert!(ApiError::backend(422, "Signature verification failed").is_unauthorized());
        assert!(!ApiError::backend(500, "boom").is_unauthorized());
    }
}
