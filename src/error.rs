use crate::crypto::CryptoError;
use crate::vault::VaultError;
use thiserror::Error;

/// Message returned for every missing, expired, consumed or deleted secret.
pub const NOT_FOUND_MESSAGE: &str = "Secret not found or already retrieved/deleted";

/// Application-wide error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("Encryption key not configured")]
    MissingKey,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convert AppError to HTTP status codes for web responses
impl AppError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::Vault(VaultError::NotFound) => StatusCode::NOT_FOUND,
            Self::Vault(VaultError::InvalidTtl(_)) => StatusCode::BAD_REQUEST,
            Self::Config(_)
            | Self::Database(_)
            | Self::Crypto(_)
            | Self::MissingKey
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text safe to hand back to a caller. Internal causes stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            Self::Vault(VaultError::NotFound) => NOT_FOUND_MESSAGE.to_string(),
            Self::Vault(err @ VaultError::InvalidTtl(_)) => err.to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = serde_json::json!({
            "error": self.public_message(),
            "code": status.as_u16()
        });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_not_found_hides_cause() {
        let err = AppError::from(VaultError::NotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), NOT_FOUND_MESSAGE);
    }

    #[test]
    fn test_decryption_failure_is_internal() {
        let err = AppError::from(CryptoError::DecryptionFailed);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_invalid_ttl_is_bad_request() {
        let err = AppError::from(VaultError::InvalidTtl(-5));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.public_message().contains("-5"));
    }
}
