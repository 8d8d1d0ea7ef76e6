//! Server error types.

use std::io;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pcosync_core::{ConfigError, TracingError};
use pcosync_providers::{ErrorCategory, ProviderError, ProviderErrorCode};
use serde::Serialize;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that stop the server or a CLI command.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (bind, accept, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Tracing could not be initialized.
    #[error("Tracing error: {0}")]
    Tracing(#[from] TracingError),

    /// Upstream client error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Why a sync run failed.
///
/// The `Display` text is safe to return to callers; the wrapped
/// [`ProviderError`] carries upstream payloads and is for server logs only.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A required setting is absent.
    #[error("{message}")]
    Config {
        message: String,
        #[source]
        source: Option<ProviderError>,
    },

    /// An OAuth credential was rejected or could not be refreshed.
    #[error("{service} authentication failed")]
    Auth {
        service: String,
        #[source]
        source: ProviderError,
    },

    /// Any other upstream failure.
    #[error("{service} request failed ({code})")]
    Upstream {
        service: String,
        code: ProviderErrorCode,
        #[source]
        source: ProviderError,
    },
}

impl SyncError {
    /// Creates a configuration error without an upstream cause.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Returns the boundary category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config { .. } => ErrorCategory::Config,
            Self::Auth { .. } => ErrorCategory::Auth,
            Self::Upstream { .. } => ErrorCategory::Upstream,
        }
    }

    /// Full detail for server-side logging.
    pub fn detail(&self) -> String {
        match self {
            Self::Config {
                source: Some(source),
                ..
            }
            | Self::Auth { source, .. }
            | Self::Upstream { source, .. } => source.to_string(),
            Self::Config { message, .. } => message.clone(),
        }
    }
}

impl From<ProviderError> for SyncError {
    fn from(err: ProviderError) -> Self {
        let service = err.service().unwrap_or("upstream").to_string();
        match err.category() {
            ErrorCategory::Config => Self::Config {
                message: err.message().to_string(),
                source: Some(err),
            },
            ErrorCategory::Auth => Self::Auth {
                service,
                source: err,
            },
            ErrorCategory::Upstream => Self::Upstream {
                service,
                code: err.code(),
                source: err,
            },
        }
    }
}

/// Failures of the JSON endpoints, rendered as `{ok: false, error}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server is missing a setting the endpoint depends on.
    #[error("{0}")]
    Misconfigured(String),

    /// The caller did not present the expected shared secret.
    #[error("Unauthorized")]
    Unauthorized,

    /// The sync run failed.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Misconfigured(_) | ApiError::Sync(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            ok: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_map_by_category() {
        let err: SyncError = ProviderError::configuration("AIRTABLE_API_KEY is not set")
            .for_service("airtable")
            .into();
        assert_eq!(err.category(), ErrorCategory::Config);
        assert_eq!(err.to_string(), "AIRTABLE_API_KEY is not set");

        let err: SyncError = ProviderError::authentication("refresh failed: invalid_grant")
            .for_service("pco")
            .into();
        assert_eq!(err.category(), ErrorCategory::Auth);
        assert_eq!(err.to_string(), "pco authentication failed");

        let err: SyncError = ProviderError::server("API error (500): {\"secret\":1}")
            .for_service("airtable")
            .into();
        assert_eq!(err.category(), ErrorCategory::Upstream);
        assert_eq!(err.to_string(), "airtable request failed (server_error)");
    }

    #[test]
    fn detail_keeps_upstream_payload_for_logs() {
        let err: SyncError = ProviderError::server("API error (502): bad gateway")
            .for_service("pco")
            .into();
        assert!(err.detail().contains("bad gateway"));
        assert!(!err.to_string().contains("bad gateway"));
    }

    #[test]
    fn plain_config_error() {
        let err = SyncError::config("AIRTABLE_TABLE_NAME is not set");
        assert_eq!(err.detail(), "AIRTABLE_TABLE_NAME is not set");
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[test]
    fn api_error_status_codes() {
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Misconfigured("SYNC_SECRET is not set".into())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(SyncError::config("x")).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
