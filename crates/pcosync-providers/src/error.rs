//! Error types for upstream service operations.
//!
//! Every failure talking to Airtable or Planning Center is a
//! [`ProviderError`]. The fine-grained [`ProviderErrorCode`] collapses into
//! one of three [`ErrorCategory`] values that decide how the HTTP boundary
//! reports it.

use std::fmt;

use reqwest::StatusCode;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Coarse classification used at the HTTP boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// A required setting is absent. Operator fault.
    Config,
    /// A credential was rejected or an OAuth exchange/refresh failed.
    Auth,
    /// Any other upstream failure.
    Upstream,
}

/// What went wrong, in more detail than [`ErrorCategory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorCode {
    /// Credentials missing upstream, rejected, or expired.
    AuthenticationFailed,
    /// Connect, DNS, TLS or timeout failure.
    NetworkError,
    /// Non-success status not covered by another code.
    ServerError,
    /// Body did not parse.
    InvalidResponse,
    /// 404, typically an unknown base or table.
    NotFound,
    /// A setting this call needs is absent.
    ConfigurationError,
    /// Local failure unrelated to the upstream.
    InternalError,
}

impl ProviderErrorCode {
    /// Returns the boundary category for this code.
    pub fn category(self) -> ErrorCategory {
        match self {
            Self::ConfigurationError => ErrorCategory::Config,
            Self::AuthenticationFailed => ErrorCategory::Auth,
            Self::NetworkError
            | Self::ServerError
            | Self::InvalidResponse
            | Self::NotFound
            | Self::InternalError => ErrorCategory::Upstream,
        }
    }

    /// Stable snake_case name, safe to show to callers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthenticationFailed => "authentication_failed",
            Self::NetworkError => "network_error",
            Self::ServerError => "server_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::ConfigurationError => "configuration_error",
            Self::InternalError => "internal_error",
        }
    }

    /// Code for a non-success HTTP status.
    ///
    /// 401 and 403 stay upstream failures here. The events client checks
    /// for a rejected OAuth token before falling back to this.
    pub fn for_status(status: StatusCode) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::NotFound,
            _ => Self::ServerError,
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed call to Airtable or Planning Center.
///
/// `Display` includes the upstream message, which may quote a response
/// body; it belongs in logs, not in HTTP responses.
#[derive(Debug, Error)]
#[error("{}{code}: {message}", ServicePrefix(*.service))]
pub struct ProviderError {
    code: ProviderErrorCode,
    message: String,
    service: Option<&'static str>,
    status: Option<StatusCode>,
    #[source]
    source: Option<BoxError>,
}

struct ServicePrefix(Option<&'static str>);

impl fmt::Display for ServicePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(service) => write!(f, "[{service}] "),
            None => Ok(()),
        }
    }
}

impl ProviderError {
    /// Creates an error with the given code and message.
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            service: None,
            status: None,
            source: None,
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationFailed, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ServerError, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidResponse, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NotFound, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::ConfigurationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InternalError, message)
    }

    /// Classifies a non-success response, keeping the body for the logs.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let mut err = Self::new(
            ProviderErrorCode::for_status(status),
            format!("HTTP {status}: {}", body.trim()),
        );
        err.status = Some(status);
        err
    }

    /// Tags the error with the service that produced it.
    pub fn for_service(mut self, service: &'static str) -> Self {
        self.service = Some(service);
        self
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ProviderErrorCode {
        self.code
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Service name such as `airtable` or `pco`, if tagged.
    pub fn service(&self) -> Option<&'static str> {
        self.service
    }

    /// Upstream HTTP status, when the error came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }
}

impl From<pcosync_core::ConfigError> for ProviderError {
    fn from(err: pcosync_core::ConfigError) -> Self {
        Self::configuration(err.to_string()).with_source(err)
    }
}

/// Result alias for upstream calls.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Maps a reqwest transport failure onto a network error.
pub(crate) fn transport_error(context: &str, err: reqwest::Error) -> ProviderError {
    let reason = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    ProviderError::network(format!("{context} {reason}: {err}")).with_source(err)
}
