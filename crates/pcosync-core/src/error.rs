//! Configuration error types.

use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating [`crate::AppConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// One or more required settings are absent.
    #[error("missing required configuration: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// A setting is present but unusable.
    #[error("invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    /// Creates an invalid-value error.
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_lists_every_name() {
        let err = ConfigError::MissingFields(vec!["PCO_APP_ID", "SYNC_SECRET"]);
        assert_eq!(
            err.to_string(),
            "missing required configuration: PCO_APP_ID, SYNC_SECRET"
        );
    }

    #[test]
    fn invalid_names_the_field() {
        let err = ConfigError::invalid("PORT", "not a number");
        assert_eq!(err.to_string(), "invalid value for PORT: not a number");
    }
}
