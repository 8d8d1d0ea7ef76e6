//! Core types: configuration, errors, tracing

pub mod config;
pub mod error;
pub mod tracing;

pub use config::{AppConfig, strip_wrapping_quotes};
pub use error::{ConfigError, ConfigResult};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
