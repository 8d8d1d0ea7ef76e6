//! Tracing setup for pcosync.
//!
//! The server logs JSON with span events so a hosted log collector can index
//! request spans; the `auth` commands log only warnings in a readable format
//! because their stdout is meant for copy and paste. Either way `RUST_LOG`
//! wins over the built-in directive.
//!
//! ```ignore
//! use pcosync_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::for_command(true, false, None))?;
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// A global subscriber is already installed
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// The filter directive does not parse
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line, human oriented
    #[default]
    Pretty,
    /// One line per event
    Compact,
    /// Newline-delimited JSON
    Json,
}

impl FromStr for TracingOutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (expected pretty, compact or json)")),
        }
    }
}

impl fmt::Display for TracingOutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        })
    }
}

/// How the global subscriber is built
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for pcosync crates when `RUST_LOG` is unset
    pub default_level: Level,
    /// Output format
    pub output_format: TracingOutputFormat,
    /// Emit source file and line
    pub include_location: bool,
    /// Emit span open/close events
    pub include_span_events: bool,
    /// Explicit filter directive; takes precedence over `RUST_LOG`
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Pretty,
            include_location: false,
            include_span_events: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Long-running HTTP server: JSON, locations and request spans
    #[must_use]
    pub fn server() -> Self {
        Self {
            output_format: TracingOutputFormat::Json,
            include_location: true,
            include_span_events: true,
            ..Self::default()
        }
    }

    /// One-shot CLI command: quiet unless something goes wrong
    #[must_use]
    pub fn command() -> Self {
        Self {
            default_level: Level::WARN,
            output_format: TracingOutputFormat::Compact,
            ..Self::default()
        }
    }

    /// Picks the preset for a command line, then applies `-v` and
    /// `--log-format`.
    #[must_use]
    pub fn for_command(serving: bool, debug: bool, format: Option<TracingOutputFormat>) -> Self {
        let mut config = if serving {
            Self::server()
        } else {
            Self::command()
        };
        if debug {
            config = config.with_level(Level::DEBUG);
        }
        if let Some(format) = format {
            config = config.with_format(format);
        }
        config
    }

    /// Set the default log level
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Set the output format
    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set an explicit filter directive
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn default_directive(&self) -> String {
        format!("pcosync={}", self.default_level)
    }

    fn filter(&self) -> Result<EnvFilter, TracingError> {
        match &self.env_filter {
            Some(directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_directive()))),
        }
    }

    fn fmt_layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let span_events = if self.include_span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_span_events(span_events);

        match self.output_format {
            TracingOutputFormat::Pretty => layer.pretty().boxed(),
            TracingOutputFormat::Compact => layer.compact().without_time().boxed(),
            TracingOutputFormat::Json => layer.json().boxed(),
        }
    }
}

/// Installs the global subscriber. Call once, before anything logs.
///
/// Logs go to stderr; stdout is reserved for command output.
///
/// # Errors
///
/// Fails if a global subscriber is already set or the filter directive is
/// invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let subscriber = Registry::default()
        .with(config.fmt_layer())
        .with(config.filter()?);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
