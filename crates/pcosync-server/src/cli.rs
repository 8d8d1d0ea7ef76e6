//! Command-line interface definition.

use clap::{Parser, Subcommand};
use pcosync_core::TracingOutputFormat;

/// pcosync - Airtable to Planning Center sync server
#[derive(Debug, Parser)]
#[command(name = "pcosync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log output format (pretty, compact, json)
    #[arg(long, env = "LOG_FORMAT", global = true)]
    pub log_format: Option<TracingOutputFormat>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Port to listen on; overrides PORT
        #[arg(long, short)]
        port: Option<u16>,

        /// Refuse to start while any required setting is missing
        #[arg(long)]
        strict: bool,
    },

    /// Planning Center authorization helpers
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

/// Authorization actions.
#[derive(Debug, Subcommand)]
pub enum AuthAction {
    /// Print an authorization URL to open in a browser
    Url,

    /// Exchange an authorization code and print the resulting tokens
    ///
    /// The output is meant to be copied into PCO_ACCESS_TOKEN and
    /// PCO_REFRESH_TOKEN in the deployment configuration.
    Exchange {
        /// Authorization code from the callback URL
        #[arg(long)]
        code: String,
    },
}
