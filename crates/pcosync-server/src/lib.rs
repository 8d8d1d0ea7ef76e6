//! HTTP boundary and sync orchestration for pcosync.
//!
//! This crate provides:
//! - the axum router serving `/`, `/health`, `/oauth/start`,
//!   `/oauth/callback` and `/sync`
//! - the sync orchestrator that reads Airtable, then Planning Center
//! - OAuth state tracking and the one-shot token dump gate
//! - graceful shutdown on SIGTERM/SIGINT
//! - the `pcosync` command-line interface
//!
//! # Example
//!
//! ```rust,no_run
//! use pcosync_core::AppConfig;
//! use pcosync_server::{AppState, ServerConfig, Shutdown, serve};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let server_config = ServerConfig::from_port(config.port);
//!     let state = AppState::from_config(config)?;
//!
//!     let shutdown = Shutdown::new();
//!     shutdown.listen_for_signals();
//!     serve(state, server_config, shutdown.signal()).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;

mod config;
mod error;
mod handlers;
mod router;
mod signals;
mod state;
mod sync;

pub use config::ServerConfig;
pub use error::{ApiError, ServerError, ServerResult, SyncError};
pub use handlers::{SYNC_SECRET_HEADER, SyncResponse};
pub use router::{router, serve};
pub use signals::{Shutdown, ShutdownSignal};
pub use state::{
    AppState, MAX_PENDING_STATES, PendingStates, STATE_TTL, StateCheck, TokenDump,
};
pub use sync::{EVENT_PAGE_SIZE, RECORD_PAGE_SIZE, SyncOrchestrator, SyncResult, timestamp_now};
