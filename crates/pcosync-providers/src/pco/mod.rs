//! Planning Center (Events Service) integration.
//!
//! This module provides:
//! - [`PcoCalendarClient`] - reads Calendar API v2 events
//! - [`PcoOAuthClient`] - authorization-code and refresh-token grants
//! - [`TokenManager`] - in-memory access token lifecycle

mod client;
mod config;
mod oauth;
mod tokens;

pub use client::PcoCalendarClient;
pub use config::PcoConfig;
pub use oauth::{PcoOAuthClient, generate_state};
pub use tokens::{
    DEFAULT_TOKEN_LIFETIME_SECS, EXPIRY_MARGIN_MS, TokenManager, TokenState, expiry_from,
};
