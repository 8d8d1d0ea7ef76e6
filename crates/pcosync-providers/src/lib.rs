//! Upstream clients for the Airtable ↔ Planning Center bridge.
//!
//! - [`RecordsSource`] / [`airtable::AirtableClient`] - reads Airtable rows
//! - [`EventsSource`] / [`pco::PcoCalendarClient`] - reads Planning Center events
//! - [`TokenEndpoint`] / [`pco::PcoOAuthClient`] - OAuth2 grants
//! - [`pco::TokenManager`] - access token reuse and refresh
//! - [`ProviderError`] - error taxonomy shared by all of the above
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────────┐
//! │  Airtable API   │    │  Planning Center API │
//! └────────┬────────┘    └──────┬─────────┬─────┘
//!          │                    │         │
//!          ▼                    ▼         ▼
//! ┌─────────────────┐ ┌──────────────┐ ┌──────────────┐
//! │ AirtableClient  │ │ PcoCalendar  │ │ PcoOAuth     │
//! │ (RecordsSource) │ │ (EventsSrc)  │ │ (TokenEndpt) │
//! └─────────────────┘ └──────────────┘ └──────┬───────┘
//!                                             ▼
//!                                      ┌──────────────┐
//!                                      │ TokenManager │
//!                                      └──────────────┘
//! ```

pub mod airtable;
pub mod error;
pub mod pco;
pub mod provider;

pub use error::{ErrorCategory, ProviderError, ProviderErrorCode, ProviderResult};
pub use provider::{
    BoxFuture, CalendarEvent, EventsSource, Record, RecordsSource, TokenEndpoint, TokenGrant,
};
