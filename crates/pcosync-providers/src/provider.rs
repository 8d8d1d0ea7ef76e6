//! Upstream service seams.
//!
//! The sync pipeline only ever sees these traits, so tests substitute
//! in-memory doubles for Airtable and Planning Center.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::ProviderResult;

/// A boxed future for async trait methods.
///
/// Boxed futures keep the traits object-safe so the server can hold
/// `Arc<dyn RecordsSource>` and friends.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A row read from the Records Service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Record identifier.
    pub id: String,
    /// When the record was created, as reported upstream.
    #[serde(default, rename = "createdTime")]
    pub created_time: Option<String>,
    /// Field values keyed by column name.
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    /// Creates a record with no fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_time: None,
            fields: serde_json::Map::new(),
        }
    }

    /// Builder method to add a field.
    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Returns the field names without their values.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }
}

/// An event read from the Events Service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    /// Event identifier.
    pub id: String,
    /// Display name, when the event has one.
    pub name: Option<String>,
}

impl CalendarEvent {
    /// Creates a new event.
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
        }
    }
}

/// Token material returned by an OAuth token endpoint.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    /// The new access token.
    pub access_token: String,
    /// A new refresh token, if the provider rotated it.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenGrant {
    /// Creates a grant.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_in,
        }
    }
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Reads rows from the Records Service.
pub trait RecordsSource: Send + Sync {
    /// Returns the service name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetches up to `max_records` rows from `table`.
    fn list_records<'a>(
        &'a self,
        table: &'a str,
        max_records: usize,
    ) -> BoxFuture<'a, ProviderResult<Vec<Record>>>;
}

/// Reads events from the Events Service.
pub trait EventsSource: Send + Sync {
    /// Returns the service name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetches one page of `per_page` events using `access_token`.
    fn list_events<'a>(
        &'a self,
        access_token: &'a str,
        per_page: usize,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>>;
}

/// An OAuth2 token endpoint.
pub trait TokenEndpoint: Send + Sync {
    /// Exchanges an authorization code for a token pair.
    fn exchange_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, ProviderResult<TokenGrant>>;

    /// Performs a refresh-token grant.
    fn refresh<'a>(&'a self, refresh_token: &'a str)
    -> BoxFuture<'a, ProviderResult<TokenGrant>>;
}
