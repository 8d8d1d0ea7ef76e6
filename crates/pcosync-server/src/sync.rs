//! Sync orchestration: one Airtable read, one Planning Center read.
//!
//! A run is all-or-nothing. Both reads are side-effect free, so a failure
//! needs no compensation; it simply aborts the run.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use pcosync_providers::pco::TokenManager;
use pcosync_providers::{EventsSource, RecordsSource};
use tracing::{debug, info, instrument};

use crate::error::SyncError;

/// Maximum number of Airtable records read per run.
pub const RECORD_PAGE_SIZE: usize = 5;

/// Number of Planning Center events sampled per run.
pub const EVENT_PAGE_SIZE: usize = 1;

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    /// Number of records read from Airtable.
    pub record_count: usize,
    /// Name of the first Planning Center event, if any.
    pub sample_event_name: Option<String>,
    /// When the run completed, RFC 3339 UTC.
    pub timestamp: String,
}

/// Sequences the Airtable and Planning Center reads.
pub struct SyncOrchestrator {
    records: Arc<dyn RecordsSource>,
    events: Arc<dyn EventsSource>,
    tokens: Arc<TokenManager>,
    table_name: Option<String>,
}

impl SyncOrchestrator {
    /// Creates an orchestrator.
    pub fn new(
        records: Arc<dyn RecordsSource>,
        events: Arc<dyn EventsSource>,
        tokens: Arc<TokenManager>,
        table_name: Option<String>,
    ) -> Self {
        Self {
            records,
            events,
            tokens,
            table_name,
        }
    }

    /// Runs one sync.
    #[instrument(skip(self), name = "sync")]
    pub async fn run(&self) -> Result<SyncResult, SyncError> {
        let table = self
            .table_name
            .as_deref()
            .ok_or_else(|| SyncError::config("AIRTABLE_TABLE_NAME is not set"))?;

        let records = self.records.list_records(table, RECORD_PAGE_SIZE).await?;
        for record in &records {
            // Field values may hold personal data; only names are logged.
            debug!(record_id = %record.id, fields = ?record.field_names(), "record");
        }
        info!(
            source = self.records.name(),
            table,
            count = records.len(),
            "read records"
        );

        let access_token = self.tokens.access_token().await?;
        let events = self
            .events
            .list_events(&access_token, EVENT_PAGE_SIZE)
            .await?;
        let sample_event_name = events.into_iter().next().and_then(|event| event.name);
        info!(
            source = self.events.name(),
            first_event = sample_event_name.as_deref().unwrap_or("<none>"),
            "read events"
        );

        Ok(SyncResult {
            record_count: records.len(),
            sample_event_name,
            timestamp: timestamp_now(),
        })
    }
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("records", &self.records.name())
            .field("events", &self.events.name())
            .field("table_name", &self.table_name)
            .finish()
    }
}

/// Current time as RFC 3339 UTC with millisecond precision.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
