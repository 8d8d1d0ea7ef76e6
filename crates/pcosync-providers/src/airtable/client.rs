//! Airtable REST API client.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult, transport_error};
use crate::provider::{BoxFuture, Record, RecordsSource};

use super::config::AirtableConfig;

const PROVIDER: &str = "airtable";

/// Airtable API client.
#[derive(Debug)]
pub struct AirtableClient {
    config: AirtableConfig,
    http_client: reqwest::Client,
}

impl AirtableClient {
    /// Creates a new client.
    pub fn new(config: AirtableConfig, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Fetches up to `max_records` rows from a table.
    pub async fn fetch_records(&self, table: &str, max_records: usize) -> ProviderResult<Vec<Record>> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            ProviderError::configuration("AIRTABLE_API_KEY is not set").for_service(PROVIDER)
        })?;
        let base_id = self.config.base_id.as_deref().ok_or_else(|| {
            ProviderError::configuration("AIRTABLE_BASE_ID is not set").for_service(PROVIDER)
        })?;

        let url = format!(
            "{}/v0/{}/{}",
            self.config.api_base,
            urlencoding::encode(base_id),
            urlencoding::encode(table)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(api_key)
            .query(&[("maxRecords", max_records.to_string())])
            .send()
            .await
            .map_err(|e| transport_error("airtable request", e).for_service(PROVIDER))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e)).for_service(PROVIDER)
        })?;

        if !status.is_success() {
            return Err(ProviderError::from_status(status, &body).for_service(PROVIDER));
        }

        let list: RecordListResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
                .for_service(PROVIDER)
        })?;

        debug!(table, count = list.records.len(), "fetched airtable records");
        Ok(list.records)
    }
}

impl RecordsSource for AirtableClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn list_records<'a>(
        &'a self,
        table: &'a str,
        max_records: usize,
    ) -> BoxFuture<'a, ProviderResult<Vec<Record>>> {
        Box::pin(self.fetch_records(table, max_records))
    }
}

/// Response from the list-records endpoint.
#[derive(Debug, Deserialize)]
struct RecordListResponse {
    #[serde(default)]
    records: Vec<Record>,
}
