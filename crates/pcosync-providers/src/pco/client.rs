//! Planning Center Calendar API client.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult, transport_error};
use crate::provider::{BoxFuture, CalendarEvent, EventsSource};

use super::config::PcoConfig;

const PROVIDER: &str = "pco";

/// Planning Center Calendar API client.
#[derive(Debug)]
pub struct PcoCalendarClient {
    events_url: String,
    http_client: reqwest::Client,
}

impl PcoCalendarClient {
    /// Creates a new calendar client.
    pub fn new(config: &PcoConfig, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            events_url: config.events_endpoint(),
            http_client,
        })
    }

    /// Fetches a single page of calendar events.
    pub async fn fetch_events(
        &self,
        access_token: &str,
        per_page: usize,
    ) -> ProviderResult<Vec<CalendarEvent>> {
        let response = self
            .http_client
            .get(&self.events_url)
            .bearer_auth(access_token)
            .query(&[("per_page", per_page.to_string())])
            .send()
            .await
            .map_err(|e| transport_error("calendar request", e).for_service(PROVIDER))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(
                ProviderError::authentication("access token expired or invalid")
                    .for_service(PROVIDER),
            );
        }

        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e)).for_service(PROVIDER)
        })?;

        if !status.is_success() {
            return Err(
                ProviderError::server(format!("API error ({}): {}", status, body))
                    .for_service(PROVIDER),
            );
        }

        let document: EventListDocument = serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
                .for_service(PROVIDER)
        })?;

        let events: Vec<CalendarEvent> = document
            .data
            .into_iter()
            .map(|resource| {
                let name = resource
                    .attributes
                    .name
                    .filter(|name| !name.trim().is_empty());
                CalendarEvent::new(resource.id, name)
            })
            .collect();

        debug!(count = events.len(), "fetched pco calendar events");
        Ok(events)
    }
}

impl EventsSource for PcoCalendarClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn list_events<'a>(
        &'a self,
        access_token: &'a str,
        per_page: usize,
    ) -> BoxFuture<'a, ProviderResult<Vec<CalendarEvent>>> {
        Box::pin(self.fetch_events(access_token, per_page))
    }
}

/// JSON:API collection document.
#[derive(Debug, Deserialize)]
struct EventListDocument {
    #[serde(default)]
    data: Vec<EventResource>,
}

#[derive(Debug, Deserialize)]
struct EventResource {
    id: String,
    #[serde(default)]
    attributes: EventAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct EventAttributes {
    #[serde(default)]
    name: Option<String>,
}
