//! Airtable client configuration.

use pcosync_core::AppConfig;

/// Connection settings for the Airtable API.
#[derive(Clone)]
pub struct AirtableConfig {
    /// API host, e.g. `https://api.airtable.com`.
    pub api_base: String,
    /// Personal access token.
    pub api_key: Option<String>,
    /// Base identifier.
    pub base_id: Option<String>,
}

impl AirtableConfig {
    /// Creates a configuration against the given API host.
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: None,
            base_id: None,
        }
    }

    /// Builds the configuration from application settings.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            api_base: config.airtable_api_base.clone(),
            api_key: config.airtable_api_key.clone(),
            base_id: config.airtable_base_id.clone(),
        }
    }

    /// Builder: set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Builder: set the base id.
    pub fn with_base_id(mut self, base_id: impl Into<String>) -> Self {
        self.base_id = Some(base_id.into());
        self
    }
}

impl std::fmt::Debug for AirtableConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableConfig")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_id", &self.base_id)
            .finish()
    }
}
