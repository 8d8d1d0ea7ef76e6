//! Planning Center configuration.

use pcosync_core::AppConfig;
use pcosync_core::config::{DEFAULT_PCO_API_BASE, DEFAULT_PCO_SCOPE};

/// OAuth application credentials and API host for Planning Center.
#[derive(Clone)]
pub struct PcoConfig {
    /// API host, e.g. `https://api.planningcenteronline.com`.
    pub api_base: String,
    /// OAuth application id.
    pub client_id: Option<String>,
    /// OAuth application secret.
    pub client_secret: Option<String>,
    /// Registered redirect URI.
    pub redirect_uri: Option<String>,
    /// Requested scope.
    pub scope: String,
}

impl Default for PcoConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PCO_API_BASE)
    }
}

impl PcoConfig {
    /// Creates a configuration against the given API host.
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            scope: DEFAULT_PCO_SCOPE.to_string(),
        }
    }

    /// Builds the configuration from application settings.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            api_base: config.pco_api_base.clone(),
            client_id: config.pco_app_id.clone(),
            client_secret: config.pco_app_secret.clone(),
            redirect_uri: config.pco_redirect_uri.clone(),
            scope: config.pco_scope.clone(),
        }
    }

    /// Builder: set OAuth client credentials.
    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Builder: set the redirect URI.
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Builder: set the scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Authorization endpoint URL.
    pub fn authorize_endpoint(&self) -> String {
        format!("{}/oauth/authorize", self.api_base)
    }

    /// Token endpoint URL.
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth/token", self.api_base)
    }

    /// Calendar events endpoint URL.
    pub fn events_endpoint(&self) -> String {
        format!("{}/calendar/v2/events", self.api_base)
    }
}

impl std::fmt::Debug for PcoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcoConfig")
            .field("api_base", &self.api_base)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .finish()
    }
}
