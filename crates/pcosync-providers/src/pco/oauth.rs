//! OAuth 2.0 authorization-code flow for Planning Center.
//!
//! # Flow Overview
//!
//! 1. `/oauth/start` builds the authorize URL with a random `state`
//! 2. The operator grants access; Planning Center redirects to the
//!    configured redirect URI with a `code`
//! 3. `/oauth/callback` exchanges the code for an access/refresh pair
//! 4. The token manager refreshes the access token as it nears expiry
//!
//! The redirect URI sent on exchange must be byte-identical to the one sent
//! on authorize, so both come from the same [`PcoConfig`].

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use tracing::info;

use crate::error::{ProviderError, ProviderResult, transport_error};
use crate::provider::{BoxFuture, TokenEndpoint, TokenGrant};

use super::config::PcoConfig;

const PROVIDER: &str = "pco";

/// Length of the anti-replay state value, in bytes before encoding.
const STATE_LENGTH: usize = 16;

/// OAuth client for Planning Center.
#[derive(Debug)]
pub struct PcoOAuthClient {
    config: PcoConfig,
    http_client: reqwest::Client,
}

impl PcoOAuthClient {
    /// Creates a new OAuth client.
    pub fn new(config: PcoConfig, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &PcoConfig {
        &self.config
    }

    /// Builds the authorization URL for the given state.
    ///
    /// Fails rather than producing a URL with missing parameters.
    pub fn authorize_url(&self, state: &str) -> ProviderResult<String> {
        let client_id = self.require_client_id()?;
        let redirect_uri = self.require_redirect_uri()?;

        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.config.authorize_endpoint(),
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&self.config.scope),
            urlencoding::encode(state),
        ))
    }

    /// Exchanges an authorization code for tokens.
    pub async fn exchange_authorization_code(&self, code: &str) -> ProviderResult<TokenGrant> {
        let client_id = self.require_client_id()?;
        let client_secret = self.require_client_secret()?;
        let redirect_uri = self.require_redirect_uri()?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", redirect_uri),
        ];

        let grant = self.post_token_request(&params, "token exchange").await?;
        info!("obtained PCO tokens from authorization code");
        Ok(grant)
    }

    /// Performs a refresh-token grant.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> ProviderResult<TokenGrant> {
        let client_id = self.require_client_id()?;
        let client_secret = self.require_client_secret()?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ];

        self.post_token_request(&params, "token refresh").await
    }

    async fn post_token_request(
        &self,
        params: &[(&str, &str)],
        operation: &str,
    ) -> ProviderResult<TokenGrant> {
        let response = self
            .http_client
            .post(self.config.token_endpoint())
            .form(params)
            .send()
            .await
            .map_err(|e| transport_error(operation, e).for_service(PROVIDER))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read response: {}", e)).for_service(PROVIDER)
        })?;

        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "{} failed ({}): {}",
                operation, status, body
            ))
            .for_service(PROVIDER));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {}", e))
                .for_service(PROVIDER)
        })
    }

    fn require_client_id(&self) -> ProviderResult<&str> {
        self.config.client_id.as_deref().ok_or_else(|| {
            ProviderError::configuration("PCO_APP_ID is not set").for_service(PROVIDER)
        })
    }

    fn require_client_secret(&self) -> ProviderResult<&str> {
        self.config.client_secret.as_deref().ok_or_else(|| {
            ProviderError::configuration("PCO_APP_SECRET is not set").for_service(PROVIDER)
        })
    }

    fn require_redirect_uri(&self) -> ProviderResult<&str> {
        self.config.redirect_uri.as_deref().ok_or_else(|| {
            ProviderError::configuration("PCO_REDIRECT_URI is not set").for_service(PROVIDER)
        })
    }
}

impl TokenEndpoint for PcoOAuthClient {
    fn exchange_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, ProviderResult<TokenGrant>> {
        Box::pin(self.exchange_authorization_code(code))
    }

    fn refresh<'a>(
        &'a self,
        refresh_token: &'a str,
    ) -> BoxFuture<'a, ProviderResult<TokenGrant>> {
        Box::pin(self.refresh_access_token(refresh_token))
    }
}

/// Generates a random anti-replay state value.
pub fn generate_state() -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..STATE_LENGTH).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(&bytes)
}
