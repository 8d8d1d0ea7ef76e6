//! In-memory OAuth token lifecycle.
//!
//! [`TokenManager`] owns the access/refresh pair and decides, on every
//! request for an access token, whether to reuse the cached token, refresh
//! it, or give up:
//!
//! 1. cached token and not yet expired: reuse, no network call
//! 2. refresh token present: refresh-token grant, then reuse
//! 3. cached token without a refresh token: best-effort reuse; an
//!    authorization failure downstream is the caller's to report
//! 4. nothing cached: configuration error
//!
//! State lives for the lifetime of the process and is never persisted.
//! Refreshes are serialized, and callers queued behind an in-flight refresh
//! share its outcome: they reuse the new token on success and get the same
//! error on failure. Only a caller that arrives after a failed attempt has
//! finished makes a new one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{ErrorCategory, ProviderError, ProviderErrorCode, ProviderResult};
use crate::provider::{TokenEndpoint, TokenGrant};

/// Safety margin subtracted from the reported lifetime.
pub const EXPIRY_MARGIN_MS: i64 = 60_000;

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 7200;

/// Cached token material.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TokenState {
    /// Current access token.
    pub access_token: Option<String>,
    /// Current refresh token.
    pub refresh_token: Option<String>,
    /// Expiry as epoch milliseconds; 0 means unknown.
    pub expires_at_ms: i64,
}

impl TokenState {
    /// Creates a state from seeded tokens with unknown expiry.
    pub fn seeded(access_token: Option<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.filter(|t| !t.is_empty()),
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
            expires_at_ms: 0,
        }
    }

    /// Returns true if an access token is cached.
    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    /// Returns true if a refresh token is cached.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Returns true if the cached access token is usable at `now_ms`.
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        self.access_token.is_some() && now_ms < self.expires_at_ms
    }

    fn decide(&self, now_ms: i64) -> TokenDecision {
        match (&self.access_token, &self.refresh_token) {
            (Some(access), _) if now_ms < self.expires_at_ms => TokenDecision::Reuse(access.clone()),
            (_, Some(refresh)) => TokenDecision::Refresh(refresh.clone()),
            (Some(access), None) => TokenDecision::BestEffort(access.clone()),
            (None, None) => TokenDecision::Unavailable,
        }
    }

    fn apply_grant(&mut self, grant: TokenGrant, now_ms: i64) {
        let lifetime_secs = grant.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        self.access_token = Some(grant.access_token);
        self.expires_at_ms = expiry_from(now_ms, lifetime_secs);
        if let Some(refresh) = grant.refresh_token.filter(|t| !t.is_empty()) {
            self.refresh_token = Some(refresh);
        }
    }
}

impl std::fmt::Debug for TokenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenState")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at_ms", &self.expires_at_ms)
            .finish()
    }
}

enum TokenDecision {
    Reuse(String),
    Refresh(String),
    BestEffort(String),
    Unavailable,
}

/// Computes `now + lifetime - margin` in epoch milliseconds, saturating
/// instead of overflowing on absurd `expires_in` values.
pub fn expiry_from(now_ms: i64, lifetime_secs: i64) -> i64 {
    now_ms
        .saturating_add(lifetime_secs.saturating_mul(1000))
        .saturating_sub(EXPIRY_MARGIN_MS)
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Outcome of the last failed refresh, replayed to callers that queued
/// behind it.
struct FailedRefresh {
    attempt: u64,
    code: ProviderErrorCode,
    message: String,
}

impl FailedRefresh {
    fn replay(&self) -> ProviderError {
        ProviderError::new(self.code, self.message.clone()).for_service("pco")
    }
}

/// Owns the OAuth token pair for one Planning Center connection.
pub struct TokenManager {
    endpoint: Arc<dyn TokenEndpoint>,
    state: RwLock<TokenState>,
    refresh_lock: Mutex<Option<FailedRefresh>>,
    /// Number of finished refresh attempts; bumped while holding `refresh_lock`.
    finished_refreshes: AtomicU64,
}

impl TokenManager {
    /// Creates a manager with no token material.
    pub fn new(endpoint: Arc<dyn TokenEndpoint>) -> Self {
        Self::with_state(endpoint, TokenState::default())
    }

    /// Creates a manager with the given state.
    pub fn with_state(endpoint: Arc<dyn TokenEndpoint>, state: TokenState) -> Self {
        Self {
            endpoint,
            state: RwLock::new(state),
            refresh_lock: Mutex::new(None),
            finished_refreshes: AtomicU64::new(0),
        }
    }

    /// Creates a manager seeded from deployment configuration.
    pub fn seeded(
        endpoint: Arc<dyn TokenEndpoint>,
        access_token: Option<String>,
        refresh_token: Option<String>,
    ) -> Self {
        Self::with_state(endpoint, TokenState::seeded(access_token, refresh_token))
    }

    /// Returns the token endpoint this manager refreshes against.
    pub fn endpoint(&self) -> &Arc<dyn TokenEndpoint> {
        &self.endpoint
    }

    /// Returns a copy of the current state.
    pub async fn snapshot(&self) -> TokenState {
        self.state.read().await.clone()
    }

    /// Stores a freshly issued token pair (authorization-code path).
    pub async fn store_grant(&self, grant: TokenGrant) {
        let mut last_failure = self.refresh_lock.lock().await;
        *last_failure = None;
        let mut state = self.state.write().await;
        state.apply_grant(grant, now_ms());
        info!(
            has_refresh_token = state.has_refresh_token(),
            "stored PCO tokens"
        );
    }

    /// Returns an access token, refreshing it first when it has expired.
    ///
    /// # Errors
    ///
    /// - `ConfigurationError` when no token material is cached
    /// - `AuthenticationFailed` when the refresh grant fails
    pub async fn access_token(&self) -> ProviderResult<String> {
        match self.state.read().await.decide(now_ms()) {
            TokenDecision::Reuse(token) => return Ok(token),
            TokenDecision::BestEffort(token) => {
                debug!("using cached PCO access token without a known expiry");
                return Ok(token);
            }
            TokenDecision::Unavailable => return Err(no_credentials()),
            TokenDecision::Refresh(_) => {}
        }

        let seen = self.finished_refreshes.load(Ordering::SeqCst);
        let mut last_failure = self.refresh_lock.lock().await;

        // An attempt that finished while this caller waited decides for it.
        if let Some(failure) = last_failure.as_ref().filter(|f| f.attempt > seen) {
            debug!("reusing outcome of failed in-flight PCO refresh");
            return Err(failure.replay());
        }
        let refresh_token = match self.state.read().await.decide(now_ms()) {
            TokenDecision::Reuse(token) | TokenDecision::BestEffort(token) => return Ok(token),
            TokenDecision::Unavailable => return Err(no_credentials()),
            TokenDecision::Refresh(refresh_token) => refresh_token,
        };

        let outcome = self.endpoint.refresh(&refresh_token).await;
        let attempt = self.finished_refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        let grant = match outcome {
            Ok(grant) => {
                *last_failure = None;
                grant
            }
            Err(err) => {
                let err = refresh_failure(err);
                *last_failure = Some(FailedRefresh {
                    attempt,
                    code: err.code(),
                    message: err.message().to_string(),
                });
                return Err(err);
            }
        };

        let mut state = self.state.write().await;
        state.apply_grant(grant, now_ms());
        info!(
            expires_at_ms = state.expires_at_ms,
            "refreshed PCO access token"
        );

        state.access_token.clone().ok_or_else(|| {
            ProviderError::internal("access token missing after refresh").for_service("pco")
        })
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager").finish_non_exhaustive()
    }
}

fn no_credentials() -> ProviderError {
    ProviderError::configuration(
        "no PCO access or refresh token available; complete /oauth/start or set PCO_ACCESS_TOKEN",
    )
    .for_service("pco")
}

fn refresh_failure(err: ProviderError) -> ProviderError {
    if err.category() == ErrorCategory::Config {
        return err;
    }
    warn!(error = %err, "PCO token refresh failed");
    ProviderError::authentication(format!("token refresh failed: {}", err.message()))
        .for_service("pco")
        .with_source(err)
}
