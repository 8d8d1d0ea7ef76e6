//! Shared application state for the HTTP handlers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use pcosync_core::AppConfig;
use pcosync_providers::airtable::{AirtableClient, AirtableConfig};
use pcosync_providers::pco::{PcoCalendarClient, PcoConfig, PcoOAuthClient, TokenManager};
use pcosync_providers::{EventsSource, RecordsSource, TokenEndpoint};
use tracing::{debug, warn};

use crate::error::ServerResult;
use crate::sync::SyncOrchestrator;

/// How long an issued OAuth state stays valid.
pub const STATE_TTL: Duration = Duration::from_secs(600);

/// Maximum number of OAuth states remembered at once.
pub const MAX_PENDING_STATES: usize = 64;

/// Everything a request handler needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub oauth: Arc<PcoOAuthClient>,
    pub tokens: Arc<TokenManager>,
    pub orchestrator: Arc<SyncOrchestrator>,
    pub pending_states: Arc<PendingStates>,
    pub token_dump: Arc<TokenDump>,
}

impl AppState {
    /// Builds the production state: real Airtable and Planning Center clients.
    pub fn from_config(config: AppConfig) -> ServerResult<Self> {
        let pco_config = PcoConfig::from_app_config(&config);
        let oauth = Arc::new(PcoOAuthClient::new(pco_config.clone(), config.http_timeout)?);
        let records = Arc::new(AirtableClient::new(
            AirtableConfig::from_app_config(&config),
            config.http_timeout,
        )?);
        let events = Arc::new(PcoCalendarClient::new(&pco_config, config.http_timeout)?);

        Ok(Self::assemble(config, oauth.clone(), records, events, oauth))
    }

    /// Builds a state around substitute upstream clients.
    ///
    /// The OAuth client is still built from `config`; it is only used to
    /// render authorization URLs.
    pub fn with_sources(
        config: AppConfig,
        records: Arc<dyn RecordsSource>,
        events: Arc<dyn EventsSource>,
        endpoint: Arc<dyn TokenEndpoint>,
    ) -> ServerResult<Self> {
        let oauth = Arc::new(PcoOAuthClient::new(
            PcoConfig::from_app_config(&config),
            config.http_timeout,
        )?);
        Ok(Self::assemble(config, oauth, records, events, endpoint))
    }

    fn assemble(
        config: AppConfig,
        oauth: Arc<PcoOAuthClient>,
        records: Arc<dyn RecordsSource>,
        events: Arc<dyn EventsSource>,
        endpoint: Arc<dyn TokenEndpoint>,
    ) -> Self {
        let tokens = Arc::new(TokenManager::seeded(
            endpoint,
            config.pco_access_token.clone(),
            config.pco_refresh_token.clone(),
        ));
        let orchestrator = Arc::new(SyncOrchestrator::new(
            records,
            events,
            tokens.clone(),
            config.airtable_table_name.clone(),
        ));
        let token_dump = Arc::new(TokenDump::new(config.show_tokens_once));

        Self {
            config: Arc::new(config),
            oauth,
            tokens,
            orchestrator,
            pending_states: Arc::new(PendingStates::default()),
            token_dump,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

/// OAuth `state` values issued by `/oauth/start` and not yet redeemed.
#[derive(Debug, Default)]
pub struct PendingStates {
    entries: Mutex<VecDeque<(String, Instant)>>,
}

/// Outcome of checking a callback's `state` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateCheck {
    /// The state was issued here and is still valid; it is now consumed.
    Valid,
    /// The state was never issued, has expired, or was already used.
    Unknown,
}

impl PendingStates {
    /// Remembers a newly issued state.
    pub fn issue(&self, state: impl Into<String>) {
        self.issue_at(state.into(), Instant::now());
    }

    /// Checks and consumes a state presented by a callback.
    pub fn consume(&self, state: &str) -> StateCheck {
        self.consume_at(state, Instant::now())
    }

    /// Number of states currently remembered.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no state is remembered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn issue_at(&self, state: String, now: Instant) {
        let mut entries = self.lock();
        prune(&mut entries, now);
        if entries.len() >= MAX_PENDING_STATES {
            debug!("evicting oldest pending oauth state");
            entries.pop_front();
        }
        entries.push_back((state, now));
    }

    fn consume_at(&self, state: &str, now: Instant) -> StateCheck {
        let mut entries = self.lock();
        prune(&mut entries, now);
        match entries.iter().position(|(issued, _)| issued == state) {
            Some(index) => {
                entries.remove(index);
                StateCheck::Valid
            }
            None => StateCheck::Unknown,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<(String, Instant)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn prune(entries: &mut VecDeque<(String, Instant)>, now: Instant) {
    // Entries are in issue order, so expired ones sit at the front.
    while let Some((_, issued_at)) = entries.front() {
        if now.saturating_duration_since(*issued_at) < STATE_TTL {
            break;
        }
        entries.pop_front();
    }
}

/// One-shot gate for rendering fresh tokens on the callback page.
#[derive(Debug)]
pub struct TokenDump {
    armed: AtomicBool,
}

impl TokenDump {
    /// Creates the gate. It can only be armed in builds with `token-dump`.
    pub fn new(requested: bool) -> Self {
        if requested && !cfg!(feature = "token-dump") {
            warn!("SHOW_TOKENS_ONCE is set but this build lacks the token-dump feature; ignoring");
        }
        Self {
            armed: AtomicBool::new(requested && cfg!(feature = "token-dump")),
        }
    }

    /// Returns true exactly once if the gate was armed.
    pub fn take(&self) -> bool {
        self.armed.swap(false, Ordering::SeqCst)
    }

    /// Returns true if the next callback would render tokens.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }
}
