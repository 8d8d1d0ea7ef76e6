//! HTTP request handlers.
//!
//! JSON endpoints answer with `{ok, ...}` bodies; the OAuth callback answers
//! in plain text because a human reads it in a browser.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use pcosync_providers::pco::generate_state;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::error::ApiError;
use crate::state::{AppState, StateCheck};
use crate::sync::{SyncResult, timestamp_now};

/// Header carrying the shared sync secret.
pub const SYNC_SECRET_HEADER: &str = "x-sync-secret";

const GREETING: &str = "pcosync is running. POST /sync to run a sync, GET /oauth/start to connect Planning Center.";
const CALLBACK_SUCCESS: &str = "Planning Center connected. You can close this window.";
const CALLBACK_FAILURE: &str = "Token exchange failed. Check the server logs for details.";

/// `GET /`
pub async fn root() -> &'static str {
    GREETING
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    pub timestamp: String,
}

/// `GET /health`
pub async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        timestamp: timestamp_now(),
    })
}

#[derive(Debug, Deserialize)]
pub struct StartQuery {
    #[serde(default)]
    pub debug: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthUrlBody {
    auth_url: String,
}

#[derive(Debug, Serialize)]
struct StartConfigError {
    ok: bool,
    error: String,
    #[serde(rename = "hasPCO_APP_ID")]
    has_pco_app_id: bool,
    #[serde(rename = "hasPCO_REDIRECT_URI")]
    has_pco_redirect_uri: bool,
}

/// `GET /oauth/start`
///
/// Redirects to the Planning Center consent page, or returns the URL as JSON
/// when `debug=1`.
#[instrument(skip_all, name = "oauth_start")]
pub async fn oauth_start(State(state): State<AppState>, Query(query): Query<StartQuery>) -> Response {
    let oauth_state = generate_state();
    let auth_url = match state.oauth.authorize_url(&oauth_state) {
        Ok(url) => url,
        Err(err) => {
            error!(error = %err, "cannot build authorization URL");
            let body = StartConfigError {
                ok: false,
                error: err.message().to_string(),
                has_pco_app_id: state.config.pco_app_id.is_some(),
                has_pco_redirect_uri: state.config.pco_redirect_uri.is_some(),
            };
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
        }
    };
    state.pending_states.issue(oauth_state);

    if query.debug.as_deref() == Some("1") {
        info!("returning authorization URL (debug)");
        return Json(AuthUrlBody { auth_url }).into_response();
    }

    info!("redirecting to Planning Center authorization");
    (StatusCode::FOUND, [(header::LOCATION, auth_url)]).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /oauth/callback`
#[instrument(skip_all, name = "oauth_callback")]
pub async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    if let Some(reason) = query.error.as_deref() {
        warn!(reason, "authorization was declined");
        return (StatusCode::BAD_REQUEST, "Authorization was not granted.").into_response();
    }

    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        warn!("callback without authorization code");
        return (StatusCode::BAD_REQUEST, "Missing authorization code.").into_response();
    };

    match query.state.as_deref() {
        Some(presented) => {
            if state.pending_states.consume(presented) == StateCheck::Unknown {
                warn!("callback with unknown or expired state");
                return (StatusCode::BAD_REQUEST, "Invalid or expired OAuth state.").into_response();
            }
        }
        None => warn!("callback without state; accepting"),
    }

    let grant = match state.tokens.endpoint().exchange_code(code).await {
        Ok(grant) => grant,
        Err(err) => {
            error!(error = %err, "authorization code exchange failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, CALLBACK_FAILURE).into_response();
        }
    };

    #[cfg(feature = "token-dump")]
    let page = state
        .token_dump
        .take()
        .then(|| token_dump_page(&grant));
    #[cfg(not(feature = "token-dump"))]
    let page: Option<String> = None;

    state.tokens.store_grant(grant).await;

    match page {
        Some(page) => {
            warn!("rendered token dump page; it will not be shown again");
            page.into_response()
        }
        None => CALLBACK_SUCCESS.into_response(),
    }
}

#[cfg(feature = "token-dump")]
fn token_dump_page(grant: &pcosync_providers::TokenGrant) -> String {
    format!(
        "Planning Center connected.\n\
         Copy these into the deployment configuration, then unset SHOW_TOKENS_ONCE.\n\
         This page is shown once.\n\n\
         PCO_ACCESS_TOKEN={}\n\
         PCO_REFRESH_TOKEN={}\n",
        grant.access_token,
        grant.refresh_token.as_deref().unwrap_or(""),
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub ok: bool,
    pub message: &'static str,
    pub airtable: AirtableSummary,
    pub pco: PcoSummary,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AirtableSummary {
    pub record_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PcoSummary {
    pub first_event_name: Option<String>,
}

impl From<SyncResult> for SyncResponse {
    fn from(result: SyncResult) -> Self {
        Self {
            ok: true,
            message: "Sync completed",
            airtable: AirtableSummary {
                record_count: result.record_count,
            },
            pco: PcoSummary {
                first_event_name: result.sample_event_name,
            },
            timestamp: result.timestamp,
        }
    }
}

/// `POST /sync`
#[instrument(skip_all, name = "sync_request")]
pub async fn sync(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SyncResponse>, ApiError> {
    let Some(expected) = state.config.sync_secret.as_deref() else {
        error!("sync requested but SYNC_SECRET is not configured");
        return Err(ApiError::Misconfigured(
            "Server misconfigured: SYNC_SECRET is not set".into(),
        ));
    };

    let presented = headers
        .get(SYNC_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    if presented != Some(expected) {
        warn!(header_present = presented.is_some(), "rejected sync request");
        return Err(ApiError::Unauthorized);
    }

    match state.orchestrator.run().await {
        Ok(result) => {
            info!(
                record_count = result.record_count,
                first_event = result.sample_event_name.as_deref().unwrap_or("<none>"),
                "sync completed"
            );
            Ok(Json(result.into()))
        }
        Err(err) => {
            error!(category = ?err.category(), detail = %err.detail(), "sync failed");
            Err(err.into())
        }
    }
}
