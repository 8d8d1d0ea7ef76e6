//! Route table and the HTTP listener.

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handlers;
use crate::signals::ShutdownSignal;
use crate::state::AppState;

/// Builds the application router.
///
/// - `GET /` - greeting
/// - `GET /health` - liveness
/// - `GET /oauth/start` - begin the Planning Center authorization
/// - `GET /oauth/callback` - finish it
/// - `POST /sync` - run one sync (requires `x-sync-secret`)
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/oauth/start", get(handlers::oauth_start))
        .route("/oauth/callback", get(handlers::oauth_callback))
        .route("/sync", post(handlers::sync))
        .with_state(state)
}

/// Binds the listener and serves until `shutdown` fires.
pub async fn serve(
    state: AppState,
    config: ServerConfig,
    shutdown: ShutdownSignal,
) -> ServerResult<()> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.wait())
        .await?;

    info!("server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::SYNC_SECRET_HEADER;
    use crate::sync::tests::{FakeEvents, FakeRecords, RefusingEndpoint};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use pcosync_core::AppConfig;
    use pcosync_providers::{BoxFuture, ProviderResult, TokenEndpoint, TokenGrant};
    use serde_json::Value;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tower::ServiceExt;

    const REDIRECT: &str = "https://sync.example.org/oauth/callback";

    fn config(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    fn full_config() -> AppConfig {
        config(&[
            ("PCO_APP_ID", "app-id"),
            ("PCO_APP_SECRET", "app-secret"),
            ("PCO_REDIRECT_URI", REDIRECT),
            ("SYNC_SECRET", "s3cret"),
            ("AIRTABLE_API_KEY", "key"),
            ("AIRTABLE_BASE_ID", "appBase"),
            ("AIRTABLE_TABLE_NAME", "Events"),
            ("PCO_ACCESS_TOKEN", "seeded-access"),
        ])
    }

    struct Harness {
        app: Router,
        state: AppState,
        records: Arc<FakeRecords>,
        events: Arc<FakeEvents>,
    }

    fn harness_with_endpoint(config: AppConfig, endpoint: Arc<dyn TokenEndpoint>) -> Harness {
        let records = FakeRecords::with_rows(3);
        let events = FakeEvents::named(&["Sunday Service"]);
        let state =
            AppState::with_sources(config, records.clone(), events.clone(), endpoint).unwrap();
        Harness {
            app: router(state.clone()),
            state,
            records,
            events,
        }
    }

    fn harness(config: AppConfig) -> Harness {
        harness_with_endpoint(config, Arc::new(RefusingEndpoint))
    }

    /// Token endpoint double that grants any code.
    struct GrantingEndpoint;

    impl TokenEndpoint for GrantingEndpoint {
        fn exchange_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, ProviderResult<TokenGrant>> {
            Box::pin(async move {
                Ok(TokenGrant::new(
                    format!("access-for-{code}"),
                    Some("refresh".into()),
                    Some(7200),
                ))
            })
        }

        fn refresh<'a>(
            &'a self,
            _refresh_token: &'a str,
        ) -> BoxFuture<'a, ProviderResult<TokenGrant>> {
            Box::pin(async { Ok(TokenGrant::new("refreshed", None, Some(7200))) })
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_sync(secret: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri("/sync");
        if let Some(secret) = secret {
            builder = builder.header(SYNC_SECRET_HEADER, secret);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn root_returns_greeting() {
        let h = harness(full_config());
        let (status, body) = send(&h.app, get("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(body).unwrap().contains("pcosync"));
    }

    #[tokio::test]
    async fn health_is_ok_without_config() {
        let h = harness(AppConfig::default());
        let (status, body) = send(&h.app, get("/health")).await;
        assert_eq!(status, StatusCode::OK);

        let body = json(&body);
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn sync_without_configured_secret_is_500() {
        let mut config = full_config();
        config.sync_secret = None;
        let h = harness(config);

        for secret in [None, Some(""), Some("s3cret"), Some("anything")] {
            let (status, body) = send(&h.app, post_sync(secret)).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            let body = json(&body);
            assert_eq!(body["ok"], false);
            assert!(body["error"].as_str().unwrap().contains("SYNC_SECRET"));
        }
        assert_eq!(h.records.calls(), 0);
    }

    #[tokio::test]
    async fn sync_with_wrong_secret_is_401() {
        let h = harness(full_config());

        for secret in [None, Some(""), Some("S3CRET"), Some("s3cret "), Some("s3cre")] {
            let (status, body) = send(&h.app, post_sync(secret)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "secret {secret:?}");
            assert_eq!(json(&body)["ok"], false);
        }
        assert_eq!(h.records.calls(), 0);
        assert_eq!(h.events.calls(), 0);
    }

    #[tokio::test]
    async fn sync_with_matching_secret_runs_orchestrator() {
        let h = harness(full_config());

        let (status, body) = send(&h.app, post_sync(Some("s3cret"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(h.records.calls(), 1);
        assert_eq!(h.events.calls(), 1);

        let body = json(&body);
        assert_eq!(body["ok"], true);
        assert_eq!(body["message"], "Sync completed");
        assert_eq!(body["airtable"]["recordCount"], 3);
        assert_eq!(body["pco"]["firstEventName"], "Sunday Service");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn sync_failure_is_500_with_public_message() {
        let mut config = full_config();
        config.pco_access_token = None;
        let h = harness(config);

        let (status, body) = send(&h.app, post_sync(Some("s3cret"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = json(&body);
        assert_eq!(body["ok"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn oauth_start_debug_returns_url() {
        let h = harness(full_config());

        let (status, body) = send(&h.app, get("/oauth/start?debug=1")).await;
        assert_eq!(status, StatusCode::OK);

        let url = json(&body)["authUrl"].as_str().unwrap().to_string();
        assert!(url.contains("client_id=app-id"));
        assert!(url.contains(&format!("redirect_uri={}", urlencoding::encode(REDIRECT))));
        assert!(url.contains("response_type=code"));
        assert_eq!(h.state.pending_states.len(), 1);
    }

    #[tokio::test]
    async fn oauth_start_redirects() {
        let h = harness(full_config());
        let response = h.app.clone().oneshot(get("/oauth/start")).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://api.planningcenteronline.com/oauth/authorize?"));
    }

    #[tokio::test]
    async fn oauth_start_without_redirect_uri_is_500() {
        let mut config = full_config();
        config.pco_redirect_uri = None;
        let h = harness(config);

        let (status, body) = send(&h.app, get("/oauth/start")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let body = json(&body);
        assert_eq!(body["ok"], false);
        assert_eq!(body["hasPCO_REDIRECT_URI"], false);
        assert_eq!(body["hasPCO_APP_ID"], true);
        assert!(h.state.pending_states.is_empty());
    }

    #[tokio::test]
    async fn callback_without_code_is_400() {
        let h = harness(full_config());
        for uri in ["/oauth/callback", "/oauth/callback?code="] {
            let (status, _) = send(&h.app, get(uri)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn callback_with_unknown_state_is_400() {
        let h = harness_with_endpoint(full_config(), Arc::new(GrantingEndpoint));
        let (status, _) = send(&h.app, get("/oauth/callback?code=abc&state=forged")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            h.state.tokens.snapshot().await.access_token.as_deref(),
            Some("seeded-access")
        );
    }

    #[tokio::test]
    async fn callback_stores_tokens() {
        let h = harness_with_endpoint(full_config(), Arc::new(GrantingEndpoint));
        h.state.pending_states.issue("known");

        let (status, body) = send(&h.app, get("/oauth/callback?code=abc&state=known")).await;
        assert_eq!(status, StatusCode::OK);
        let text = String::from_utf8(body).unwrap();
        assert!(!text.contains("access-for-abc"));

        let tokens = h.state.tokens.snapshot().await;
        assert_eq!(tokens.access_token.as_deref(), Some("access-for-abc"));
        assert_eq!(tokens.refresh_token.as_deref(), Some("refresh"));
    }

    #[tokio::test]
    async fn callback_exchange_failure_is_generic_500() {
        let h = harness(full_config());
        let (status, body) = send(&h.app, get("/oauth/callback?code=abc")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!String::from_utf8(body).unwrap().contains("refused"));
    }

    #[tokio::test]
    async fn callback_with_provider_error_is_400() {
        let h = harness_with_endpoint(full_config(), Arc::new(GrantingEndpoint));
        let (status, _) = send(&h.app, get("/oauth/callback?error=access_denied")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[cfg(feature = "token-dump")]
    #[tokio::test]
    async fn token_dump_renders_once() {
        let mut config = full_config();
        config.show_tokens_once = true;
        let h = harness_with_endpoint(config, Arc::new(GrantingEndpoint));

        let (_, first) = send(&h.app, get("/oauth/callback?code=one")).await;
        assert!(String::from_utf8(first).unwrap().contains("PCO_ACCESS_TOKEN=access-for-one"));

        let (_, second) = send(&h.app, get("/oauth/callback?code=two")).await;
        assert!(!String::from_utf8(second).unwrap().contains("access-for-two"));
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let h = harness(full_config());
        let (status, _) = send(&h.app, get("/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
