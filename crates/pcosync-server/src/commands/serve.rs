//! Serve command: runs the HTTP server in the foreground.

use pcosync_core::AppConfig;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::router;
use crate::signals::Shutdown;
use crate::state::AppState;

/// Starts the server and blocks until SIGTERM/SIGINT.
///
/// With `strict`, any missing required setting aborts startup. Otherwise the
/// server starts anyway and the affected endpoints report the problem per
/// request.
pub async fn run(config: AppConfig, port: Option<u16>, strict: bool) -> ServerResult<()> {
    check_required(&config, strict)?;

    let server_config = ServerConfig::from_port(port.unwrap_or(config.port));
    info!(
        pco_api_base = %config.pco_api_base,
        airtable_api_base = %config.airtable_api_base,
        timeout_secs = config.http_timeout.as_secs(),
        "starting pcosync"
    );

    let state = AppState::from_config(config)?;

    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();

    router::serve(state, server_config, shutdown.signal()).await
}

fn check_required(config: &AppConfig, strict: bool) -> ServerResult<()> {
    if strict {
        config.validate()?;
        return Ok(());
    }

    let missing = config.missing_required();
    if !missing.is_empty() {
        warn!(
            missing = %missing.join(", "),
            "configuration incomplete; affected endpoints will fail until it is set"
        );
    }
    Ok(())
}
