//! Authorization commands for one-time CLI bootstrap.
//!
//! `auth url` prints a consent URL; after granting access, the operator
//! copies the `code` parameter from the redirect and runs `auth exchange`.
//! The resulting tokens go to stdout for pasting into deployment
//! configuration. Nothing is written to disk.

use std::io::{self, Write};

use pcosync_core::AppConfig;
use pcosync_core::config::keys;
use pcosync_providers::TokenGrant;
use pcosync_providers::pco::{PcoConfig, PcoOAuthClient, generate_state};

use crate::error::ServerResult;

/// Prints an authorization URL.
pub fn url(config: &AppConfig) -> ServerResult<()> {
    let client = oauth_client(config)?;
    let url = client.authorize_url(&generate_state())?;

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{url}")?;
    Ok(())
}

/// Exchanges an authorization code and prints the tokens.
pub async fn exchange(config: &AppConfig, code: &str) -> ServerResult<()> {
    let client = oauth_client(config)?;
    let grant = client.exchange_authorization_code(code).await?;

    write_grant(&mut io::stdout().lock(), &grant)?;
    Ok(())
}

fn oauth_client(config: &AppConfig) -> ServerResult<PcoOAuthClient> {
    Ok(PcoOAuthClient::new(
        PcoConfig::from_app_config(config),
        config.http_timeout,
    )?)
}

fn write_grant(out: &mut impl Write, grant: &TokenGrant) -> io::Result<()> {
    writeln!(out, "{}={}", keys::PCO_ACCESS_TOKEN, grant.access_token)?;
    match grant.refresh_token.as_deref() {
        Some(refresh_token) => writeln!(out, "{}={}", keys::PCO_REFRESH_TOKEN, refresh_token)?,
        None => writeln!(out, "# no refresh token was issued")?,
    }
    if let Some(expires_in) = grant.expires_in {
        writeln!(out, "# access token expires in {expires_in}s")?;
    }
    Ok(())
}
