//! Typed application configuration.
//!
//! Settings arrive through the environment. Hosting dashboards frequently
//! wrap pasted values in quotes, so every value is passed through
//! [`strip_wrapping_quotes`] and empty results count as absent.

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// Default Planning Center API host.
pub const DEFAULT_PCO_API_BASE: &str = "https://api.planningcenteronline.com";

/// Default Airtable API host.
pub const DEFAULT_AIRTABLE_API_BASE: &str = "https://api.airtable.com";

/// Default OAuth scope requested from Planning Center.
pub const DEFAULT_PCO_SCOPE: &str = "calendar";

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default timeout applied to every outbound HTTP call.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable names.
pub mod keys {
    pub const PCO_APP_ID: &str = "PCO_APP_ID";
    pub const PCO_APP_SECRET: &str = "PCO_APP_SECRET";
    pub const PCO_REDIRECT_URI: &str = "PCO_REDIRECT_URI";
    pub const SYNC_SECRET: &str = "SYNC_SECRET";
    pub const AIRTABLE_API_KEY: &str = "AIRTABLE_API_KEY";
    pub const AIRTABLE_BASE_ID: &str = "AIRTABLE_BASE_ID";
    pub const AIRTABLE_TABLE_NAME: &str = "AIRTABLE_TABLE_NAME";
    pub const PCO_ACCESS_TOKEN: &str = "PCO_ACCESS_TOKEN";
    pub const PCO_REFRESH_TOKEN: &str = "PCO_REFRESH_TOKEN";
    pub const SHOW_TOKENS_ONCE: &str = "SHOW_TOKENS_ONCE";
    pub const PCO_SCOPE: &str = "PCO_SCOPE";
    pub const PCO_API_BASE: &str = "PCO_API_BASE";
    pub const AIRTABLE_API_BASE: &str = "AIRTABLE_API_BASE";
    pub const HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";
    pub const PORT: &str = "PORT";
}

/// Application configuration, loaded once at startup.
#[derive(Clone)]
pub struct AppConfig {
    /// Planning Center OAuth application id.
    pub pco_app_id: Option<String>,
    /// Planning Center OAuth application secret.
    pub pco_app_secret: Option<String>,
    /// Redirect URI registered with Planning Center. Must match exactly
    /// between the authorize request and the code exchange.
    pub pco_redirect_uri: Option<String>,
    /// Shared secret callers present in `x-sync-secret`.
    pub sync_secret: Option<String>,
    /// Airtable personal access token.
    pub airtable_api_key: Option<String>,
    /// Airtable base identifier.
    pub airtable_base_id: Option<String>,
    /// Airtable table name or id.
    pub airtable_table_name: Option<String>,
    /// Access token seeded from deployment configuration.
    pub pco_access_token: Option<String>,
    /// Refresh token seeded from deployment configuration.
    pub pco_refresh_token: Option<String>,
    /// Operator request to render tokens once on the callback page.
    pub show_tokens_once: bool,
    /// OAuth scope requested on `/oauth/start`.
    pub pco_scope: String,
    /// Planning Center API host.
    pub pco_api_base: String,
    /// Airtable API host.
    pub airtable_api_base: String,
    /// Timeout for outbound HTTP calls.
    pub http_timeout: Duration,
    /// HTTP listen port.
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pco_app_id: None,
            pco_app_secret: None,
            pco_redirect_uri: None,
            sync_secret: None,
            airtable_api_key: None,
            airtable_base_id: None,
            airtable_table_name: None,
            pco_access_token: None,
            pco_refresh_token: None,
            show_tokens_once: false,
            pco_scope: DEFAULT_PCO_SCOPE.to_string(),
            pco_api_base: DEFAULT_PCO_API_BASE.to_string(),
            airtable_api_base: DEFAULT_AIRTABLE_API_BASE.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// Absent optional settings are fine; only values that are present but
    /// malformed fail here. Use [`AppConfig::validate`] to require the
    /// settings the server needs.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).and_then(|raw| strip_wrapping_quotes(&raw));

        let pco_redirect_uri = get(keys::PCO_REDIRECT_URI);
        if let Some(ref uri) = pco_redirect_uri {
            parse_url(keys::PCO_REDIRECT_URI, uri)?;
        }

        let pco_api_base = get(keys::PCO_API_BASE)
            .map(|base| normalize_base(keys::PCO_API_BASE, &base))
            .transpose()?
            .unwrap_or_else(|| DEFAULT_PCO_API_BASE.to_string());

        let airtable_api_base = get(keys::AIRTABLE_API_BASE)
            .map(|base| normalize_base(keys::AIRTABLE_API_BASE, &base))
            .transpose()?
            .unwrap_or_else(|| DEFAULT_AIRTABLE_API_BASE.to_string());

        let http_timeout = match get(keys::HTTP_TIMEOUT_SECS) {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| {
                    ConfigError::invalid(keys::HTTP_TIMEOUT_SECS, format!("'{raw}' is not a number"))
                })?;
                if secs == 0 {
                    return Err(ConfigError::invalid(
                        keys::HTTP_TIMEOUT_SECS,
                        "must be greater than zero",
                    ));
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_HTTP_TIMEOUT,
        };

        let port = match get(keys::PORT) {
            Some(raw) => raw.parse().map_err(|_| {
                ConfigError::invalid(keys::PORT, format!("'{raw}' is not a valid port"))
            })?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            pco_app_id: get(keys::PCO_APP_ID),
            pco_app_secret: get(keys::PCO_APP_SECRET),
            pco_redirect_uri,
            sync_secret: get(keys::SYNC_SECRET),
            airtable_api_key: get(keys::AIRTABLE_API_KEY),
            airtable_base_id: get(keys::AIRTABLE_BASE_ID),
            airtable_table_name: get(keys::AIRTABLE_TABLE_NAME),
            pco_access_token: get(keys::PCO_ACCESS_TOKEN),
            pco_refresh_token: get(keys::PCO_REFRESH_TOKEN),
            show_tokens_once: get(keys::SHOW_TOKENS_ONCE).is_some_and(|v| parse_flag(&v)),
            pco_scope: get(keys::PCO_SCOPE).unwrap_or_else(|| DEFAULT_PCO_SCOPE.to_string()),
            pco_api_base,
            airtable_api_base,
            http_timeout,
            port,
        })
    }

    /// Returns the name of every required setting that is absent.
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            (keys::PCO_APP_ID, self.pco_app_id.is_some()),
            (keys::PCO_APP_SECRET, self.pco_app_secret.is_some()),
            (keys::PCO_REDIRECT_URI, self.pco_redirect_uri.is_some()),
            (keys::SYNC_SECRET, self.sync_secret.is_some()),
            (keys::AIRTABLE_API_KEY, self.airtable_api_key.is_some()),
            (keys::AIRTABLE_BASE_ID, self.airtable_base_id.is_some()),
            (keys::AIRTABLE_TABLE_NAME, self.airtable_table_name.is_some()),
        ]
        .into_iter()
        .filter_map(|(key, present)| (!present).then_some(key))
        .collect()
    }

    /// Fails with every missing required setting at once.
    pub fn validate(&self) -> ConfigResult<()> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingFields(missing))
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(value: &Option<String>) -> &'static str {
            if value.is_some() { "<set>" } else { "<unset>" }
        }

        f.debug_struct("AppConfig")
            .field("pco_app_id", &self.pco_app_id)
            .field("pco_app_secret", &redact(&self.pco_app_secret))
            .field("pco_redirect_uri", &self.pco_redirect_uri)
            .field("sync_secret", &redact(&self.sync_secret))
            .field("airtable_api_key", &redact(&self.airtable_api_key))
            .field("airtable_base_id", &self.airtable_base_id)
            .field("airtable_table_name", &self.airtable_table_name)
            .field("pco_access_token", &redact(&self.pco_access_token))
            .field("pco_refresh_token", &redact(&self.pco_refresh_token))
            .field("show_tokens_once", &self.show_tokens_once)
            .field("pco_scope", &self.pco_scope)
            .field("pco_api_base", &self.pco_api_base)
            .field("airtable_api_base", &self.airtable_api_base)
            .field("http_timeout", &self.http_timeout)
            .field("port", &self.port)
            .finish()
    }
}

/// Trims whitespace and stray wrapping quote characters.
///
/// Returns `None` when nothing is left.
pub fn strip_wrapping_quotes(raw: &str) -> Option<String> {
    let stripped = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();
    (!stripped.is_empty()).then(|| stripped.to_string())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_url(field: &'static str, value: &str) -> ConfigResult<Url> {
    Url::parse(value).map_err(|e| ConfigError::invalid(field, e.to_string()))
}

fn normalize_base(field: &'static str, value: &str) -> ConfigResult<String> {
    parse_url(field, value)?;
    Ok(value.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn strips_wrapping_quotes() {
        assert_eq!(strip_wrapping_quotes("\"abc\""), Some("abc".to_string()));
        assert_eq!(strip_wrapping_quotes("'abc'"), Some("abc".to_string()));
        assert_eq!(strip_wrapping_quotes("  \"abc"), Some("abc".to_string()));
        assert_eq!(strip_wrapping_quotes("abc\" "), Some("abc".to_string()));
        assert_eq!(strip_wrapping_quotes("a\"b"), Some("a\"b".to_string()));
        assert_eq!(strip_wrapping_quotes("\"\""), None);
        assert_eq!(strip_wrapping_quotes("   "), None);
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.pco_api_base, DEFAULT_PCO_API_BASE);
        assert_eq!(config.airtable_api_base, DEFAULT_AIRTABLE_API_BASE);
        assert_eq!(config.pco_scope, DEFAULT_PCO_SCOPE);
        assert_eq!(config.http_timeout, DEFAULT_HTTP_TIMEOUT);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!config.show_tokens_once);
        assert!(config.sync_secret.is_none());
    }

    #[test]
    fn quoted_values_are_unwrapped() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PCO_APP_ID", "\"app-123\""),
            ("PCO_REDIRECT_URI", "'https://sync.example.org/oauth/callback'"),
            ("SYNC_SECRET", "\"s3cret\"\n"),
        ]))
        .unwrap();

        assert_eq!(config.pco_app_id.as_deref(), Some("app-123"));
        assert_eq!(
            config.pco_redirect_uri.as_deref(),
            Some("https://sync.example.org/oauth/callback")
        );
        assert_eq!(config.sync_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn missing_required_enumerates_every_field() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PCO_APP_ID", "app"),
            ("AIRTABLE_BASE_ID", "appBase"),
        ]))
        .unwrap();

        assert_eq!(
            config.missing_required(),
            vec![
                "PCO_APP_SECRET",
                "PCO_REDIRECT_URI",
                "SYNC_SECRET",
                "AIRTABLE_API_KEY",
                "AIRTABLE_TABLE_NAME",
            ]
        );
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingFields(ref fields) if fields.len() == 5));
    }

    #[test]
    fn complete_config_validates() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PCO_APP_ID", "app"),
            ("PCO_APP_SECRET", "secret"),
            ("PCO_REDIRECT_URI", "https://sync.example.org/oauth/callback"),
            ("SYNC_SECRET", "shared"),
            ("AIRTABLE_API_KEY", "pat"),
            ("AIRTABLE_BASE_ID", "appBase"),
            ("AIRTABLE_TABLE_NAME", "Events"),
        ]))
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "PORT", .. }));

        let err = AppConfig::from_lookup(lookup(&[("PCO_REDIRECT_URI", "not a url")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "PCO_REDIRECT_URI", .. }));

        let err = AppConfig::from_lookup(lookup(&[("HTTP_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "HTTP_TIMEOUT_SECS", .. }));
    }

    #[test]
    fn api_bases_lose_trailing_slash() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PCO_API_BASE", "http://127.0.0.1:9000/"),
            ("AIRTABLE_API_BASE", "http://127.0.0.1:9001"),
        ]))
        .unwrap();
        assert_eq!(config.pco_api_base, "http://127.0.0.1:9000");
        assert_eq!(config.airtable_api_base, "http://127.0.0.1:9001");
    }

    #[test]
    fn show_tokens_flag_parsing() {
        for value in ["1", "true", "TRUE", "yes", "on"] {
            let config = AppConfig::from_lookup(lookup(&[("SHOW_TOKENS_ONCE", value)])).unwrap();
            assert!(config.show_tokens_once, "{value} should enable the flag");
        }
        let config = AppConfig::from_lookup(lookup(&[("SHOW_TOKENS_ONCE", "0")])).unwrap();
        assert!(!config.show_tokens_once);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = AppConfig {
            pco_app_secret: Some("app-secret-value".into()),
            sync_secret: Some("sync-secret-value".into()),
            pco_access_token: Some("access-token-value".into()),
            ..AppConfig::default()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("app-secret-value"));
        assert!(!rendered.contains("sync-secret-value"));
        assert!(!rendered.contains("access-token-value"));
        assert!(rendered.contains("<set>"));
    }
}
