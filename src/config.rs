//! Provider configuration.
//!
//! Values come from the provider block sent with `Configure`, with
//! environment variables as a fallback for the credentials and endpoint.

use std::env;
use std::time::Duration;

use reqwest::Url;
use serde_json::{json, Value};

use crate::error::ProviderError;
use crate::marshal::StateReader;
use crate::schema::{Attribute, Diagnostic, Schema};

/// Environment variable holding the Management API key.
pub const API_KEY_ENV: &str = "SINGLESTOREDB_API_KEY";

/// Environment variable overriding the Management API base URL.
pub const API_SERVICE_URL_ENV: &str = "SINGLESTOREDB_API_SERVICE_URL";

/// Default Management API base URL.
pub const DEFAULT_API_SERVICE_URL: &str = "https://api.singlestore.com";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 30 * 60;

/// Upper bound for every configured duration: one week.
pub const MAX_DURATION_SECS: i64 = 7 * 24 * 60 * 60;

/// Resolved provider configuration.
#[derive(Clone)]
pub struct ProviderConfig {
    /// Bearer token for the Management API.
    pub api_key: String,
    /// Base URL of the Management API, without the `/v1` suffix.
    pub api_service_url: Url,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Delay between polls while waiting for a state transition.
    pub poll_interval: Duration,
    /// Upper bound on any single wait for a state transition.
    pub wait_timeout: Duration,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &"<redacted>")
            .field("api_service_url", &self.api_service_url.as_str())
            .field("request_timeout", &self.request_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("wait_timeout", &self.wait_timeout)
            .finish()
    }
}

impl ProviderConfig {
    /// Configuration for a given key and endpoint with default timings.
    pub fn new(api_key: impl Into<String>, api_service_url: Url) -> Self {
        Self {
            api_key: api_key.into(),
            api_service_url,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            wait_timeout: Duration::from_secs(DEFAULT_WAIT_TIMEOUT_SECS),
        }
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the wait timeout.
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// The provider block schema.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Configuration for the SingleStore Management API")
            .with_attribute(
                "api_key",
                Attribute::optional_string().sensitive().with_description(format!(
                    "Management API key. Falls back to {}.",
                    API_KEY_ENV
                )),
            )
            .with_attribute(
                "api_service_url",
                Attribute::optional_string().with_description(format!(
                    "Management API base URL. Falls back to {}, then {}.",
                    API_SERVICE_URL_ENV, DEFAULT_API_SERVICE_URL
                )),
            )
            .with_attribute(
                "request_timeout",
                Attribute::optional_int64()
                    .with_description("HTTP request timeout in seconds")
                    .with_default(json!(DEFAULT_REQUEST_TIMEOUT_SECS)),
            )
            .with_attribute(
                "poll_interval",
                Attribute::optional_int64()
                    .with_description("Seconds between polls while waiting on a state change")
                    .with_default(json!(DEFAULT_POLL_INTERVAL_SECS)),
            )
            .with_attribute(
                "wait_timeout",
                Attribute::optional_int64()
                    .with_description("Maximum seconds to wait for a state change")
                    .with_default(json!(DEFAULT_WAIT_TIMEOUT_SECS)),
            )
    }

    /// Resolve configuration from the provider block and the process environment.
    pub fn from_value(config: &Value) -> Result<Self, Vec<Diagnostic>> {
        Self::resolve(config, |name| env::var(name).ok())
    }

    /// Resolve configuration with an injectable environment lookup.
    pub fn resolve<F>(config: &Value, lookup_env: F) -> Result<Self, Vec<Diagnostic>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let reader = StateReader::new(config);
        let mut diagnostics = Vec::new();

        let api_key = match reader.opt_string("api_key") {
            Ok(Some(key)) if !key.trim().is_empty() => Some(key),
            Ok(_) => lookup_env(API_KEY_ENV).filter(|k| !k.trim().is_empty()),
            Err(e) => {
                diagnostics.push(e.to_diagnostic());
                None
            },
        };
        if api_key.is_none() && diagnostics.is_empty() {
            diagnostics.push(
                Diagnostic::error("Missing API key")
                    .with_detail(format!(
                        "Set 'api_key' in the provider block or the {} environment variable",
                        API_KEY_ENV
                    ))
                    .with_attribute("api_key"),
            );
        }

        let raw_url = match reader.opt_string("api_service_url") {
            Ok(Some(url)) => url,
            Ok(None) => lookup_env(API_SERVICE_URL_ENV)
                .unwrap_or_else(|| DEFAULT_API_SERVICE_URL.to_string()),
            Err(e) => {
                diagnostics.push(e.to_diagnostic());
                DEFAULT_API_SERVICE_URL.to_string()
            },
        };
        let api_service_url = match parse_base_url(&raw_url) {
            Ok(url) => Some(url),
            Err(e) => {
                diagnostics.push(e.to_diagnostic());
                None
            },
        };

        let mut seconds = |name: &str, default: u64| match reader.opt_i64(name) {
            Ok(None) => Duration::from_secs(default),
            Ok(Some(v)) if (1..=MAX_DURATION_SECS).contains(&v) => Duration::from_secs(v as u64),
            Ok(Some(_)) => {
                diagnostics.push(
                    ProviderError::invalid_attribute(
                        name,
                        format!("must be between 1 and {} seconds", MAX_DURATION_SECS),
                    )
                    .to_diagnostic(),
                );
                Duration::from_secs(default)
            },
            Err(e) => {
                diagnostics.push(e.to_diagnostic());
                Duration::from_secs(default)
            },
        };
        let request_timeout = seconds("request_timeout", DEFAULT_REQUEST_TIMEOUT_SECS);
        let poll_interval = seconds("poll_interval", DEFAULT_POLL_INTERVAL_SECS);
        let wait_timeout = seconds("wait_timeout", DEFAULT_WAIT_TIMEOUT_SECS);

        match (api_key, api_service_url) {
            (Some(api_key), Some(api_service_url)) if diagnostics.is_empty() => Ok(Self {
                api_key,
                api_service_url,
                request_timeout,
                poll_interval,
                wait_timeout,
            }),
            _ => Err(diagnostics),
        }
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ProviderError> {
    let url = Url::parse(raw.trim_end_matches('/')).map_err(|e| {
        ProviderError::invalid_attribute("api_service_url", format!("'{}': {}", raw, e))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ProviderError::invalid_attribute(
            "api_service_url",
            format!("unsupported scheme '{}'", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_explicit_values_win() {
        let env = |name: &str| match name {
            API_KEY_ENV => Some("env-key".to_string()),
            API_SERVICE_URL_ENV => Some("https://env.example.com".to_string()),
            _ => None,
        };
        let config = ProviderConfig::resolve(
            &json!({"api_key": "block-key", "api_service_url": "http://localhost:8080/"}),
            env,
        )
        .unwrap();

        assert_eq!(config.api_key, "block-key");
        assert_eq!(config.api_service_url.as_str(), "http://localhost:8080/");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_env_fallback_and_default_url() {
        let env = |name: &str| (name == API_KEY_ENV).then(|| "env-key".to_string());
        let config = ProviderConfig::resolve(&json!({}), env).unwrap();
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.api_service_url.as_str(), "https://api.singlestore.com/");
    }

    #[test]
    fn test_missing_api_key() {
        let diagnostics = ProviderConfig::resolve(&json!({"api_key": ""}), no_env).unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("api_key"));
    }

    #[test]
    fn test_bad_url_and_timings() {
        let diagnostics = ProviderConfig::resolve(
            &json!({
                "api_key": "k",
                "api_service_url": "ftp://example.com",
                "poll_interval": 0,
            }),
            no_env,
        )
        .unwrap_err();
        let attrs: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect();
        assert_eq!(attrs, vec!["api_service_url", "poll_interval"]);
    }

    #[test]
    fn test_timings_out_of_range() {
        let diagnostics = ProviderConfig::resolve(
            &json!({
                "api_key": "k",
                "request_timeout": MAX_DURATION_SECS + 1,
                "wait_timeout": i64::MAX,
            }),
            no_env,
        )
        .unwrap_err();
        let attrs: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect();
        assert_eq!(attrs, vec!["request_timeout", "wait_timeout"]);

        let config = ProviderConfig::resolve(
            &json!({"api_key": "k", "wait_timeout": MAX_DURATION_SECS}),
            no_env,
        )
        .unwrap();
        assert_eq!(config.wait_timeout, Duration::from_secs(MAX_DURATION_SECS as u64));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ProviderConfig::new("super-secret", Url::parse("https://x.io").unwrap());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_schema_marks_key_sensitive() {
        let schema = ProviderConfig::schema();
        assert!(schema.attribute("api_key").unwrap().flags.sensitive);
        assert!(schema.attribute("wait_timeout").unwrap().default.is_some());
    }
}
