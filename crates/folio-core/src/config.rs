//! Quote source configuration.
//!
//! # Environment Variables
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `FOLIO_QUOTE_SOURCE` | `server` or `yahoo` | `server` |
//! | `FOLIO_QUOTES_URL` | Base URL of the selected source | per source |
//! | `FOLIO_HTTP_TIMEOUT_MS` | Per-request timeout; unset waits indefinitely | unset |

use std::env;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use crate::adapters::{QuoteServerSource, YahooCsvSource, YAHOO_MONTHLY_CSV_URL};
use crate::data_source::QuoteSource;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::{QuoteCache, ValidationError};

pub const DEFAULT_QUOTE_SERVER_URL: &str = "http://localhost:5000";

/// Which upstream serves monthly quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    Server,
    Yahoo,
}

impl SourceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Yahoo => "yahoo",
        }
    }

    const fn default_url(self) -> &'static str {
        match self {
            Self::Server => DEFAULT_QUOTE_SERVER_URL,
            Self::Yahoo => YAHOO_MONTHLY_CSV_URL,
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "server" => Ok(Self::Server),
            "yahoo" => Ok(Self::Yahoo),
            _ => Err(ValidationError::InvalidSourceKind {
                value: value.to_owned(),
            }),
        }
    }
}

/// Settings for building the session's quote source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteSourceConfig {
    pub kind: SourceKind,
    pub base_url: String,
    pub timeout_ms: Option<u64>,
}

impl Default for QuoteSourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            base_url: String::from(DEFAULT_QUOTE_SERVER_URL),
            timeout_ms: None,
        }
    }
}

impl QuoteSourceConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// unset keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = match lookup("FOLIO_QUOTE_SOURCE") {
            Some(value) => value.parse()?,
            None => SourceKind::default(),
        };

        let base_url = lookup("FOLIO_QUOTES_URL")
            .map(|value| value.trim().to_owned())
            .unwrap_or_else(|| kind.default_url().to_owned());
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ValidationError::InvalidConfig {
                key: "FOLIO_QUOTES_URL",
                value: base_url,
            });
        }

        let timeout_ms = match lookup("FOLIO_HTTP_TIMEOUT_MS") {
            Some(value) => Some(parse_timeout(&value)?),
            None => None,
        };

        Ok(Self {
            kind,
            base_url,
            timeout_ms,
        })
    }

    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = kind;
        self.base_url = kind.default_url().to_owned();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Build the configured source on top of `http_client`.
    pub fn build_source(&self, http_client: Arc<dyn HttpClient>) -> Arc<dyn QuoteSource> {
        match self.kind {
            SourceKind::Server => Arc::new(
                QuoteServerSource::new(self.base_url.clone(), http_client)
                    .with_timeout_ms(self.timeout_ms),
            ),
            SourceKind::Yahoo => Arc::new(
                YahooCsvSource::with_base_url(self.base_url.clone(), http_client)
                    .with_timeout_ms(self.timeout_ms),
            ),
        }
    }

    /// Build a fresh session cache over a reqwest-backed source.
    pub fn build_cache(&self) -> QuoteCache {
        QuoteCache::new(self.build_source(Arc::new(ReqwestHttpClient::new())))
    }
}

fn parse_timeout(value: &str) -> Result<u64, ValidationError> {
    match value.trim().parse::<u64>() {
        Ok(timeout) if timeout > 0 => Ok(timeout),
        _ => Err(ValidationError::InvalidConfig {
            key: "FOLIO_HTTP_TIMEOUT_MS",
            value: value.to_owned(),
        }),
    }
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
    fn defaults_to_local_quote_server_without_timeout() {
        let config = QuoteSourceConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, QuoteSourceConfig::default());
        assert_eq!(config.timeout_ms, None);
    }

    #[test]
    fn yahoo_kind_picks_its_own_default_url() {
        let config = QuoteSourceConfig::from_lookup(lookup(&[("FOLIO_QUOTE_SOURCE", "Yahoo")]))
            .expect("config");
        assert_eq!(config.kind, SourceKind::Yahoo);
        assert_eq!(config.base_url, YAHOO_MONTHLY_CSV_URL);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = QuoteSourceConfig::from_lookup(lookup(&[
            ("FOLIO_QUOTES_URL", "https://quotes.example.com"),
            ("FOLIO_HTTP_TIMEOUT_MS", "2500"),
        ]))
        .expect("config");
        assert_eq!(config.base_url, "https://quotes.example.com");
        assert_eq!(config.timeout_ms, Some(2_500));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = QuoteSourceConfig::from_lookup(lookup(&[("FOLIO_QUOTE_SOURCE", "bloomberg")]))
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidSourceKind { .. }));

        let err = QuoteSourceConfig::from_lookup(lookup(&[("FOLIO_HTTP_TIMEOUT_MS", "soon")]))
            .expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::InvalidConfig {
                key: "FOLIO_HTTP_TIMEOUT_MS",
                ..
            }
        ));

        let err = QuoteSourceConfig::from_lookup(lookup(&[("FOLIO_QUOTES_URL", "ftp://old")]))
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidConfig { .. }));
    }

    #[test]
    fn builds_the_selected_source() {
        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
        let server = QuoteSourceConfig::default().build_source(http.clone());
        assert_eq!(server.name(), "quote_server");

        let yahoo = QuoteSourceConfig::default()
            .with_kind(SourceKind::Yahoo)
            .build_source(http);
        assert_eq!(yahoo.name(), "yahoo_csv");
    }
}
