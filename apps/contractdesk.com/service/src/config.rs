use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_STATIC_DIR: &str = "apps/contractdesk.com/service/static";
const DEFAULT_WEBHOOK_URL: &str =
    "http://localhost:5678/webhook-test/f0c9f88c-4900-45d5-b51a-f9dbbf707eb5";
const DEFAULT_WEBHOOK_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_DATASTORE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_DATASTORE_REQUEST_ATTEMPTS: usize = 1;
const DEFAULT_POPULATE_INITIAL_DELAY_MS: u64 = 1_000;
const DEFAULT_POPULATE_RETRY_DELAY_MS: u64 = 2_000;
const DEFAULT_BANNER_TTL_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub log_filter: String,
    pub static_dir: PathBuf,
    pub webhook_url: String,
    pub webhook_timeout_ms: u64,
    pub datastore_url: Option<String>,
    pub datastore_key: Option<String>,
    pub datastore_timeout_ms: u64,
    pub datastore_request_attempts: usize,
    pub populate_initial_delay_ms: u64,
    pub populate_retry_delay_ms: u64,
    /// `None` retries transport failures indefinitely (the production
    /// behavior); tests bound it.
    pub populate_max_attempts: Option<u32>,
    pub banner_ttl_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid CD_FORM_BIND_ADDR value '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr_raw = env::var("CD_FORM_BIND_ADDR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let bind_addr = bind_addr_raw
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr {
                value: bind_addr_raw,
                source,
            })?;

        let log_filter = env::var("CD_FORM_LOG_FILTER")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let static_dir = env::var("CD_FORM_STATIC_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        let webhook_url = env::var("CD_FORM_WEBHOOK_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_WEBHOOK_URL.to_string());

        let webhook_timeout_ms = env::var("CD_FORM_WEBHOOK_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_WEBHOOK_TIMEOUT_MS)
            .max(500);

        // The original deployment configured these as SUPABASE_URL and
        // SUPABASE_ANON_KEY; both spellings are accepted.
        let datastore_url = env::var("CD_FORM_DATASTORE_URL")
            .ok()
            .or_else(|| env::var("SUPABASE_URL").ok())
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .filter(|value| !value.is_empty());

        let datastore_key = env::var("CD_FORM_DATASTORE_KEY")
            .ok()
            .or_else(|| env::var("SUPABASE_ANON_KEY").ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let datastore_timeout_ms = env::var("CD_FORM_DATASTORE_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_DATASTORE_TIMEOUT_MS)
            .max(250);

        let datastore_request_attempts = env::var("CD_FORM_DATASTORE_REQUEST_ATTEMPTS")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(DEFAULT_DATASTORE_REQUEST_ATTEMPTS)
            .max(1);

        let populate_initial_delay_ms = env::var("CD_FORM_POPULATE_INITIAL_DELAY_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POPULATE_INITIAL_DELAY_MS);

        let populate_retry_delay_ms = env::var("CD_FORM_POPULATE_RETRY_DELAY_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POPULATE_RETRY_DELAY_MS);

        let populate_max_attempts = env::var("CD_FORM_POPULATE_MAX_ATTEMPTS")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|value| *value > 0);

        let banner_ttl_ms = env::var("CD_FORM_BANNER_TTL_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(DEFAULT_BANNER_TTL_MS);

        Ok(Self {
            bind_addr,
            log_filter,
            static_dir,
            webhook_url,
            webhook_timeout_ms,
            datastore_url,
            datastore_key,
            datastore_timeout_ms,
            datastore_request_attempts,
            populate_initial_delay_ms,
            populate_retry_delay_ms,
            populate_max_attempts,
            banner_ttl_ms,
        })
    }
}

#[cfg(test)]
impl Config {
    #[must_use]
    pub fn for_tests(static_dir: PathBuf) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            log_filter: "debug".to_string(),
            static_dir,
            // Port 9 is discard; nothing listens there in tests, so the
            // default exercises the network-failure path.
            webhook_url: "http://127.0.0.1:9/webhook-test/fixture".to_string(),
            webhook_timeout_ms: 1_000,
            datastore_url: None,
            datastore_key: None,
            datastore_timeout_ms: 1_000,
            datastore_request_attempts: 1,
            populate_initial_delay_ms: 10,
            populate_retry_delay_ms: 10,
            populate_max_attempts: Some(3),
            banner_ttl_ms: DEFAULT_BANNER_TTL_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use std::path::PathBuf;

    #[test]
    fn test_fixture_keeps_the_datastore_unconfigured() {
        let config = Config::for_tests(PathBuf::from("."));
        assert_eq!(config.bind_addr.port(), 0);
        assert!(config.datastore_url.is_none());
        assert!(config.datastore_key.is_none());
        assert_eq!(config.populate_max_attempts, Some(3));
    }

    #[test]
    fn banner_ttl_default_matches_the_auto_hide_interval() {
        let config = Config::for_tests(PathBuf::from("."));
        assert_eq!(config.banner_ttl_ms, 5_000);
    }
}
