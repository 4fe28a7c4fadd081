//! Server configuration from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::backend::{DEFAULT_BASE_URL, MetroConfig};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_STATIC_DIR: &str = "static";
const DEFAULT_STATION_CACHE: &str = "stations_cache.json";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// An environment variable that is set but unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid value for {var}: {value:?} ({reason})")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// `METRO_API_BASE_URL`
    pub api_base_url: String,
    /// `METRO_CROWDING_BASE_URL`
    pub crowding_base_url: Option<String>,
    /// `METRO_ARRIVALS_BASE_URL`
    pub arrivals_base_url: Option<String>,
    /// `METRO_BIND_ADDR`
    pub bind_addr: SocketAddr,
    /// `METRO_MOCK_DIR`: serve fixtures instead of calling the backend.
    pub mock_dir: Option<PathBuf>,
    /// `METRO_STATIC_DIR`
    pub static_dir: PathBuf,
    /// `METRO_STATION_CACHE`
    pub station_cache: PathBuf,
    /// `METRO_HTTP_TIMEOUT_SECS`
    pub http_timeout_secs: u64,
}

impl ServerConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read the configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_raw = get("METRO_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_raw.parse().map_err(|e: std::net::AddrParseError| ConfigError {
            var: "METRO_BIND_ADDR",
            value: bind_raw.clone(),
            reason: e.to_string(),
        })?;

        let http_timeout_secs = match get("METRO_HTTP_TIMEOUT_SECS") {
            None => DEFAULT_HTTP_TIMEOUT_SECS,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                Ok(_) => {
                    return Err(ConfigError {
                        var: "METRO_HTTP_TIMEOUT_SECS",
                        value: raw,
                        reason: "must be positive".to_string(),
                    });
                }
                Err(e) => {
                    return Err(ConfigError {
                        var: "METRO_HTTP_TIMEOUT_SECS",
                        value: raw,
                        reason: e.to_string(),
                    });
                }
            },
        };

        Ok(Self {
            api_base_url: get("METRO_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            crowding_base_url: get("METRO_CROWDING_BASE_URL"),
            arrivals_base_url: get("METRO_ARRIVALS_BASE_URL"),
            bind_addr,
            mock_dir: get("METRO_MOCK_DIR").map(PathBuf::from),
            static_dir: get("METRO_STATIC_DIR")
                .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
                .into(),
            station_cache: get("METRO_STATION_CACHE")
                .unwrap_or_else(|| DEFAULT_STATION_CACHE.to_string())
                .into(),
            http_timeout_secs,
        })
    }

    /// Identifies where station data comes from, so snapshots from one
    /// backend are not served for another.
    pub fn backend_origin(&self) -> String {
        match &self.mock_dir {
            Some(dir) => format!("mock:{}", dir.display()),
            None => self.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Backend client configuration.
    pub fn metro_config(&self) -> MetroConfig {
        let mut config = MetroConfig::new(&self.api_base_url).with_timeout(self.http_timeout_secs);
        if let Some(url) = &self.crowding_base_url {
            config = config.with_crowding_base_url(url);
        }
        if let Some(url) = &self.arrivals_base_url {
            config = config.with_arrivals_base_url(url);
        }
        config
    }
}
