use crate::duration::parse_duration;
use crate::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

/// Connection settings for the distributed cart cache.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    /// Store address, either `host:port` or a `redis://` URL
    #[serde(rename = "cache_host")]
    pub host: String,
    /// Entry lifetime as a duration string, e.g. "30m"
    #[serde(rename = "cache_ttl")]
    pub ttl: String,
}

impl CacheConfig {
    const DEFAULT_HOST: &str = "localhost:6379";
    const DEFAULT_TTL: &str = "1h";

    pub fn new(host: impl Into<String>, ttl: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ttl: ttl.into(),
        }
    }

    pub fn from_env() -> Self {
        let host = std::env::var("CARTCACHE_HOST").unwrap_or_else(|_| {
            warn!(
                "CARTCACHE_HOST not set, using default '{}'",
                Self::DEFAULT_HOST
            );
            Self::DEFAULT_HOST.to_string()
        });
        let ttl = std::env::var("CARTCACHE_TTL").unwrap_or_else(|_| {
            warn!("CARTCACHE_TTL not set, using default '{}'", Self::DEFAULT_TTL);
            Self::DEFAULT_TTL.to_string()
        });
        Self { host, ttl }
    }

    /// Validate the settings and return the parsed TTL.
    ///
    /// The TTL is checked first so a bad duration is reported even when the
    /// host is also wrong.
    pub fn validate(&self) -> Result<Duration> {
        let ttl = parse_duration(&self.ttl).map_err(|e| {
            Error::Config(format!("distributed cache TTL must be a valid duration: {e}"))
        })?;
        if ttl.is_zero() {
            return Err(Error::Config(
                "distributed cache TTL must be greater than zero".to_string(),
            ));
        }
        if self.host.trim().is_empty() {
            return Err(Error::Config(
                "distributed cache host must be set".to_string(),
            ));
        }
        Ok(ttl)
    }
}
