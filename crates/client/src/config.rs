use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::{ClientError, Result};

pub const DEFAULT_TOKEN_PATH: &str = "config/kaizen_tokens.json";
pub const DEFAULT_STORAGE_NAMESPACE: &str = "kaizen-auth";

/// Client settings.
///
/// Every field has a default so partial config files deserialize.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root, including any version prefix (e.g. `http://host/api/v1`).
    pub base_url: String,
    /// File holding the persisted credential pair. `None` keeps them in memory.
    pub token_path: Option<String>,
    /// Key under which the credential pair is stored in `token_path`.
    pub storage_namespace: String,
    /// Age after which a cached result is revalidated on next access.
    pub stale_time_secs: u64,
    /// Idle time after which an unobserved cache entry may be dropped.
    pub gc_time_secs: u64,
    /// Page size for infinite journal lists.
    pub page_size: u32,
    /// IANA timezone used to decide what "this month" is.
    pub timezone: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api/v1".to_string(),
            token_path: Some(DEFAULT_TOKEN_PATH.to_string()),
            storage_namespace: DEFAULT_STORAGE_NAMESPACE.to_string(),
            stale_time_secs: 5 * 60,
            gc_time_secs: 30 * 60,
            page_size: 20,
            timezone: "UTC".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn cache(&self) -> CacheConfig {
        CacheConfig {
            stale_time: Duration::from_secs(self.stale_time_secs),
            gc_time: Duration::from_secs(self.gc_time_secs),
        }
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|err| ClientError::Config(format!("invalid timezone `{}`: {err}", self.timezone)))
    }
}

/// Timing knobs of the query cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub stale_time: Duration,
    pub gc_time: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        ClientConfig::default().cache()
    }
}
