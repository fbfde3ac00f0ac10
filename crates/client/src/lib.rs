//! Kaizen finance client.
//!
//! [`Kaizen`] is the application context: it owns the remote client (with
//! its credential store) and the query cache, and every query, mutation and
//! view-model is built from it. Contexts are independent, so tests can build
//! as many as they like.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;

pub mod aggregation;
mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod filters;
mod http;
mod inflight;
mod mutations;
pub mod pages;
mod queries;
mod session;
pub mod tokens;
pub mod view;

pub use cache::{
    CacheEvent, Family, Query, QueryCache, QueryKey, QuerySnapshot, QueryStatus, Refresher,
    Resource, Subscription,
};
pub use config::{CacheConfig, ClientConfig};
pub use error::{ClientError, ErrorKind, Result};
pub use http::ApiClient;
pub use session::Session;
pub use tokens::{Credentials, TokenStore};

#[derive(Clone)]
pub struct Kaizen {
    api: ApiClient,
    cache: QueryCache,
    pending_mutations: Arc<AtomicUsize>,
    config: Arc<ClientConfig>,
    timezone: Tz,
}

impl Kaizen {
    pub fn builder() -> KaizenBuilder {
        KaizenBuilder::default()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn tokens(&self) -> &TokenStore {
        self.api.tokens()
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Today's date in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    pub fn session(&self) -> Session {
        Session::new(self.clone())
    }

    /// `true` while any mutation started from this context is pending.
    pub fn is_mutating(&self) -> bool {
        self.pending_mutations.load(Ordering::SeqCst) > 0
    }
}

#[derive(Default)]
pub struct KaizenBuilder {
    config: ClientConfig,
    tokens: Option<TokenStore>,
    http: Option<reqwest::Client>,
}

impl KaizenBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses `tokens` instead of the store described by the config.
    pub fn tokens(mut self, tokens: TokenStore) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<Kaizen> {
        let timezone = self.config.timezone()?;
        let tokens = self.tokens.unwrap_or_else(|| match &self.config.token_path {
            Some(path) => TokenStore::load_or_empty(path, &self.config.storage_namespace),
            None => TokenStore::in_memory(),
        });
        let api = ApiClient::with_http(self.http.unwrap_or_default(), &self.config.base_url, tokens)?;

        Ok(Kaizen {
            api,
            cache: QueryCache::new(self.config.cache()),
            pending_mutations: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(self.config),
            timezone,
        })
    }
}
