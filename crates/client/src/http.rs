//! Remote resource client.
//!
//! Every authenticated request carries the current access token. A 401 gets
//! exactly one transparent refresh-and-retry; concurrent 401s share a single
//! refresh call, and requests issued while a refresh is running wait for its
//! outcome before going out.

use std::sync::Arc;

use api_types::{
    ErrorResponse,
    auth::{RefreshRequest, TokenPair},
};
use reqwest::{Method, Url};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    error::{ClientError, Result},
    inflight::InFlight,
    tokens::TokenStore,
};

const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug)]
struct Outgoing {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    authenticated: bool,
}

impl Outgoing {
    fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            query: Vec::new(),
            body: None,
            authenticated: true,
        }
    }

    fn query<Q: Serialize + ?Sized>(mut self, query: &Q) -> Result<Self> {
        self.query = query_pairs(serde_json::to_value(query)?)?;
        Ok(self)
    }

    fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    fn public(mut self) -> Self {
        self.authenticated = false;
        self
    }
}

pub(crate) fn query_pairs(value: Value) -> Result<Vec<(String, String)>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(map
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::Null => None,
                Value::String(value) => Some((key, value)),
                other => Some((key, other.to_string())),
            })
            .collect()),
        other => Err(ClientError::Decode(format!(
            "query parameters must be an object, got {other}"
        ))),
    }
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    tokens: TokenStore,
    refresh: Arc<Mutex<Option<InFlight<()>>>>,
}

impl ApiClient {
    pub fn new(base_url: &str, tokens: TokenStore) -> Result<Self> {
        Self::with_http(reqwest::Client::new(), base_url, tokens)
    }

    pub fn with_http(http: reqwest::Client, base_url: &str, tokens: TokenStore) -> Result<Self> {
        Url::parse(base_url)
            .map_err(|err| ClientError::Config(format!("invalid base_url: {err}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            tokens,
            refresh: Arc::new(Mutex::new(None)),
        })
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(Outgoing::new(Method::GET, path)).await
    }

    pub async fn get_with<Q, T>(&self, path: &str, query: &Q) -> Result<T>
    where
        Q: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(Outgoing::new(Method::GET, path).query(query)?)
            .await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(Outgoing::new(Method::POST, path).json(body)?)
            .await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(Outgoing::new(Method::POST, path)).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(Outgoing::new(Method::PUT, path).json(body)?)
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(Outgoing::new(Method::DELETE, path)).await
    }

    /// POST without credentials and without the refresh protocol (login,
    /// registration).
    pub async fn post_public<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute(Outgoing::new(Method::POST, path).json(body)?.public())
            .await
    }

    async fn execute<T: DeserializeOwned>(&self, outgoing: Outgoing) -> Result<T> {
        if !outgoing.authenticated {
            return self.send_once(&outgoing, None).await;
        }

        self.wait_for_refresh().await;
        let token = self.tokens.access_token();
        match self.send_once(&outgoing, token.as_deref()).await {
            Err(err) if err.is_unauthorized() => {
                if let Err(refresh_err) = self.refresh(token.as_deref()).await {
                    tracing::warn!("credential refresh failed: {refresh_err}");
                    return Err(err);
                }
                let token = self.tokens.access_token();
                self.send_once(&outgoing, token.as_deref()).await
            }
            other => other,
        }
    }

    async fn wait_for_refresh(&self) {
        let pending = self
            .refresh
            .lock()
            .await
            .clone()
            .filter(|flight| !flight.is_finished());
        if let Some(pending) = pending {
            let _ = pending.wait().await;
        }
    }

    /// Refreshes the credential pair, joining a refresh that is already
    /// running. `stale_token` is the access token the failed request used.
    async fn refresh(&self, stale_token: Option<&str>) -> Result<()> {
        let flight = {
            let mut slot = self.refresh.lock().await;
            match slot.as_ref() {
                Some(pending) if !pending.is_finished() => pending.clone(),
                _ => {
                    let current = self.tokens.access_token();
                    if current.is_some() && current.as_deref() != stale_token {
                        // Rotated by an earlier refresh after this request went out.
                        return Ok(());
                    }
                    let flight = InFlight::spawn(self.clone().rotate_credentials());
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };
        flight.wait().await
    }

    async fn rotate_credentials(self) -> Result<()> {
        let Some(refresh_token) = self.tokens.refresh_token() else {
            self.tokens.clear_tokens()?;
            return Err(ClientError::Unauthorized(
                "missing refresh token".to_string(),
            ));
        };

        tracing::info!("access token rejected, refreshing credentials");
        let request = Outgoing::new(Method::POST, REFRESH_PATH)
            .json(&RefreshRequest { refresh_token })?
            .public();

        match self.send_once::<TokenPair>(&request, None).await {
            Ok(pair) => {
                tracing::debug!("credentials refreshed");
                self.tokens
                    .set_tokens(&pair.access_token, &pair.refresh_token)
            }
            Err(err) => {
                if let Err(clear_err) = self.tokens.clear_tokens() {
                    tracing::warn!("failed to clear credentials: {clear_err}");
                }
                Err(err)
            }
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        outgoing: &Outgoing,
        token: Option<&str>,
    ) -> Result<T> {
        tracing::debug!(method = %outgoing.method, path = %outgoing.path, "sending request");

        let mut request = self
            .http
            .request(outgoing.method.clone(), self.url(&outgoing.path));
        if !outgoing.query.is_empty() {
            request = request.query(&outgoing.query);
        }
        if let Some(body) = &outgoing.body {
            request = request.json(body);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let res = request.send().await?;
        let status = res.status();
        let text = res.text().await?;

        if status.is_success() {
            return serde_json::from_str(&text).map_err(|err| {
                ClientError::Decode(format!("{} {}: {err}", outgoing.method, outgoing.path))
            });
        }

        let body = serde_json::from_str::<ErrorResponse>(&text).unwrap_or_else(|_| ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
            fields: Default::default(),
        });
        tracing::debug!(status = status.as_u16(), path = %outgoing.path, "request failed");
        Err(ClientError::from_status(status, body))
    }
}

#[cfg(test)]
mod tests {
    use api_types::{EntryType, journal::JournalFilters};
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn query_pairs_skip_unset_fields() {
        let filters = JournalFilters {
            kind: Some(EntryType::Expense),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 31),
            page: Some(2),
            ..JournalFilters::default()
        };
        let mut pairs = query_pairs(serde_json::to_value(&filters).unwrap()).unwrap();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("end_date".to_string(), "2024-03-31".to_string()),
                ("page".to_string(), "2".to_string()),
                ("type".to_string(), "expense".to_string()),
            ]
        );
    }

    #[test]
    fn base_url_is_validated_and_joined() {
        assert!(matches!(
            ApiClient::new("not a url", TokenStore::in_memory()),
            Err(ClientError::Config(_))
        ));
        let client = ApiClient::new("http://localhost:8080/api/v1/", TokenStore::in_memory()).unwrap();
        assert_eq!(client.url("/journals"), "http://localhost:8080/api/v1/journals");
    }
}
