//! Authenticated JSON client for a single upstream HTTP service.
//!
//! GET responses go through a [`TtlCache`] keyed by the complete resolved
//! URL. Mutating verbs are never cached. There are no retries; callers that
//! want resilience add it above this layer.

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::RequestBuilder;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::cache::TtlCache;

/// One query parameter. `None` and empty values are dropped from the URL.
pub type QueryParam<'a> = (&'a str, Option<String>);

/// Failure talking to the upstream service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("upstream request failed: invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upstream request failed: undecodable response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status of the failed response, when the upstream answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Settings for [`ApiClient::new`].
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub cache_ttl: Duration,
    /// Bound on cached URLs; `None` keeps every distinct URL.
    pub cache_capacity: Option<usize>,
    /// Per-request timeout; `None` leaves reqwest's default (no timeout).
    pub timeout: Option<Duration>,
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            cache_ttl: Duration::from_secs(300),
            cache_capacity: None,
            timeout: None,
        }
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    cache: TtlCache,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(&config.base_url).map_err(|source| ApiError::InvalidUrl {
            url: config.base_url.clone(),
            source,
        })?;
        // Joining onto "https://host/v1" would drop "v1" without the trailing slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        let cache = match config.cache_capacity {
            Some(cap) => TtlCache::with_capacity(config.cache_ttl, cap),
            None => TtlCache::new(config.cache_ttl),
        };

        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.filter(|k| !k.is_empty()),
            cache,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn cache(&self) -> &TtlCache {
        &self.cache
    }

    /// Resolve `endpoint` against the base URL and append the non-empty
    /// query parameters in order.
    pub fn resolve(&self, endpoint: &str, query: &[QueryParam<'_>]) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|source| ApiError::InvalidUrl {
                url: endpoint.to_string(),
                source,
            })?;

        let pairs: Vec<(&str, &str)> = query
            .iter()
            .filter_map(|(k, v)| v.as_deref().filter(|v| !v.is_empty()).map(|v| (*k, v)))
            .collect();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(url)
    }

    /// GET `endpoint`, answering from the cache when `use_cache` is set and a
    /// fresh entry exists for the resolved URL.
    pub async fn get(
        &self,
        endpoint: &str,
        query: &[QueryParam<'_>],
        use_cache: bool,
    ) -> Result<Value, ApiError> {
        let url = self.resolve(endpoint, query)?;
        let key = url.to_string();

        if use_cache {
            if let Some(hit) = self.cache.get(&key) {
                tracing::debug!(url = %key, "cache hit");
                return Ok(hit);
            }
            tracing::debug!(url = %key, "cache miss");
        }

        let value = self.send(self.http.get(url)).await?;
        if use_cache {
            self.cache.insert(key, value.clone());
        }
        Ok(value)
    }

    /// POST a JSON body. Never cached.
    pub async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Value, ApiError> {
        let url = self.resolve(endpoint, &[])?;
        self.send(self.http.post(url).json(body)).await
    }

    /// PUT a JSON body. Never cached.
    pub async fn put<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Value, ApiError> {
        let url = self.resolve(endpoint, &[])?;
        self.send(self.http.put(url).json(body)).await
    }

    /// DELETE `endpoint`. Never cached.
    pub async fn delete(&self, endpoint: &str) -> Result<Value, ApiError> {
        let url = self.resolve(endpoint, &[])?;
        self.send(self.http.delete(url)).await
    }

    /// Empty the response cache; later GETs fetch again.
    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::debug!("response cache cleared");
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value, ApiError> {
        let mut req = req.header(ACCEPT, "application/json");
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await?;
        let status = resp.status();
        tracing::debug!(url = %resp.url(), status = status.as_u16(), "upstream response");

        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}
