//! GitHub REST client

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use fixme_core::config::GitHubConfig;
use fixme_core::{FetchError, FetchResult, Secrets};
use reqwest::header::{HeaderMap, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{Error, Result};

const USER_AGENT: &str = concat!("fixme/", env!("CARGO_PKG_VERSION"));

/// Upstream page size when `per_page` is not set
pub(crate) const DEFAULT_PAGE_SIZE: u32 = 30;

/// Largest page GitHub will serve
pub(crate) const MAX_PAGE_SIZE: u8 = 100;

/// Quota reported by the last response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimit {
    /// Read `X-RateLimit-Remaining` and `X-RateLimit-Reset`
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| headers.get(name)?.to_str().ok()?.trim().parse::<i64>().ok();
        let remaining = u32::try_from(header("x-ratelimit-remaining")?).ok()?;
        let reset_at = Utc.timestamp_opt(header("x-ratelimit-reset")?, 0).single()?;
        Some(Self { remaining, reset_at })
    }

    /// Whether requests must wait until `reset_at`
    pub fn is_exhausted(&self, now: DateTime<Utc>) -> bool {
        self.remaining == 0 && self.reset_at > now
    }
}

/// Read-only GitHub API client
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
    per_page: Option<u8>,
    max_pages: u32,
    rate_limit: Mutex<Option<RateLimit>>,
}

impl GitHubClient {
    /// Create a client from configuration and an optional token
    pub fn new(config: &GitHubConfig, token: Option<String>) -> Result<Self> {
        if config.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero".to_string()));
        }
        if config.max_pages == 0 {
            return Err(Error::Config("max_pages must be at least 1".to_string()));
        }
        if config.per_page == Some(0) {
            return Err(Error::Config("per_page must be at least 1".to_string()));
        }
        let per_page = config.per_page.map(|n| {
            if n > MAX_PAGE_SIZE {
                warn!(per_page = n, max = MAX_PAGE_SIZE, "Clamping per_page to the upstream maximum");
            }
            n.min(MAX_PAGE_SIZE)
        });

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .build()?;

        let api_url = config.api_url.trim_end_matches('/').to_string();
        info!(api_url = %api_url, authenticated = token.is_some(), "Created GitHub client");

        Ok(Self {
            http,
            api_url,
            token,
            per_page,
            max_pages: config.max_pages,
            rate_limit: Mutex::new(None),
        })
    }

    /// Create a client whose token comes from GITHUB_TOKEN or the secrets file
    pub fn from_config(config: &GitHubConfig) -> Result<Self> {
        let secrets = Secrets::load().map_err(|e| Error::Auth(e.to_string()))?;
        Self::new(config, secrets.github_token())
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub(crate) fn per_page(&self) -> Option<u8> {
        self.per_page
    }

    pub(crate) fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Quota reported by the most recent response, if any
    pub fn rate_limit(&self) -> Option<RateLimit> {
        *self.rate_limit.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_rate_limit(&self, limit: RateLimit) {
        *self.rate_limit.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(limit);
    }

    /// GET `path` and decode the JSON body
    ///
    /// Transport failures and timeouts become `NetworkUnavailable`; 4xx/5xx
    /// responses become `UpstreamError` with the decoded error message. Once
    /// the quota is exhausted, requests fail with `UpstreamError(403)` without
    /// being sent until the reset time passes.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> FetchResult<T> {
        let url = format!("{}{}", self.api_url, path);

        if let Some(limit) = self.rate_limit().filter(|l| l.is_exhausted(Utc::now())) {
            debug!(url = %url, reset_at = %limit.reset_at, "Deferring request until rate limit resets");
            return Err(rate_limited(StatusCode::FORBIDDEN, limit));
        }

        debug!(url = %url, ?query, "GitHub request");

        let mut request = self
            .http
            .get(&url)
            .query(query)
            .header(ACCEPT, "application/vnd.github+json");
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::network(format!("request to {} timed out", url))
            } else {
                FetchError::network(format!("request to {} failed: {}", url, e))
            }
        })?;

        let status = response.status();
        let limit = RateLimit::from_headers(response.headers());
        if let Some(limit) = limit {
            self.record_rate_limit(limit);
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::network(format!("failed to read response from {}: {}", url, e)))?;

        if status.is_client_error() || status.is_server_error() {
            if let Some(limit) = limit.filter(|l| l.remaining == 0) {
                if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
                    warn!(reset_at = %limit.reset_at, "GitHub rate limit exhausted");
                    return Err(rate_limited(status, limit));
                }
            }
            return Err(FetchError::upstream(status.as_u16(), error_detail(&body)));
        }

        serde_json::from_str(&body).map_err(|e| {
            FetchError::upstream(status.as_u16(), format!("unexpected response body: {}", e))
        })
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url)
            .field("authenticated", &self.token.is_some())
            .field("per_page", &self.per_page)
            .field("max_pages", &self.max_pages)
            .field("rate_limit", &self.rate_limit())
            .finish_non_exhaustive()
    }
}

fn rate_limited(status: StatusCode, limit: RateLimit) -> FetchError {
    FetchError::upstream(
        status.as_u16(),
        format!("rate limit exhausted until {}", limit.reset_at.to_rfc3339()),
    )
}

/// GitHub error document
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Message from a GitHub error body, or the raw body when it is not JSON
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => err.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}
