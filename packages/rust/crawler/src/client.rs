//! Authenticated HTTP client for the hosting API.
//!
//! Every request carries the configured credentials, timeout, and
//! User-Agent. Non-success statuses are returned as values, not errors, so
//! each caller decides how a failed unit of work degrades.

use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use repocorpus_shared::{ClientConfig, CorpusError, Result};

/// User-Agent string for API requests (the GitHub API rejects requests without one).
const USER_AGENT: &str = concat!("repocorpus/", env!("CARGO_PKG_VERSION"));

/// Media type requested from the API.
const ACCEPT_JSON: &str = "application/vnd.github+json";

/// Outcome of a GET that reached the server.
#[derive(Debug, Clone)]
pub enum ApiResponse {
    /// 2xx with a JSON body.
    Success(Value),
    /// Any other status. The body, if any, is discarded.
    Failure { status: StatusCode },
}

/// Shared, cheaply cloneable API client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CorpusError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// API root all account endpoints are joined onto.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Fan-out bound for concurrent stages (never below 1).
    pub fn concurrency(&self) -> usize {
        self.config.concurrency.max(1) as usize
    }

    /// `per_page` value for repository listings.
    pub fn repos_per_page(&self) -> u32 {
        self.config.repos_per_page
    }

    /// GET `url` and parse the body as JSON.
    ///
    /// Transport failures and unparseable success bodies are `Err`; a
    /// non-success status is `Ok(ApiResponse::Failure)`.
    pub async fn get_json(&self, url: &str) -> Result<ApiResponse> {
        let mut request = self.client.get(url).header(ACCEPT, ACCEPT_JSON);

        let creds = &self.config.credentials;
        if creds.is_present() {
            request = request.basic_auth(
                creds.username.clone().unwrap_or_default(),
                creds.token.clone(),
            );
        }

        let response = request
            .send()
            .await
            .map_err(|e| CorpusError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
                log_rate_limit(url, status, response.headers());
            }
            return Ok(ApiResponse::Failure { status });
        }

        debug!(%url, %status, "GET succeeded");

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| CorpusError::parse(format!("{url}: invalid JSON body: {e}")))?;

        Ok(ApiResponse::Success(body))
    }
}

/// Log rate-limit headers. No back-off is attempted.
fn log_rate_limit(url: &str, status: StatusCode, headers: &HeaderMap) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string()
    };
    warn!(
        %url,
        %status,
        remaining = %header("x-ratelimit-remaining"),
        reset = %header("x-ratelimit-reset"),
        "request refused, possibly rate limited"
    );
}
