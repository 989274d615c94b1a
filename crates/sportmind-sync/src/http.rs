//! HTTP client for the API gateway that fronts the session bucket.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sportmind_core::{SessionDateError, parse_session_date};
use thiserror::Error;
use tracing::info;

const DATES_TIMEOUT: Duration = Duration::from_secs(15);
const SESSIONS_TIMEOUT: Duration = Duration::from_secs(20);
const API_KEY_HEADER: &str = "x-api-key";

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidDate(#[from] SessionDateError),
}

/// Response of `GET /data/dates`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DateListing {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub total_dates: u64,
}

/// Response of `GET /data/{date}`. Sessions are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionListing {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub total_sessions: u64,
    #[serde(default)]
    pub sessions: Vec<Value>,
}

/// Client for the gateway's read-only data endpoints.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl GatewayClient {
    /// `base_url` is like `https://abc.execute-api.sa-east-1.amazonaws.com/prod`.
    /// An empty `api_key` sends no key header.
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List the dates that have uploaded sessions.
    pub async fn fetch_dates(&self) -> Result<DateListing, SyncError> {
        let url = format!("{}/data/dates", self.base_url);
        info!(url = %url, "fetching session dates from gateway");
        let listing: DateListing = self.get_json(&url, DATES_TIMEOUT).await?;
        info!(count = listing.dates.len(), "fetched session dates");
        Ok(listing)
    }

    /// Fetch every session uploaded on `date` (`YYYY-MM-DD`).
    pub async fn fetch_sessions(&self, date: &str) -> Result<SessionListing, SyncError> {
        parse_session_date(date)?;
        let url = format!("{}/data/{date}", self.base_url);
        info!(url = %url, "fetching sessions from gateway");
        let listing: SessionListing = self.get_json(&url, SESSIONS_TIMEOUT).await?;
        info!(date, count = listing.sessions.len(), "fetched sessions");
        Ok(listing)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<T, SyncError> {
        let mut req = self.client.get(url).timeout(timeout);
        if let Some(key) = &self.api_key {
            req = req.header(API_KEY_HEADER, key);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
