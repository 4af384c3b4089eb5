use std::time::Duration;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{Config, EndpointConfig};

/// How much of an unexpected body ends up in the log
const SNIPPET_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {status}")]
    Status { status: StatusCode, snippet: String },
    #[error("HTML response instead of JSON (status {status})")]
    HtmlResponse { status: StatusCode, snippet: String },
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
        snippet: String,
    },
}

impl FetchError {
    /// Start of the offending body, when there was one
    pub fn snippet(&self) -> Option<&str> {
        match self {
            FetchError::Status { snippet, .. }
            | FetchError::HtmlResponse { snippet, .. }
            | FetchError::InvalidJson { snippet, .. } => Some(snippet),
            FetchError::Request(_) => None,
        }
    }
}

pub struct Fetcher {
    client: Client,
    root_path: String,
    date_offset: FixedOffset,
}

impl Fetcher {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()?;

        let date_offset = config
            .date_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                warn!(
                    "Invalid date_offset_hours {}, using UTC",
                    config.date_offset_hours
                );
                Utc.fix()
            });

        Ok(Self {
            client,
            root_path: config.root_path.clone(),
            date_offset,
        })
    }

    /// The `date` query value for `now`, as a calendar date in the site's zone
    pub fn request_date(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.date_offset)
            .format("%Y-%m-%d")
            .to_string()
    }

    /// Fetch every endpoint in order. A failed endpoint contributes an empty list.
    pub async fn fetch_all(&self, endpoints: &[EndpointConfig]) -> Vec<Value> {
        info!("Fetching {} endpoints", endpoints.len());

        let mut payloads = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            payloads.push(self.fetch_endpoint(endpoint).await);
        }

        payloads
    }

    /// Fetch one endpoint, logging and swallowing any failure
    pub async fn fetch_endpoint(&self, endpoint: &EndpointConfig) -> Value {
        match self.fetch_json(endpoint).await {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to fetch '{}' ({}): {}", endpoint.name, endpoint.url, e);
                if let Some(snippet) = e.snippet() {
                    warn!("  snippet: {}", snippet.replace('\n', "\\n"));
                }
                Value::Array(Vec::new())
            }
        }
    }

    pub async fn fetch_json(&self, endpoint: &EndpointConfig) -> Result<Value, FetchError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if !self.root_path.is_empty() {
            query.push(("root_path", self.root_path.clone()));
        }
        if endpoint.with_date {
            query.push(("date", self.request_date(Utc::now())));
        }

        info!("Fetching endpoint: {} ({})", endpoint.name, endpoint.url);

        let response = self.client.get(&endpoint.url).query(&query).send().await?;
        let status = response.status();
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html") || ct.contains("application/html"))
            .unwrap_or(false);
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                snippet: snippet(&bytes),
            });
        }

        if is_html || looks_like_markup(&bytes) {
            return Err(FetchError::HtmlResponse {
                status,
                snippet: snippet(&bytes),
            });
        }

        let payload = serde_json::from_slice(&bytes).map_err(|source| FetchError::InvalidJson {
            source,
            snippet: snippet(&bytes),
        })?;

        info!("Fetched {} bytes from '{}'", bytes.len(), endpoint.name);
        Ok(payload)
    }
}

fn looks_like_markup(body: &[u8]) -> bool {
    body.iter()
        .find(|b| !b.is_ascii_whitespace())
        .map(|&b| b == b'<')
        .unwrap_or(false)
}

fn snippet(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .trim()
        .chars()
        .take(SNIPPET_CHARS)
        .collect()
}
