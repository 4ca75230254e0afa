//! HTTP client for the Auth0 Signals API.

use super::{BlocklistDetail, BlocklistKind, ReputationSource, SignalsRecord, SignalsResponse};
use crate::config::SignalsConfig;
use crate::error::RelayError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Statuses that mean "no data" rather than failure.
const NOT_CRITICAL: [StatusCode; 2] = [StatusCode::BAD_REQUEST, StatusCode::NOT_FOUND];

/// Auth0 Signals API client.
pub struct SignalsClient {
    client: Client,
    api_url: Url,
    user_agent: String,
}

impl SignalsClient {
    /// Create a new client.
    pub fn new(config: &SignalsConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            api_url: Url::parse(&config.api_url)?,
            user_agent: config.user_agent.clone(),
        })
    }

    async fn get(&self, key: &str, url: Url) -> Result<Response, RelayError> {
        debug!(url = %url, "Querying Auth0 Signals");

        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header("X-Auth-Token", key)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?;

        Ok(response)
    }

    /// GET and decode `url`; 400/404 yield `None`.
    async fn fetch<T: DeserializeOwned>(
        &self,
        key: &str,
        url: Url,
    ) -> Result<Option<T>, RelayError> {
        let response = self.get(key, url).await?;
        let status = response.status();

        if status.is_success() {
            let body = response
                .json::<T>()
                .await
                .map_err(|e| RelayError::InvalidResponse(e.to_string()))?;
            return Ok(Some(body));
        }

        if NOT_CRITICAL.contains(&status) {
            debug!(url = %response.url(), status = %status, "No data in Auth0 Signals");
            return Ok(None);
        }

        Err(status_error(response).await)
    }
}

/// Classify a non-success response.
async fn status_error(response: Response) -> RelayError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    if status == StatusCode::UNAUTHORIZED {
        RelayError::Unauthorized { text }
    } else {
        RelayError::Critical {
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            text,
        }
    }
}

/// Append `segments` to the path of `base`, each percent-encoded as a single
/// segment. Returns `None` for bases that cannot carry a path and for `.` or
/// `..` segments, which would otherwise be dropped from the path.
pub fn endpoint(base: &Url, segments: &[&str]) -> Option<Url> {
    if segments.iter().any(|s| matches!(*s, "." | "..")) {
        return None;
    }

    let mut url = base.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(segments);
    Some(url)
}

#[async_trait]
impl ReputationSource for SignalsClient {
    async fn lookup(&self, key: &str, ip: &str) -> Result<Option<SignalsRecord>, RelayError> {
        let Some(url) = endpoint(&self.api_url, &["ip", ip]) else {
            debug!(ip = %ip, "Value cannot be looked up in Auth0 Signals");
            return Ok(None);
        };
        let response: Option<SignalsResponse> = self.fetch(key, url).await?;

        let record = response.and_then(|r| r.fullip);
        debug!(
            ip = %ip,
            found = record.is_some(),
            score = ?record.as_ref().map(|r| r.score),
            "Auth0 Signals lookup complete"
        );
        Ok(record)
    }

    async fn check_health(&self, key: &str) -> Result<(), RelayError> {
        let url = endpoint(&self.api_url, &["ip"])
            .ok_or_else(|| RelayError::Transport(format!("invalid API URL: {}", self.api_url)))?;
        let response = self.get(key, url).await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(response).await)
        }
    }

    async fn blocklist_detail(
        &self,
        key: &str,
        kind: BlocklistKind,
        id: &str,
    ) -> Result<Option<BlocklistDetail>, RelayError> {
        let Some(url) = endpoint(&self.api_url, &["metadata", kind.as_str(), "lists", id]) else {
            return Ok(None);
        };
        self.fetch(key, url).await
    }
}
