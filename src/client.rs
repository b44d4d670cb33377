//! Widget side of the relay: issue a search and normalize what comes back

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use thiserror::Error;
use tracing::{debug, warn};

use crate::controller::SearchOutcome;
use crate::globals::get_http_client;
use crate::normalize::{Normalizer, collapse_whitespace, truncate_chars};

/// What the widget is willing to render
const ACCEPTED_TYPES: &str = "application/json, text/html, text/plain";

/// Longest upstream error detail carried into a status message
const MAX_DETAIL_LENGTH: usize = 120;

/// Raw relay answer
#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(
        "Search failed with status {status}{}",
        .detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
    )]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Talks to the search relay
#[derive(Debug, Clone)]
pub struct SearchClient {
    relay_base: String,
    normalizer: Normalizer,
    client: reqwest::Client,
}

impl SearchClient {
    pub fn new(relay_base: impl Into<String>, normalizer: Normalizer) -> Self {
        Self {
            relay_base: relay_base.into(),
            normalizer,
            client: get_http_client().clone(),
        }
    }

    /// Relay address for a query
    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}/api/search?q={}",
            self.relay_base.trim_end_matches('/'),
            urlencoding::encode(query)
        )
    }

    /// Fetch the raw relay response, treating non-success statuses as errors
    pub async fn fetch(&self, query: &str) -> Result<RelayResponse, FetchError> {
        let url = self.search_url(query);
        debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, ACCEPTED_TYPES)
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                detail: error_detail(&body),
            });
        }

        Ok(RelayResponse {
            status,
            content_type,
            body,
        })
    }

    /// Run one search to completion
    pub async fn search(&self, query: &str) -> SearchOutcome {
        match self.fetch(query).await {
            Ok(response) => {
                debug!(
                    "Relay answered {} ({} bytes) for {query:?}",
                    response.status,
                    response.body.len()
                );
                SearchOutcome::Completed(
                    self.normalizer
                        .normalize(&response.body, response.content_type.as_deref()),
                )
            }
            Err(e) => {
                warn!("Search for {query:?} failed: {e}");
                SearchOutcome::Failed(e.to_string())
            }
        }
    }
}

/// The `error` field of a JSON error body, flattened to one short line
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let detail = collapse_whitespace(value.get("error")?.as_str()?);
    (!detail.is_empty()).then(|| truncate_chars(&detail, MAX_DETAIL_LENGTH))
}
