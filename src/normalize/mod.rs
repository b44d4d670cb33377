//! Upstream response normalization
//!
//! The explorer behind the relay is not under our control: it may answer with
//! JSON in one of several shapes, with HTML, or with something mislabeled as
//! either. Everything funnels into one canonical shape here, an ordered list
//! of [`SearchResult`] records.
//!
//! Pipeline:
//! - JSON first (declared or sniffed), see [`json`]
//! - HTML markup extraction as the fallback, see [`markup`]
//! - whitespace cleanup, title fallback and deduplication, see [`finalize`]

pub mod json;
pub mod markup;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Maximum length (in characters) of a title synthesized from a raw payload
pub const MAX_SYNTHESIZED_TITLE: usize = 200;

/// Selectors describing "one search result item", tried in order
pub const DEFAULT_RESULT_SELECTORS: &[&str] = &[
    "article",
    "li",
    ".result",
    ".search-result",
    "[class*='result']",
];

/// One normalized search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub snippet: String,
}

impl SearchResult {
    /// Title-only record
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: None,
            snippet: String::new(),
        }
    }
}

/// Why a body could not be turned into records
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("response body is neither JSON nor extractable markup")]
    Unparseable,
}

/// Response normalizer
///
/// Holds the static configuration of the pipeline: the base used to resolve
/// relative links found in markup and the result selector priority list.
#[derive(Debug, Clone)]
pub struct Normalizer {
    base: Option<Url>,
    selectors: Vec<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Normalizer {
    /// Create a normalizer resolving relative links against `base`
    pub fn new(base: Option<Url>) -> Self {
        Self {
            base,
            selectors: DEFAULT_RESULT_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Replace the result selector priority list
    pub fn with_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    /// Normalize a response body, degrading every failure to "no results"
    pub fn normalize(&self, body: &str, content_type: Option<&str>) -> Vec<SearchResult> {
        self.try_normalize(body, content_type).unwrap_or_else(|e| {
            tracing::debug!("normalization failed: {e}");
            Vec::new()
        })
    }

    /// Normalize a response body, reporting unparseable bodies distinctly
    ///
    /// A body that parsed but carried nothing useful is `Ok(vec![])`.
    pub fn try_normalize(
        &self,
        body: &str,
        content_type: Option<&str>,
    ) -> Result<Vec<SearchResult>, NormalizeError> {
        if declares_json(content_type) {
            if let Some(records) = json::parse(body) {
                return Ok(finalize(records));
            }
            tracing::debug!("body declared as JSON did not parse, trying markup");
        } else if let Some(records) = json::parse(body) {
            // Upstream mislabeled its JSON
            return Ok(finalize(records));
        }

        if body.trim().is_empty() || !looks_like_markup(body) {
            return Err(NormalizeError::Unparseable);
        }

        let selectors: Vec<&str> = self.selectors.iter().map(String::as_str).collect();
        Ok(finalize(markup::extract(body, &selectors, self.base.as_ref())))
    }
}

/// Whether a declared content type announces JSON
pub fn declares_json(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/json" || essence.ends_with("+json")
}

/// Cheap check that a body contains at least one tag
fn looks_like_markup(body: &str) -> bool {
    body.contains('<') && body.contains('>')
}

/// Clean up candidate records and enforce the record invariants
///
/// - all fields have their whitespace collapsed and trimmed
/// - an empty url becomes `None`
/// - an empty title falls back to the url; candidates with neither are dropped
/// - records are unique by url when present, by title otherwise; first wins
pub fn finalize(candidates: Vec<SearchResult>) -> Vec<SearchResult> {
    #[derive(Hash, PartialEq, Eq)]
    enum Key {
        Url(String),
        Title(String),
    }

    let mut seen = HashSet::new();
    let mut records = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let url = candidate
            .url
            .as_deref()
            .map(collapse_whitespace)
            .filter(|u| !u.is_empty());
        let mut title = collapse_whitespace(&candidate.title);
        if title.is_empty() {
            match &url {
                Some(url) => title = url.clone(),
                None => continue,
            }
        }

        let key = match &url {
            Some(url) => Key::Url(url.clone()),
            None => Key::Title(title.clone()),
        };
        if !seen.insert(key) {
            continue;
        }

        records.push(SearchResult {
            title,
            url,
            snippet: collapse_whitespace(&candidate.snippet),
        });
    }

    records
}

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` characters
pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
