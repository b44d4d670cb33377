//! Environment-driven configuration
//!
//! `.env` is loaded by `main` before anything here runs.

use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_UPSTREAM_BASE: &str = "https://btgexplorer.com";
pub const DEFAULT_PUBLIC_DIR: &str = "public";
pub const DEFAULT_DEBOUNCE_MS: u64 = 400;
pub const DEFAULT_LOG_FILE: &str = "btg-search.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Relay listen port
    pub port: u16,
    /// Explorer base the relay forwards to
    pub upstream_base: String,
    /// Static files served next to the relay
    pub public_dir: PathBuf,
    /// Relay base the widget talks to
    pub relay_url: String,
    /// Quiet period before a typed query is searched
    pub debounce: Duration,
    /// Result selector priority list for HTML responses, `;`-separated in
    /// the environment; empty means the built-in list
    pub result_selectors: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Terminal UI log file (`BTG_SEARCH_LOG`), read before any subscriber exists
    pub fn log_file() -> PathBuf {
        log_file_from(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = try_load(&lookup, "PORT", DEFAULT_PORT)?;
        let upstream_base: String =
            try_load(&lookup, "BTG_EXPLORER_BASE", DEFAULT_UPSTREAM_BASE.to_string())?;
        Url::parse(&upstream_base).map_err(|e| ConfigError::Invalid {
            key: "BTG_EXPLORER_BASE",
            value: upstream_base.clone(),
            reason: e.to_string(),
        })?;

        let relay_url = try_load(
            &lookup,
            "BTG_SEARCH_RELAY",
            format!("http://127.0.0.1:{port}"),
        )?;
        let debounce_ms: u64 = try_load(&lookup, "BTG_SEARCH_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS)?;

        Ok(Self {
            port,
            upstream_base,
            public_dir: PathBuf::from(try_load(
                &lookup,
                "PUBLIC_DIR",
                DEFAULT_PUBLIC_DIR.to_string(),
            )?),
            relay_url,
            debounce: Duration::from_millis(debounce_ms),
            result_selectors: lookup("BTG_SEARCH_SELECTORS")
                .map(|list| {
                    list.split(';')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    /// Explorer base as a URL, used to resolve relative result links
    pub fn upstream_url(&self) -> Option<Url> {
        Url::parse(&self.upstream_base).ok()
    }
}

/// `BTG_SEARCH_LOG` without logging, so it can be read before logging is set up
fn log_file_from<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup("BTG_SEARCH_LOG")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string())
        .into()
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(value) => value.parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                value,
                reason: e.to_string(),
            }
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
