//! Global shared resources
//!
//! One HTTP client per process, shared by the relay (upstream fetches) and
//! the widget (relay requests).

use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;

/// Identifies the relay to the upstream explorer
pub const USER_AGENT: &str = concat!(
    "bitcoingold.services-proxy/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/CryptoNomadBTG/bitcoingold.services)"
);

/// Global HTTP client - reuses connections across requests
static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

/// Get or create the global HTTP client
///
/// Features:
/// - Connection pooling (reuses TCP connections)
/// - Gzip/Brotli decompression
/// - TCP keepalive
/// - Reasonable timeouts
pub fn get_http_client() -> &'static Client {
    HTTP_CLIENT.get_or_init(|| {
        Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .pool_max_idle_per_host(15)
            .pool_idle_timeout(Duration::from_secs(120))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .gzip(true)
            .brotli(true)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("falling back to default HTTP client: {e}");
                Client::new()
            })
    })
}
