//! Delivery client configuration.

use crate::protocol::constants::DEFAULT_USER_AGENT;

/// Tuning of the HTTP transport used for push deliveries.
///
/// Deliveries are never retried, so there are no retry settings here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Whole-request timeout. `None` waits for as long as the endpoint takes.
    pub request_timeout_ms: Option<u64>,
    /// Timeout of the TCP/TLS connect phase.
    pub connect_timeout_ms: Option<u64>,
    /// Idle keep-alive connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// How long an idle connection stays in the pool.
    pub pool_idle_timeout_secs: u64,
    /// Proxy for all requests, if any.
    pub proxy_url: Option<String>,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            request_timeout_ms: None,
            connect_timeout_ms: None,
            pool_max_idle_per_host: 32,
            pool_idle_timeout_secs: 90,
            proxy_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
