//! HTTP delivery of push envelopes.
//!
//! Provides [`DeliveryClient`], which posts one envelope to the configured
//! endpoint and reports what came back.
//!
//! # Examples
//!
//! ```ignore
//! use pubsub_push::client::DeliveryClient;
//! use pubsub_push::protocol::HeaderSet;
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoint = Url::parse("http://localhost:8080/push")?;
//!     let headers = HeaderSet::new().with("Authorization=Bearer abc");
//!     let client = DeliveryClient::new(endpoint, &headers)?;
//!
//!     let body = br#"{"message":{"messageId":"m1","data":"","attributes":{}}}"#;
//!     let response = client
//!         .deliver(body.to_vec().into(), &CancellationToken::new())
//!         .await?;
//!     println!("Status: {}", response.status);
//!     Ok(())
//! }
//! ```

use crate::client::config::ClientConfig;
use crate::error::{PushError, Result};
use crate::protocol::constants::{headers, media_types};
use crate::protocol::HeaderSet;
use crate::types::DeliveryResponse;
use bytes::Bytes;
use http::{HeaderMap, HeaderValue};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// How long the rest of a response body is read after the status arrived.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts push envelopes to one endpoint.
///
/// The endpoint, headers and connection pool are fixed at construction, so a
/// client can be cloned into any number of concurrent tasks.
///
/// Each call to [`deliver`](Self::deliver) sends exactly one request:
/// - no retries
/// - redirects are not followed, a 3xx response is returned as is
/// - it returns once the status line is in, without waiting for the body
#[derive(Clone)]
pub struct DeliveryClient {
    client: reqwest::Client,
    endpoint: Arc<Url>,
    headers: Arc<HeaderMap>,
    unsendable_header: Option<PushError>,
    config: Arc<ClientConfig>,
}

impl DeliveryClient {
    /// Create a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Config`] if the HTTP client cannot be built.
    pub fn new(endpoint: Url, header_set: &HeaderSet) -> Result<Self> {
        Self::with_config(endpoint, header_set, ClientConfig::default())
    }

    /// Create a client with custom configuration.
    ///
    /// The content type is set first and the header set applied over it, so
    /// a configured `Content-Type` replaces `application/json`.
    ///
    /// Header entries are taken as given. If one of them cannot be put on the
    /// wire, the client is still built and every [`deliver`](Self::deliver)
    /// fails with [`PushError::Delivery`], so each message is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Config`] for an invalid proxy URL, user agent or
    /// transport setting.
    pub fn with_config(endpoint: Url, header_set: &HeaderSet, config: ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host);

        if let Some(timeout) = config.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout));
        }
        if let Some(timeout) = config.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(timeout));
        }
        if let Some(proxy_url) = &config.proxy_url {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| PushError::Config(format!("Invalid proxy '{}': {}", proxy_url, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| PushError::Config(format!("Cannot build HTTP client: {}", e)))?;

        let mut request_headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| PushError::Config(format!("Invalid user agent: '{}'", config.user_agent)))?;
        request_headers.insert(headers::USER_AGENT, user_agent);
        request_headers.insert(
            headers::CONTENT_TYPE,
            HeaderValue::from_static(media_types::APPLICATION_JSON),
        );
        let unsendable_header = match header_set.apply(&mut request_headers) {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    headers = %header_set,
                    error = %e,
                    "Header cannot be sent, every message will be rejected"
                );
                Some(e)
            }
        };

        Ok(DeliveryClient {
            client,
            endpoint: Arc::new(endpoint),
            headers: Arc::new(request_headers),
            unsendable_header,
            config: Arc::new(config),
        })
    }

    /// POST `body` to the endpoint.
    ///
    /// Any HTTP status counts as a response; deciding what it means is up to
    /// the caller. The call returns as soon as the status line and headers
    /// are in. The body is then read in the background, for at most a few
    /// seconds, and discarded.
    ///
    /// # Errors
    ///
    /// - [`PushError::Delivery`] when no response was obtained (DNS, refused
    ///   connection, timeout, TLS) or a configured header cannot be sent
    /// - [`PushError::Cancelled`] when `cancel` fired before a response arrived
    pub async fn deliver(&self, body: Bytes, cancel: &CancellationToken) -> Result<DeliveryResponse> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PushError::Cancelled),
            result = self.send(body) => result,
        }
    }

    async fn send(&self, body: Bytes) -> Result<DeliveryResponse> {
        if let Some(e) = &self.unsendable_header {
            return Err(e.clone());
        }

        let response = self
            .client
            .post(self.endpoint.as_ref().clone())
            .headers(self.headers.as_ref().clone())
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        tokio::spawn(drain(response));

        Ok(DeliveryResponse { status })
    }

    /// The endpoint every envelope is posted to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Headers sent with every request, content type included.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

async fn drain(response: reqwest::Response) {
    let status = response.status().as_u16();
    match tokio::time::timeout(DRAIN_TIMEOUT, response.bytes()).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => debug!(status, error = %e, "Could not read response body"),
        Err(_) => debug!(status, "Response body not finished, dropping it"),
    }
}
