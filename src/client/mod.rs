//! HTTP side of the push emulation.
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── config   - transport tuning (timeouts, pool, proxy)
//! └── delivery - DeliveryClient, one POST per envelope
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`DeliveryClient`] | Posts envelopes to the endpoint |
//! | [`ClientConfig`] | Transport configuration |
//!
//! # Examples
//!
//! ```
//! use pubsub_push::client::{ClientConfig, DeliveryClient};
//! use pubsub_push::protocol::HeaderSet;
//! use url::Url;
//!
//! let config = ClientConfig {
//!     request_timeout_ms: Some(30_000),
//!     ..Default::default()
//! };
//! let endpoint = Url::parse("http://localhost:8080/push").unwrap();
//! let client = DeliveryClient::with_config(endpoint, &HeaderSet::new(), config).unwrap();
//! assert_eq!(client.headers()["content-type"], "application/json");
//! ```

mod config;
mod delivery;

pub use config::ClientConfig;
pub use delivery::DeliveryClient;
