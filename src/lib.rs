#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # pubsub-push: push delivery for pull subscriptions
//!
//! This crate pulls messages from a Pub/Sub subscription and posts each one
//! to an HTTP endpoint in the same JSON envelope a push subscription would
//! use, then acks or nacks the message depending on the HTTP status.
//!
//! ## Pipeline
//!
//! ```text
//! Subscription ──► envelope::encode ──► DeliveryClient ──► status ──► ack / nack
//! ```
//!
//! - **Envelope**: `{"message":{"messageId":..,"data":<base64>,"attributes":{..}}}`
//! - **Delivery**: one `POST` with `Content-Type: application/json` plus the
//!   configured headers, no retries
//! - **Decision**: 200-299 acks, every other status or a transport failure nacks
//!
//! ## Usage
//!
//! ```ignore
//! use pubsub_push::{ForwarderBuilder, DeliveryClient, HeaderSet};
//! use pubsub_push::subscription::GcpSubscription;
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let headers = HeaderSet::new().with("Authorization=Bearer abc");
//!     let client = DeliveryClient::new(Url::parse("http://localhost:8080/push")?, &headers)?;
//!
//!     let cln_token = CancellationToken::new();
//!     let forwarder = ForwarderBuilder::new(client, cln_token.clone())
//!         .max_outstanding(100)
//!         .build();
//!
//!     let mut subscription = GcpSubscription::connect("my-project", "orders").await?;
//!     let stats = forwarder.run(&mut subscription).await?;
//!     println!("acked {}, nacked {}", stats.acked, stats.nacked);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Message, decision and report types
//! - **[error]** - Error types and result handling
//! - **[envelope]** - Push envelope encoding
//! - **[protocol]** - Wire constants and user header set
//! - **[client]** - HTTP delivery client
//! - **[subscription]** - Subscription trait and implementations
//! - **[forwarder]** - Encode, deliver, classify, settle
//! - **[config]** - Command line and environment configuration

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod forwarder;
pub mod protocol;
pub mod subscription;
pub mod types;

pub use client::{ClientConfig, DeliveryClient};
pub use error::{PushError, Result};
pub use forwarder::{Forwarder, ForwarderBuilder};
pub use protocol::HeaderSet;
pub use types::{Decision, DeliveryResponse, ForwardReport, ForwardStats, Message};
