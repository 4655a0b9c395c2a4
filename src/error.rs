//! Error types for the forwarding pipeline.
//!
//! Errors fall in two groups:
//!
//! | Group | Variants | Effect |
//! |-------|----------|--------|
//! | Per message | [`Encoding`], [`Delivery`], [`Cancelled`], [`UnacceptableStatus`] | the message is rejected, the process keeps running |
//! | Startup | [`Config`], [`Subscription`] | the process stops |
//!
//! Per-message errors never leave the [`Forwarder`](crate::Forwarder); they are
//! resolved into a [`Decision::Nack`](crate::Decision::Nack) and a log record.
//!
//! [`Encoding`]: PushError::Encoding
//! [`Delivery`]: PushError::Delivery
//! [`Cancelled`]: PushError::Cancelled
//! [`UnacceptableStatus`]: PushError::UnacceptableStatus
//! [`Config`]: PushError::Config
//! [`Subscription`]: PushError::Subscription

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PushError>;

/// Errors raised while configuring or running the push emulation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PushError {
    /// The message could not be serialized into a push envelope.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// No HTTP response was obtained from the endpoint.
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// The delivery was abandoned because the process is shutting down.
    #[error("Delivery cancelled")]
    Cancelled,

    /// The endpoint answered with a status outside 200-299.
    #[error("Unacceptable status: {0}")]
    UnacceptableStatus(u16),

    /// Missing or invalid settings.
    #[error("Config error: {0}")]
    Config(String),

    /// The subscription could not be reached or pulled from.
    #[error("Subscription error: {0}")]
    Subscription(String),
}

impl PushError {
    /// Whether the error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PushError::Config(_) | PushError::Subscription(_))
    }

    /// Whether the error means no HTTP response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, PushError::Delivery(_) | PushError::Cancelled)
    }
}

impl From<reqwest::Error> for PushError {
    fn from(err: reqwest::Error) -> Self {
        PushError::Delivery(err.to_string())
    }
}

impl From<serde_json::Error> for PushError {
    fn from(err: serde_json::Error) -> Self {
        PushError::Encoding(err.to_string())
    }
}
