//! The pull subscription the forwarder reads from.
//!
//! The forwarder does not know how messages are pulled, leased or
//! redelivered. It only needs a [`Subscription`] that hands out messages one
//! at a time, each paired with an [`AckHandle`] used to settle it.
//!
//! # Implementations
//!
//! | Type | Backend |
//! |------|---------|
//! | [`InMemorySubscription`] | tokio channel, for tests and local runs |
//! | `GcpSubscription` | Google Cloud Pub/Sub streaming pull (feature `gcp`) |
//!
//! # Settling a message
//!
//! [`AckHandle::ack`] and [`AckHandle::nack`] consume the boxed handle, so a
//! message can be settled at most once and the choice between the two is
//! made exactly once.

mod in_memory;

#[cfg(feature = "gcp")]
mod gcp;

use crate::error::Result;
use crate::types::Message;
use async_trait::async_trait;

pub use in_memory::{in_memory, AckLog, InMemoryPublisher, InMemorySubscription};

#[cfg(feature = "gcp")]
pub use gcp::GcpSubscription;

/// Settles one received message.
#[async_trait]
pub trait AckHandle: Send {
    /// Processing succeeded, the message must not be redelivered.
    async fn ack(self: Box<Self>) -> Result<()>;

    /// Processing failed, the message may be redelivered or dead-lettered.
    async fn nack(self: Box<Self>) -> Result<()>;
}

/// A message together with the handle that settles it.
pub struct Received {
    /// The pulled message
    pub message: Message,
    /// Its ack/nack handle
    pub handle: Box<dyn AckHandle>,
}

impl Received {
    /// Pair a message with its handle.
    pub fn new(message: Message, handle: Box<dyn AckHandle>) -> Self {
        Received { message, handle }
    }
}

impl std::fmt::Debug for Received {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Received")
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Source of messages for the forwarder.
#[async_trait]
pub trait Subscription: Send {
    /// Wait for the next message.
    ///
    /// Returns `None` once the subscription is closed and no further message
    /// will arrive.
    async fn receive(&mut self) -> Option<Result<Received>>;

    /// Name of the subscription, for logs.
    fn name(&self) -> &str;
}
