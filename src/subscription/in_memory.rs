//! Channel-backed subscription.
//!
//! Messages published through an [`InMemoryPublisher`] come out of the paired
//! [`InMemorySubscription`]. Every ack and nack is written to a shared
//! [`AckLog`], which makes it useful for:
//! - unit and integration tests
//! - running the forwarder against a local endpoint without a broker
//!
//! # Examples
//!
//! ```
//! use pubsub_push::subscription::{in_memory, Subscription};
//! use pubsub_push::Message;
//!
//! # tokio_test::block_on(async {
//! let (publisher, mut subscription) = in_memory("orders", 16);
//! publisher.publish(Message::new("m1", "hello")).await.unwrap();
//! drop(publisher);
//!
//! let received = subscription.receive().await.unwrap().unwrap();
//! received.handle.ack().await.unwrap();
//!
//! assert!(subscription.receive().await.is_none());
//! assert_eq!(subscription.log().acked(), vec!["m1".to_string()]);
//! # });
//! ```

use crate::error::{PushError, Result};
use crate::subscription::{AckHandle, Received, Subscription};
use crate::types::{Decision, Message};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// Create a connected publisher/subscription pair.
///
/// `capacity` bounds the number of published messages not yet received.
pub fn in_memory(name: impl Into<String>, capacity: usize) -> (InMemoryPublisher, InMemorySubscription) {
    let (tx, rx) = mpsc::channel(capacity);
    let publisher = InMemoryPublisher { sender: tx };
    let subscription = InMemorySubscription {
        name: name.into(),
        receiver: ReceiverStream::new(rx),
        log: AckLog::default(),
    };
    (publisher, subscription)
}

/// Publishing side of an in-memory subscription.
///
/// Dropping every clone closes the subscription.
#[derive(Clone)]
pub struct InMemoryPublisher {
    sender: mpsc::Sender<Message>,
}

impl InMemoryPublisher {
    /// Publish one message, waiting for room in the channel.
    ///
    /// # Errors
    ///
    /// Returns [`PushError::Subscription`] if the subscription was dropped.
    pub async fn publish(&self, message: Message) -> Result<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| PushError::Subscription("In-memory subscription closed".to_string()))
    }
}

/// Record of how each message was settled, in settlement order.
#[derive(Debug, Clone, Default)]
pub struct AckLog {
    entries: Arc<Mutex<Vec<(String, Decision)>>>,
}

impl AckLog {
    fn record(&self, message_id: String, decision: Decision) {
        self.entries.lock().push((message_id, decision));
    }

    /// All settlements so far.
    pub fn entries(&self) -> Vec<(String, Decision)> {
        self.entries.lock().clone()
    }

    /// Ids of acknowledged messages.
    pub fn acked(&self) -> Vec<String> {
        self.ids_with(Decision::Ack)
    }

    /// Ids of rejected messages.
    pub fn nacked(&self) -> Vec<String> {
        self.ids_with(Decision::Nack)
    }

    /// Every decision taken for one message id.
    pub fn decisions_for(&self, message_id: &str) -> Vec<Decision> {
        self.entries
            .lock()
            .iter()
            .filter(|(id, _)| id == message_id)
            .map(|(_, decision)| *decision)
            .collect()
    }

    fn ids_with(&self, decision: Decision) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, d)| *d == decision)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// Receiving side of an in-memory subscription.
pub struct InMemorySubscription {
    name: String,
    receiver: ReceiverStream<Message>,
    log: AckLog,
}

impl InMemorySubscription {
    /// Shared settlement log. Clones observe the same entries.
    pub fn log(&self) -> AckLog {
        self.log.clone()
    }

    fn received(&self, message: Message) -> Received {
        let handle = InMemoryAck {
            message_id: message.id.clone(),
            log: self.log.clone(),
        };
        Received::new(message, Box::new(handle))
    }
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn receive(&mut self) -> Option<Result<Received>> {
        let message = self.receiver.next().await?;
        Some(Ok(self.received(message)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct InMemoryAck {
    message_id: String,
    log: AckLog,
}

#[async_trait]
impl AckHandle for InMemoryAck {
    async fn ack(self: Box<Self>) -> Result<()> {
        let InMemoryAck { message_id, log } = *self;
        tracing::debug!(%message_id, "In-memory ack");
        log.record(message_id, Decision::Ack);
        Ok(())
    }

    async fn nack(self: Box<Self>) -> Result<()> {
        let InMemoryAck { message_id, log } = *self;
        tracing::debug!(%message_id, "In-memory nack");
        log.record(message_id, Decision::Nack);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_receive_in_order() {
        let (publisher, mut subscription) = in_memory("test-sub", 10);
        publisher.publish(Message::new("m1", "a")).await.unwrap();
        publisher.publish(Message::new("m2", "b")).await.unwrap();
        drop(publisher);

        let first = subscription.receive().await.unwrap().unwrap();
        let second = subscription.receive().await.unwrap().unwrap();
        assert_eq!(first.message.id, "m1");
        assert_eq!(second.message.id, "m2");
        assert!(subscription.receive().await.is_none());
        assert_eq!(subscription.name(), "test-sub");
    }

    #[tokio::test]
    async fn test_ack_log() {
        let (publisher, mut subscription) = in_memory("test-sub", 10);
        publisher.publish(Message::new("m1", "a")).await.unwrap();
        publisher.publish(Message::new("m2", "b")).await.unwrap();

        let log = subscription.log();
        let first = subscription.receive().await.unwrap().unwrap();
        let second = subscription.receive().await.unwrap().unwrap();
        second.handle.nack().await.unwrap();
        first.handle.ack().await.unwrap();

        assert_eq!(log.acked(), vec!["m1".to_string()]);
        assert_eq!(log.nacked(), vec!["m2".to_string()]);
        assert_eq!(
            log.entries(),
            vec![
                ("m2".to_string(), Decision::Nack),
                ("m1".to_string(), Decision::Ack)
            ]
        );
        assert_eq!(log.decisions_for("m1"), vec![Decision::Ack]);
        assert!(log.decisions_for("m3").is_empty());
    }

    #[tokio::test]
    async fn test_publish_after_close() {
        let (publisher, subscription) = in_memory("test-sub", 1);
        drop(subscription);
        let err = publisher.publish(Message::new("m1", "a")).await.unwrap_err();
        assert!(matches!(err, PushError::Subscription(_)));
    }
}
