//! Google Cloud Pub/Sub streaming pull.
//!
//! When `PUBSUB_EMULATOR_HOST` is set the client talks to that emulator and
//! skips authentication. Otherwise credentials are resolved the usual way for
//! Google client libraries (`GOOGLE_APPLICATION_CREDENTIALS`, then the
//! metadata server). The `pubsub-push` binary checks up front that one of the
//! two variables is set; see [`credentials_path`](crate::config::credentials_path).

use crate::error::{PushError, Result};
use crate::subscription::{AckHandle, Received, Subscription};
use crate::types::Message;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use google_cloud_pubsub::client::{Client, ClientConfig};
use google_cloud_pubsub::subscriber::ReceivedMessage;
use google_cloud_pubsub::subscription::MessageStream;
use tracing::info;

/// A pull subscription on Google Cloud Pub/Sub.
pub struct GcpSubscription {
    name: String,
    stream: MessageStream,
}

impl GcpSubscription {
    /// Connect to `subscription` in `project` and open a streaming pull.
    ///
    /// # Errors
    ///
    /// - [`PushError::Subscription`] when authentication or the connection fails
    /// - [`PushError::Config`] when the subscription does not exist
    pub async fn connect(project: &str, subscription: &str) -> Result<Self> {
        let config = ClientConfig {
            project_id: Some(project.to_string()),
            ..Default::default()
        }
        .with_auth()
        .await
        .map_err(|e| PushError::Subscription(format!("Authentication failed: {}", e)))?;

        let client = Client::new(config)
            .await
            .map_err(|e| PushError::Subscription(format!("Failed to create client: {}", e)))?;

        let handle = client.subscription(subscription);
        let exists = handle
            .exists(None)
            .await
            .map_err(|e| PushError::Subscription(format!("Cannot check subscription: {}", e)))?;
        if !exists {
            return Err(PushError::Config(format!(
                "Subscription '{}' does not exist in project '{}'",
                subscription, project
            )));
        }

        let stream = handle
            .subscribe(None)
            .await
            .map_err(|e| PushError::Subscription(format!("Cannot start streaming pull: {}", e)))?;
        info!(subscription = handle.fully_qualified_name(), "Streaming pull started");

        Ok(GcpSubscription {
            name: subscription.to_string(),
            stream,
        })
    }
}

#[async_trait]
impl Subscription for GcpSubscription {
    async fn receive(&mut self) -> Option<Result<Received>> {
        let received = self.stream.next().await?;
        let message = Message {
            id: received.message.message_id.clone(),
            data: Bytes::from(received.message.data.clone()),
            attributes: received.message.attributes.clone(),
        };
        Some(Ok(Received::new(message, Box::new(GcpAck { received }))))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct GcpAck {
    received: ReceivedMessage,
}

#[async_trait]
impl AckHandle for GcpAck {
    async fn ack(self: Box<Self>) -> Result<()> {
        self.received
            .ack()
            .await
            .map_err(|e| PushError::Subscription(format!("Ack failed: {}", e)))
    }

    async fn nack(self: Box<Self>) -> Result<()> {
        self.received
            .nack()
            .await
            .map_err(|e| PushError::Subscription(format!("Nack failed: {}", e)))
    }
}
