//! Forwarding controller.
//!
//! For every message pulled from the [`Subscription`] the forwarder:
//!
//! 1. encodes it into a push envelope,
//! 2. posts the envelope to the endpoint,
//! 3. classifies the outcome: a 2xx status acks, anything else nacks,
//! 4. settles the message through its [`AckHandle`] exactly once,
//! 5. logs one record with size, endpoint, status and decision.
//!
//! | Outcome | Decision |
//! |---------|----------|
//! | encoding failed | Nack, nothing is sent |
//! | no response (refused, DNS, timeout, TLS, unsendable header, shutdown) | Nack |
//! | status 200-299 | Ack |
//! | any other status | Nack |
//!
//! Messages are independent: the receive loop hands each one to its own
//! task, and at most `max_outstanding` of them are in flight at once.

use crate::client::DeliveryClient;
use crate::envelope;
use crate::error::{PushError, Result};
use crate::subscription::{AckHandle, Received, Subscription};
use crate::types::{Decision, ForwardReport, ForwardStats, Message};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default limit of messages received but not yet settled.
pub const DEFAULT_MAX_OUTSTANDING: usize = 1000;

/// Forwards subscription messages to the push endpoint.
///
/// Cheap to clone; clones share the HTTP client and cancellation token.
#[derive(Clone)]
pub struct Forwarder {
    client: DeliveryClient,
    endpoint: Arc<str>,
    cln_token: CancellationToken,
    max_outstanding: usize,
}

/// ForwarderBuilder is used to build a Forwarder instance with optional fields.
pub struct ForwarderBuilder {
    client: DeliveryClient,
    cln_token: CancellationToken,
    max_outstanding: usize,
}

impl ForwarderBuilder {
    /// Create a new builder with mandatory fields
    pub fn new(client: DeliveryClient, cln_token: CancellationToken) -> Self {
        Self {
            client,
            cln_token,
            max_outstanding: DEFAULT_MAX_OUTSTANDING,
        }
    }

    /// Limit the number of in-flight messages. Zero is treated as one.
    pub fn max_outstanding(mut self, max_outstanding: usize) -> Self {
        self.max_outstanding = max_outstanding.max(1);
        self
    }

    /// Build the Forwarder instance
    #[must_use]
    pub fn build(self) -> Forwarder {
        Forwarder {
            endpoint: Arc::from(self.client.endpoint().as_str()),
            client: self.client,
            cln_token: self.cln_token,
            max_outstanding: self.max_outstanding,
        }
    }
}

impl Forwarder {
    /// Encode, deliver and classify one message.
    ///
    /// Does not settle the message; see [`forward`](Self::forward).
    pub async fn process(&self, message: &Message) -> ForwardReport {
        let encoded = match envelope::encode(message) {
            Ok(encoded) => encoded,
            Err(e) => return self.report(message, 0, None, Decision::Nack, Some(e)),
        };
        let envelope_len = encoded.len();

        match self.client.deliver(encoded.into_body(), &self.cln_token).await {
            Ok(response) => {
                let decision = Decision::from_status(response.status);
                let error = match decision {
                    Decision::Ack => None,
                    Decision::Nack => Some(PushError::UnacceptableStatus(response.status)),
                };
                self.report(message, envelope_len, Some(response.status), decision, error)
            }
            Err(e) => self.report(message, envelope_len, None, Decision::Nack, Some(e)),
        }
    }

    /// Process one message and settle it through `handle`.
    ///
    /// A failure to settle is logged; redelivery is then up to the
    /// subscription.
    pub async fn forward(&self, message: Message, handle: Box<dyn AckHandle>) -> ForwardReport {
        let report = self.process(&message).await;
        drop(message);

        let settled = match report.decision {
            Decision::Ack => handle.ack().await,
            Decision::Nack => handle.nack().await,
        };
        if let Err(e) = settled {
            warn!(
                message_id = %report.message_id,
                decision = %report.decision,
                error = %e,
                "Failed to settle message"
            );
        }

        log_report(&report);
        report
    }

    /// Pull from `subscription` until it closes or the cancellation token
    /// fires, then wait for the messages still in flight.
    ///
    /// # Errors
    ///
    /// Returns the subscription's error if pulling fails with a fatal error.
    /// Messages already in flight are settled before returning.
    pub async fn run<S>(&self, subscription: &mut S) -> Result<ForwardStats>
    where
        S: Subscription + ?Sized,
    {
        info!(
            subscription = subscription.name(),
            endpoint = %self.endpoint,
            max_outstanding = self.max_outstanding,
            "Listening subscription"
        );

        let permits = Arc::new(Semaphore::new(self.max_outstanding));
        let mut tasks = JoinSet::new();
        let mut stats = ForwardStats::default();
        let mut failure = None;

        loop {
            while let Some(done) = tasks.try_join_next() {
                record_task(&mut stats, done);
            }

            let permit = tokio::select! {
                _ = self.cln_token.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let received = tokio::select! {
                _ = self.cln_token.cancelled() => break,
                received = subscription.receive() => received,
            };

            let Received { message, handle } = match received {
                Some(Ok(received)) => received,
                Some(Err(e)) if e.is_fatal() => {
                    error!(error = %e, "Subscription failed");
                    failure = Some(e);
                    break;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Error while pulling, continuing");
                    continue;
                }
                None => {
                    info!(subscription = subscription.name(), "Subscription closed");
                    break;
                }
            };

            debug!(message_id = %message.id, bytes = message.data.len(), "Received message");
            let forwarder = self.clone();
            tasks.spawn(async move {
                let _permit = permit;
                forwarder.forward(message, handle).await.decision
            });
        }

        debug!(in_flight = tasks.len(), "Waiting for in-flight messages");
        while let Some(done) = tasks.join_next().await {
            record_task(&mut stats, done);
        }

        info!(acked = stats.acked, nacked = stats.nacked, "Forwarder stopped");
        match failure {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }

    /// Token that stops the receive loop and aborts in-flight deliveries.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cln_token
    }

    /// Endpoint the envelopes are posted to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn report(
        &self,
        message: &Message,
        envelope_len: usize,
        status: Option<u16>,
        decision: Decision,
        error: Option<PushError>,
    ) -> ForwardReport {
        ForwardReport {
            message_id: message.id.clone(),
            envelope_len,
            endpoint: self.endpoint.to_string(),
            status,
            decision,
            error,
        }
    }
}

fn record_task(stats: &mut ForwardStats, done: std::result::Result<Decision, tokio::task::JoinError>) {
    match done {
        Ok(decision) => stats.record(decision),
        Err(e) => error!(error = ?e, "Forwarding task failed"),
    }
}

fn log_report(report: &ForwardReport) {
    match (report.status, &report.error) {
        (Some(status), None) => info!(
            message_id = %report.message_id,
            bytes = report.envelope_len,
            endpoint = %report.endpoint,
            status,
            decision = %report.decision,
            "Message with {} bytes was sent to {}, got HTTP {}. Message: {}",
            report.envelope_len,
            report.endpoint,
            status,
            report.decision
        ),
        (Some(status), Some(_)) => warn!(
            message_id = %report.message_id,
            bytes = report.envelope_len,
            endpoint = %report.endpoint,
            status,
            decision = %report.decision,
            "Message with {} bytes was sent to {}, got HTTP {}. Message: {}",
            report.envelope_len,
            report.endpoint,
            status,
            report.decision
        ),
        (None, error) => warn!(
            message_id = %report.message_id,
            bytes = report.bytes_sent(),
            endpoint = %report.endpoint,
            error = ?error,
            decision = %report.decision,
            "Message could not be sent to {}. Message: {}",
            report.endpoint,
            report.decision
        ),
    }
}
