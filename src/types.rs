//! Core types shared by the encoder, the delivery client and the forwarder.

use crate::error::PushError;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;

/// A message pulled from the subscription.
///
/// Owned by the subscription collaborator; the forwarder only reads it and
/// drops it once the message has been acked or nacked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Server-assigned message id.
    pub id: String,
    /// Opaque payload.
    pub data: Bytes,
    /// Publisher attributes.
    pub attributes: HashMap<String, String>,
}

impl Message {
    /// Create a message with no attributes.
    pub fn new(id: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Message {
            id: id.into(),
            data: data.into(),
            attributes: HashMap::new(),
        }
    }

    /// Add one attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Response obtained from the push endpoint.
///
/// Only the status line matters; the body is never read into the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryResponse {
    /// HTTP status code
    pub status: u16,
}

impl DeliveryResponse {
    /// Whether the endpoint accepted the message.
    pub fn is_success(&self) -> bool {
        is_success_status(self.status)
    }
}

/// Check if a status code means the endpoint accepted the message.
///
/// Only 200-299 counts; redirects are not followed and reject the message.
pub fn is_success_status(status: u16) -> bool {
    (200..=299).contains(&status)
}

/// Terminal signal handed back to the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// The endpoint processed the message, remove it from redelivery.
    Ack,
    /// The message is eligible for redelivery or dead-lettering.
    Nack,
}

impl Decision {
    /// Classify a response status.
    pub fn from_status(status: u16) -> Self {
        if is_success_status(status) {
            Decision::Ack
        } else {
            Decision::Nack
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Ack => f.write_str("ACK"),
            Decision::Nack => f.write_str("NACK"),
        }
    }
}

/// Observability record of one forwarding attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardReport {
    /// Id of the forwarded message
    pub message_id: String,
    /// Size of the encoded envelope, zero when encoding failed
    pub envelope_len: usize,
    /// Endpoint the envelope was posted to
    pub endpoint: String,
    /// Status returned by the endpoint, if a response was received
    pub status: Option<u16>,
    /// Why the message was rejected, if it was
    pub error: Option<PushError>,
    /// Final decision
    pub decision: Decision,
}

impl ForwardReport {
    /// Bytes that reached the endpoint.
    ///
    /// Nothing is attributed to a send that never got a response.
    pub fn bytes_sent(&self) -> usize {
        if self.status.is_some() {
            self.envelope_len
        } else {
            0
        }
    }
}

/// Counters returned when the receive loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardStats {
    /// Messages acknowledged
    pub acked: u64,
    /// Messages rejected
    pub nacked: u64,
}

impl ForwardStats {
    pub(crate) fn record(&mut self, decision: Decision) {
        match decision {
            Decision::Ack => self.acked += 1,
            Decision::Nack => self.nacked += 1,
        }
    }

    /// Total number of messages that reached a decision.
    pub fn total(&self) -> u64 {
        self.acked + self.nacked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(is_success_status(200));
        assert!(is_success_status(204));
        assert!(is_success_status(299));
        assert!(!is_success_status(199));
        assert!(!is_success_status(300));
    }

    #[test]
    fn test_decision_from_status() {
        for status in [200, 201, 202, 204, 250, 299] {
            assert_eq!(Decision::from_status(status), Decision::Ack, "{status}");
        }
        for status in [0, 100, 101, 199, 300, 301, 304, 400, 404, 429, 500, 503, 600, 999] {
            assert_eq!(Decision::from_status(status), Decision::Nack, "{status}");
        }
    }

    #[test]
    fn test_decision_display() {
        assert_eq!(Decision::Ack.to_string(), "ACK");
        assert_eq!(Decision::Nack.to_string(), "NACK");
    }

    #[test]
    fn test_bytes_sent_without_response() {
        let report = ForwardReport {
            message_id: "m1".into(),
            envelope_len: 42,
            endpoint: "http://localhost/push".into(),
            status: None,
            error: Some(PushError::Delivery("connection refused".into())),
            decision: Decision::Nack,
        };
        assert_eq!(report.bytes_sent(), 0);

        let report = ForwardReport {
            status: Some(500),
            error: Some(PushError::UnacceptableStatus(500)),
            ..report
        };
        assert_eq!(report.bytes_sent(), 42);
    }

    #[test]
    fn test_stats() {
        let mut stats = ForwardStats::default();
        stats.record(Decision::Ack);
        stats.record(Decision::Nack);
        stats.record(Decision::Ack);
        assert_eq!(stats.acked, 2);
        assert_eq!(stats.nacked, 1);
        assert_eq!(stats.total(), 3);
    }

    #[test]
    fn test_message_builder() {
        let msg = Message::new("m1", "hello").with_attribute("k", "v");
        assert_eq!(msg.id, "m1");
        assert_eq!(msg.data, Bytes::from_static(b"hello"));
        assert_eq!(msg.attributes.get("k").map(String::as_str), Some("v"));
    }
}
