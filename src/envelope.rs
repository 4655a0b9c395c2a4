//! Push envelope encoding.
//!
//! A push subscription delivers each message as a JSON document wrapping the
//! message in a `message` field, with the payload base64-armored:
//!
//! ```text
//! {"message":{"messageId":"m1","data":"aGVsbG8=","attributes":{"k":"v"}}}
//! ```
//!
//! | Field | Content |
//! |-------|---------|
//! | `messageId` | message id, verbatim |
//! | `data` | standard base64 (padded) of the payload, `""` when empty |
//! | `attributes` | attribute map in ascending key order, `{}` when empty |
//!
//! Attributes are always written, even when empty, and keys are sorted so
//! that the same message always encodes to the same bytes.
//!
//! # Examples
//!
//! ```
//! use pubsub_push::{envelope, Message};
//!
//! let msg = Message::new("m1", "hello").with_attribute("k", "v");
//! let encoded = envelope::encode(&msg).unwrap();
//! assert_eq!(
//!     encoded.as_bytes(),
//!     br#"{"message":{"messageId":"m1","data":"aGVsbG8=","attributes":{"k":"v"}}}"#
//! );
//! ```

use crate::error::{PushError, Result};
use crate::types::Message;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// The JSON document posted to the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEnvelope {
    /// The wrapped message
    pub message: PushMessage,
}

/// The `message` record of a [`PushEnvelope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    /// Message id
    pub message_id: String,
    /// Base64 of the payload
    pub data: String,
    /// Message attributes
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attributes: BTreeMap<String, String>,
}

// Other push producers write `null` for a message without attributes.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<&Message> for PushEnvelope {
    fn from(message: &Message) -> Self {
        PushEnvelope {
            message: PushMessage {
                message_id: message.id.clone(),
                data: STANDARD.encode(&message.data),
                attributes: message
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            },
        }
    }
}

/// Serialized envelope, ready to be used as a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedEnvelope {
    body: Bytes,
}

impl EncodedEnvelope {
    /// Length of the body in bytes.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Always false for a successfully encoded envelope.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Borrow the serialized bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.body
    }

    /// Take the body. Cloning the returned `Bytes` is cheap.
    pub fn into_body(self) -> Bytes {
        self.body
    }
}

/// Encode a message into its push envelope.
///
/// # Errors
///
/// Returns [`PushError::Encoding`] if serialization fails. The message must
/// then be rejected without attempting delivery.
pub fn encode(message: &Message) -> Result<EncodedEnvelope> {
    let body = serde_json::to_vec(&PushEnvelope::from(message))?;
    Ok(EncodedEnvelope {
        body: Bytes::from(body),
    })
}

/// Decode a push envelope back into a message.
///
/// Endpoints use this to unwrap what [`encode`] produced.
///
/// # Errors
///
/// Returns [`PushError::Encoding`] if the body is not a push envelope or if
/// `data` is not valid base64.
pub fn decode(body: &[u8]) -> Result<Message> {
    let envelope: PushEnvelope = serde_json::from_slice(body)?;
    let data = STANDARD
        .decode(envelope.message.data.as_bytes())
        .map_err(|e| PushError::Encoding(format!("Invalid base64 data: {}", e)))?;

    Ok(Message {
        id: envelope.message.message_id,
        data: Bytes::from(data),
        attributes: envelope.message.attributes.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_encode_hello() {
        let msg = Message::new("m1", "hello").with_attribute("k", "v");
        let encoded = encode(&msg).unwrap();
        assert_eq!(
            encoded.as_bytes(),
            br#"{"message":{"messageId":"m1","data":"aGVsbG8=","attributes":{"k":"v"}}}"#
        );
        assert_eq!(encoded.len(), encoded.as_bytes().len());
        assert!(!encoded.is_empty());
    }

    #[test]
    fn test_encode_empty_message() {
        let msg = Message::new("", Bytes::new());
        let encoded = encode(&msg).unwrap();
        assert_eq!(
            encoded.as_bytes(),
            br#"{"message":{"messageId":"","data":"","attributes":{}}}"#
        );
    }

    #[test]
    fn test_encode_is_deterministic() {
        let msg = Message::new("m3", "payload")
            .with_attribute("zeta", "1")
            .with_attribute("alpha", "2")
            .with_attribute("mid", "3")
            .with_attribute("beta", "4");
        let first = encode(&msg).unwrap();
        let second = encode(&msg).unwrap();
        assert_eq!(first, second);

        let json = std::str::from_utf8(first.as_bytes()).unwrap();
        let alpha = json.find("alpha").unwrap();
        let zeta = json.find("zeta").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn test_encode_preserves_fields() {
        let payload: Vec<u8> = (0..=255).collect();
        let msg = Message::new("binary-1", payload.clone())
            .with_attribute("content-type", "application/octet-stream")
            .with_attribute("unicode", "h\u{e9}llo \"quoted\"");

        let encoded = encode(&msg).unwrap();
        let value: Value = serde_json::from_slice(encoded.as_bytes()).unwrap();
        assert_eq!(value["message"]["messageId"], "binary-1");
        assert_eq!(
            STANDARD
                .decode(value["message"]["data"].as_str().unwrap())
                .unwrap(),
            payload
        );
        assert_eq!(value["message"]["attributes"]["unicode"], "h\u{e9}llo \"quoted\"");

        let decoded = decode(encoded.as_bytes()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_decode_null_attributes() {
        let msg = decode(br#"{"message":{"messageId":"m1","data":"aGk=","attributes":null}}"#)
            .unwrap();
        assert_eq!(msg.data, Bytes::from_static(b"hi"));
        assert!(msg.attributes.is_empty());
    }

    #[test]
    fn test_decode_missing_attributes() {
        let msg = decode(br#"{"message":{"messageId":"m1","data":""}}"#).unwrap();
        assert!(msg.data.is_empty());
        assert!(msg.attributes.is_empty());
    }

    #[test]
    fn test_decode_invalid_base64() {
        let err = decode(br#"{"message":{"messageId":"m1","data":"***"}}"#).unwrap_err();
        assert!(matches!(err, PushError::Encoding(_)));
    }

    #[test]
    fn test_decode_not_an_envelope() {
        let err = decode(b"not json").unwrap_err();
        assert!(matches!(err, PushError::Encoding(_)));
    }
}
