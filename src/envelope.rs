//! Operation envelope shared by both peers.
//!
//! Messages are JSON objects of the form `{"type": ..., "payload": ...}`.
//! The socket only inspects the envelope of the first inbound message, to
//! recognise a remote rejection of the connection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope type the remote side sends when it refuses the connection.
pub const CONNECTION_ERROR: &str = "connection_error";

/// Loosely typed envelope; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,
}

impl Envelope {
    /// Parse `text` as an envelope, returning `None` when it has no `type`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> { serde_json::from_str(text).ok() }
}

/// Remote refusal carried by a `connection_error` envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionRejection {
    payload: Value,
}

impl ConnectionRejection {
    /// Detect a rejection in the first inbound message.
    ///
    /// ```
    /// use peerframe::envelope::ConnectionRejection;
    ///
    /// let text = r#"{"type":"connection_error","payload":{"message":"Invite expired"}}"#;
    /// let rejection = ConnectionRejection::detect(text).expect("rejection");
    /// assert_eq!(rejection.message(), "Invite expired");
    /// assert!(ConnectionRejection::detect(r#"{"type":"connection_ack"}"#).is_none());
    /// ```
    #[must_use]
    pub fn detect(text: &str) -> Option<Self> {
        Envelope::parse(text)
            .filter(|envelope| envelope.msg_type == CONNECTION_ERROR)
            .map(|envelope| Self {
                payload: envelope.payload,
            })
    }

    #[must_use]
    pub fn payload(&self) -> &Value { &self.payload }

    /// Human-readable reason, taken from `payload.message` when present.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.payload {
            Value::String(message) => message.clone(),
            Value::Object(fields) => match fields.get("message") {
                Some(Value::String(message)) => message.clone(),
                _ => self.payload.to_string(),
            },
            Value::Null => String::from("connection rejected by peer"),
            other => other.to_string(),
        }
    }
}
