//! Builders for the datagrams a remote peer would send.

use bytes::Bytes;
use peerframe::{Chunkifier, LogicalMessage, TransportConfig, envelope::CONNECTION_ERROR};

/// Frames carrying `message` under the limits in `config`.
///
/// # Panics
///
/// Panics if `config` is invalid or the message cannot be framed.
#[must_use]
pub fn message_frames(message: &LogicalMessage, config: &TransportConfig) -> Vec<Bytes> {
    let fragmentation = config.fragmentation().expect("valid transport config");
    Chunkifier::new(fragmentation.frame_payload_cap, config.delivery_mode)
        .chunk(message)
        .expect("chunk message")
        .encode()
        .expect("encode frames")
}

/// Frames carrying `text` without attachments.
///
/// # Panics
///
/// Panics if `config` is invalid.
#[must_use]
pub fn text_frames(text: &str, config: &TransportConfig) -> Vec<Bytes> {
    message_frames(&LogicalMessage::new(text), config)
}

/// The envelope a remote peer sends to refuse the session.
#[must_use]
pub fn rejection(reason: &str) -> String {
    serde_json::json!({
        "type": CONNECTION_ERROR,
        "payload": { "message": reason },
    })
    .to_string()
}
