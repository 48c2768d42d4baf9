//! Capabilities the transport consumes from a peer-to-peer stack.
//!
//! The socket never talks to a concrete WebRTC implementation. Instead it
//! drives a [`PeerConnection`] obtained from a [`PeerFactory`] and writes
//! frames through the connection's [`DataChannel`]. Connection state and
//! inbound datagrams are surfaced as a stream of [`PeerEvent`]s.

mod backpressure;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use backpressure::FrameWriter;

/// Role of a session description in the offer/answer exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// Session description exchanged through signalling.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    #[must_use]
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    #[must_use]
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// Remote ICE candidate returned alongside the answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_mline_index: Option<u16>,
}

impl IceCandidate {
    #[must_use]
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_mline_index: None,
        }
    }
}

/// STUN or TURN server offered to the peer connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// ICE connection states reported by the peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IceConnectionState {
    New,
    Checking,
    Connected,
    Completed,
    Disconnected,
    Failed,
    Closed,
}

/// Notifications emitted by a [`PeerConnection`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerEvent {
    /// The data channel is open.
    Connected,
    /// One datagram from the remote side.
    Data(Bytes),
    IceStateChange(IceConnectionState),
    /// The peer reported an error; the connection is unusable.
    Error(String),
    /// The remote side or the stack closed the connection.
    Closed,
}

/// Construction parameters for a peer connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerConfig {
    /// Whether this side creates the offer.
    pub initiator: bool,
    /// Whether ICE candidates are trickled instead of bundled with the SDP.
    pub trickle: bool,
    pub ice_servers: Vec<IceServer>,
    /// Open the data channel with ordered, reliable delivery.
    pub ordered: bool,
    /// Buffered amount below which the channel reports it has drained.
    pub buffered_amount_low_threshold: usize,
}

/// Errors raised by a data channel write.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel is no longer open.
    #[error("data channel closed")]
    Closed,
    /// The write was abandoned because the socket is shutting down.
    #[error("data channel write cancelled")]
    Cancelled,
    /// The underlying stack rejected the datagram.
    #[error("data channel send failed: {0}")]
    Send(String),
}

/// Errors raised by the peer connection primitive.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PeerError {
    #[error("failed to create peer connection: {0}")]
    Create(String),
    #[error("failed to create offer: {0}")]
    Offer(String),
    #[error("failed to apply answer: {0}")]
    Answer(String),
    #[error("failed to add ICE candidate: {0}")]
    Candidate(String),
    /// An error reported asynchronously by the peer.
    #[error("{0}")]
    Remote(String),
}

/// Outbound half of the peer's data channel.
#[async_trait]
pub trait DataChannel: Send + Sync {
    /// Queue one datagram for transmission.
    async fn send(&self, datagram: Bytes) -> Result<(), ChannelError>;

    /// Bytes queued by the channel but not yet transmitted.
    fn buffered_amount(&self) -> usize;

    /// Resolve once the buffered amount drops below the configured low
    /// threshold. Resolves immediately if it already is below it.
    async fn buffered_amount_low(&self);
}

/// A single peer-to-peer connection.
///
/// Owned exclusively by the socket's driver task.
#[async_trait]
pub trait PeerConnection: Send {
    /// Produce the local offer.
    async fn create_offer(&mut self) -> Result<SessionDescription, PeerError>;

    async fn apply_answer(&mut self, answer: SessionDescription) -> Result<(), PeerError>;

    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<(), PeerError>;

    /// Next event from the connection, or `None` once it is gone.
    ///
    /// Must be cancellation safe.
    async fn next_event(&mut self) -> Option<PeerEvent>;

    /// Handle for writing datagrams; shared with the writer task.
    fn data_channel(&self) -> Arc<dyn DataChannel>;

    /// Release the connection.
    async fn close(&mut self);
}

/// Creates peer connections for new sockets.
#[async_trait]
pub trait PeerFactory: Send + Sync {
    /// Create a peer configured by `config`.
    async fn create(&self, config: PeerConfig) -> Result<Box<dyn PeerConnection>, PeerError>;
}
