//! Metric helpers for `peerframe`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! every helper compiles to a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking open sockets.
pub const SOCKETS_OPEN: &str = "peerframe_sockets_open";
/// Name of the counter tracking frames crossing the data channel.
pub const FRAMES_PROCESSED: &str = "peerframe_frames_processed_total";
/// Name of the counter tracking logical messages delivered to listeners.
pub const MESSAGES_DELIVERED: &str = "peerframe_messages_delivered_total";
/// Name of the counter tracking partial messages evicted before completion.
pub const REASSEMBLY_EVICTIONS: &str = "peerframe_reassembly_evictions_total";
/// Name of the counter tracking frames rejected by the dechunkifier.
pub const DECODE_ERRORS: &str = "peerframe_decode_errors_total";
/// Name of the counter tracking listener panics.
pub const LISTENER_PANICS: &str = "peerframe_listener_panics_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Frames received from the remote peer.
    Inbound,
    /// Frames written to the data channel.
    Outbound,
}

impl Direction {
    #[cfg_attr(
        not(feature = "metrics"),
        expect(dead_code, reason = "labels are only read when metrics are recorded")
    )]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Increment the open sockets gauge.
pub fn inc_sockets() {
    #[cfg(feature = "metrics")]
    gauge!(SOCKETS_OPEN).increment(1.0);
}

/// Decrement the open sockets gauge.
pub fn dec_sockets() {
    #[cfg(feature = "metrics")]
    gauge!(SOCKETS_OPEN).decrement(1.0);
}

/// Record a processed frame for the given direction.
pub fn inc_frames(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_PROCESSED, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record a logical message handed to listeners.
pub fn inc_messages() {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_DELIVERED).increment(1);
}

/// Record a partial message evicted by timeout or the in-flight bound.
pub fn inc_evictions() {
    #[cfg(feature = "metrics")]
    counter!(REASSEMBLY_EVICTIONS).increment(1);
}

/// Record a frame the dechunkifier rejected.
pub fn inc_decode_errors() {
    #[cfg(feature = "metrics")]
    counter!(DECODE_ERRORS).increment(1);
}

/// Record a panic raised by an event listener.
pub fn inc_listener_panics() {
    #[cfg(feature = "metrics")]
    counter!(LISTENER_PANICS).increment(1);
}
