//! Limits used by the chunkifier and dechunkifier.

use std::{num::NonZeroUsize, time::Duration};

use super::frame_overhead;

/// Settings that bound frame sizes and reassembly resource usage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FragmentationConfig {
    /// Largest datagram the channel accepts, header included.
    pub max_frame_size: NonZeroUsize,
    /// Payload bytes carried by a single frame once the header is subtracted.
    pub frame_payload_cap: NonZeroUsize,
    /// Hard cap on a reassembled message, text and attachments together.
    pub max_message_size: NonZeroUsize,
    /// Age after which an incomplete unordered message is discarded.
    pub reassembly_timeout: Duration,
    /// Most incomplete unordered messages held at once.
    pub max_in_flight: NonZeroUsize,
}

impl FragmentationConfig {
    /// Derive a configuration from the channel's datagram limit.
    ///
    /// Returns `None` when `max_frame_size` cannot hold the frame header plus
    /// at least one payload byte.
    #[must_use]
    pub fn for_frame_budget(
        max_frame_size: NonZeroUsize,
        max_message_size: NonZeroUsize,
        reassembly_timeout: Duration,
        max_in_flight: NonZeroUsize,
    ) -> Option<Self> {
        let available = max_frame_size.get().checked_sub(frame_overhead().get())?;
        Some(Self {
            max_frame_size,
            frame_payload_cap: NonZeroUsize::new(available)?,
            max_message_size,
            reassembly_timeout,
            max_in_flight,
        })
    }

    /// Buffered-amount level at which outbound frames must pause.
    ///
    /// The channel is allowed to hold at most one frame's worth of bytes
    /// before the writer waits for it to drain.
    #[must_use]
    pub const fn low_water_threshold(&self) -> usize { self.max_frame_size.get() }
}
