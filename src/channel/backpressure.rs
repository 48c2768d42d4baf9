//! Threshold-based backpressure for data channel writes.

use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ChannelError, DataChannel};
use crate::metrics::{self, Direction};

/// Writes frames to a [`DataChannel`], pausing while its buffer is full.
///
/// Before each frame the writer compares the channel's buffered amount with
/// the low-water threshold. At or above the threshold it waits for the
/// channel's buffered-amount-low signal, so at most one threshold's worth of
/// bytes sits in the channel at any time.
#[derive(Clone)]
pub struct FrameWriter {
    channel: Arc<dyn DataChannel>,
    threshold: usize,
}

impl FrameWriter {
    #[must_use]
    pub fn new(channel: Arc<dyn DataChannel>, threshold: usize) -> Self {
        Self { channel, threshold }
    }

    #[must_use]
    pub fn threshold(&self) -> usize { self.threshold }

    /// Write one frame once the channel has drained below the threshold.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Cancelled`] if `shutdown` fires while waiting
    /// and propagates any error from the channel itself.
    pub async fn write(
        &self,
        frame: Bytes,
        shutdown: &CancellationToken,
    ) -> Result<(), ChannelError> {
        while self.channel.buffered_amount() >= self.threshold {
            debug!(
                buffered = self.channel.buffered_amount(),
                threshold = self.threshold,
                "data channel saturated; waiting for it to drain"
            );
            tokio::select! {
                biased;
                () = shutdown.cancelled() => return Err(ChannelError::Cancelled),
                () = self.channel.buffered_amount_low() => {}
            }
        }
        if shutdown.is_cancelled() {
            return Err(ChannelError::Cancelled);
        }
        self.channel.send(frame).await?;
        metrics::inc_frames(Direction::Outbound);
        Ok(())
    }

    /// Write every frame of a message in order.
    ///
    /// # Errors
    ///
    /// Stops at the first failed write; see [`FrameWriter::write`].
    pub async fn write_all(
        &self,
        frames: Vec<Bytes>,
        shutdown: &CancellationToken,
    ) -> Result<(), ChannelError> {
        for frame in frames {
            self.write(frame, shutdown).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for FrameWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}
