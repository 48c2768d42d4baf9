//! Inbound half of the codec: turns datagrams back into logical messages.
//!
//! [`Dechunkifier`] validates each datagram against the configured frame
//! size and delivery mode, then hands it to the mode-specific assembly. A
//! failure discards only the message the frame belonged to.

use std::time::Instant;

use super::{
    DeliveryMode,
    FragmentationConfig,
    FrameDecodeError,
    MessageId,
    ReassemblyError,
    decode_frame,
    ordered::OrderedAssembly,
    unordered::UnorderedAssembly,
};
use crate::{LogicalMessage, metrics};

#[derive(Debug)]
enum Assembly {
    Ordered(OrderedAssembly),
    Unordered(UnorderedAssembly),
}

/// Stateful reassembler for one socket.
#[derive(Debug)]
pub struct Dechunkifier {
    config: FragmentationConfig,
    mode: DeliveryMode,
    assembly: Assembly,
}

impl Dechunkifier {
    /// Create a dechunkifier for frames sent under `mode`.
    #[must_use]
    pub fn new(config: FragmentationConfig, mode: DeliveryMode) -> Self {
        let assembly = match mode {
            DeliveryMode::ReliableOrdered => {
                Assembly::Ordered(OrderedAssembly::new(config.max_message_size))
            }
            DeliveryMode::UnorderedUnreliable => Assembly::Unordered(UnorderedAssembly::new(
                config.max_message_size,
                config.reassembly_timeout,
                config.max_in_flight,
            )),
        };
        Self {
            config,
            mode,
            assembly,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> DeliveryMode { self.mode }

    /// Feed one datagram using the current time.
    ///
    /// Returns `Ok(Some(_))` when the datagram completes a message and
    /// `Ok(None)` while more frames are needed.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError`] when the datagram is malformed or violates
    /// the sequencing or size limits. The affected message is discarded.
    pub fn push(&mut self, datagram: &[u8]) -> Result<Option<LogicalMessage>, ReassemblyError> {
        self.push_at(datagram, Instant::now())
    }

    /// Feed one datagram using an explicit clock reading.
    ///
    /// The clock only matters for unordered reassembly, where it drives the
    /// eviction of stale partial messages.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError`] when the datagram is malformed or violates
    /// the sequencing or size limits. The affected message is discarded.
    pub fn push_at(
        &mut self,
        datagram: &[u8],
        now: Instant,
    ) -> Result<Option<LogicalMessage>, ReassemblyError> {
        if datagram.len() > self.config.max_frame_size.get() {
            return Err(FrameDecodeError::Oversized {
                len: datagram.len(),
                limit: self.config.max_frame_size,
            }
            .into());
        }
        let (header, payload) = decode_frame(datagram)?;
        if header.mode() != self.mode {
            return Err(ReassemblyError::ModeMismatch {
                message_id: header.message_id(),
                expected: self.mode,
                found: header.mode(),
            });
        }

        match &mut self.assembly {
            Assembly::Ordered(ordered) => ordered.push(&header, payload),
            Assembly::Unordered(unordered) => {
                let (result, evicted) = unordered.push_at(&header, payload, now);
                for _ in &evicted {
                    metrics::inc_evictions();
                }
                result
            }
        }
    }

    /// Drop partial messages older than the reassembly timeout.
    ///
    /// Returns the identifiers of the evicted messages. Ordered reassembly
    /// never times out, so the list is always empty in that mode.
    pub fn purge_expired_at(&mut self, now: Instant) -> Vec<MessageId> {
        match &mut self.assembly {
            Assembly::Ordered(_) => Vec::new(),
            Assembly::Unordered(unordered) => {
                let evicted = unordered.purge_expired_at(now);
                for _ in &evicted {
                    metrics::inc_evictions();
                }
                evicted
            }
        }
    }

    /// Number of partially received messages currently held.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        match &self.assembly {
            Assembly::Ordered(ordered) => usize::from(!ordered.is_idle()),
            Assembly::Unordered(unordered) => unordered.buffered_len(),
        }
    }
}
