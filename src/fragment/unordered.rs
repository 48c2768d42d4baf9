//! Reassembly for channels that may reorder or drop frames.
//!
//! Frames are parked by message id and index until the declared total is
//! present. Messages that never complete are evicted either when they grow
//! older than the reassembly timeout or when too many messages are in flight,
//! in which case the least recently touched one goes first.

use std::{
    collections::{BTreeMap, HashMap},
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use bytes::Bytes;
use log::debug;

use super::{
    FragmentIndex,
    FrameHeader,
    MessageId,
    PartTag,
    ReassemblyError,
    SeriesError,
    assembly::{PartsBuilder, charged_len},
};
use crate::LogicalMessage;

#[derive(Debug)]
struct SparseMessage {
    total: u32,
    frames: BTreeMap<FragmentIndex, (PartTag, Bytes)>,
    len: usize,
    started_at: Instant,
    touched_at: Instant,
}

impl SparseMessage {
    fn new(total: u32, now: Instant) -> Self {
        Self {
            total,
            frames: BTreeMap::new(),
            len: 0,
            started_at: now,
            touched_at: now,
        }
    }

    fn is_complete(&self) -> bool {
        u32::try_from(self.frames.len()).is_ok_and(|held| held == self.total)
    }
}

/// Out-of-order reassembly state with bounded buffering.
#[derive(Debug)]
pub(crate) struct UnorderedAssembly {
    max_message_size: NonZeroUsize,
    timeout: Duration,
    max_in_flight: NonZeroUsize,
    buffers: HashMap<MessageId, SparseMessage>,
}

impl UnorderedAssembly {
    pub(crate) fn new(
        max_message_size: NonZeroUsize,
        timeout: Duration,
        max_in_flight: NonZeroUsize,
    ) -> Self {
        Self {
            max_message_size,
            timeout,
            max_in_flight,
            buffers: HashMap::new(),
        }
    }

    /// Park a frame, returning the message once every index is present.
    ///
    /// The second element lists messages evicted to make room.
    pub(crate) fn push_at(
        &mut self,
        header: &FrameHeader,
        payload: &[u8],
        now: Instant,
    ) -> (Result<Option<LogicalMessage>, ReassemblyError>, Vec<MessageId>) {
        let mut evicted = self.purge_expired_at(now);
        let message_id = header.message_id();

        if header.total() == 1 {
            return (self.assemble_single(header, payload), evicted);
        }

        if !self.buffers.contains_key(&message_id) && self.buffers.len() >= self.max_in_flight.get()
        {
            evicted.extend(self.evict_least_recent());
        }

        let limit = self.max_message_size;
        let sparse = self
            .buffers
            .entry(message_id)
            .or_insert_with(|| SparseMessage::new(header.total(), now));
        let result = Self::park(limit, message_id, sparse, header, payload, now);

        let result = match result {
            Ok(true) => self.complete(message_id).map(Some),
            Ok(false) => Ok(None),
            Err(err) => {
                self.buffers.remove(&message_id);
                Err(err)
            }
        };
        (result, evicted)
    }

    /// Remove partial messages older than the reassembly timeout.
    pub(crate) fn purge_expired_at(&mut self, now: Instant) -> Vec<MessageId> {
        let mut evicted = Vec::new();
        let timeout = self.timeout;
        self.buffers.retain(|message_id, sparse| {
            let expired = now.saturating_duration_since(sparse.started_at) >= timeout;
            if expired {
                evicted.push(*message_id);
            }
            !expired
        });
        if !evicted.is_empty() {
            debug!("purged {} expired partial messages: {evicted:?}", evicted.len());
        }
        evicted
    }

    pub(crate) fn buffered_len(&self) -> usize { self.buffers.len() }

    fn assemble_single(
        &self,
        header: &FrameHeader,
        payload: &[u8],
    ) -> Result<Option<LogicalMessage>, ReassemblyError> {
        let mut parts = PartsBuilder::new(header.message_id(), self.max_message_size);
        parts.append(header.part(), payload)?;
        parts.finish().map(Some)
    }

    /// Returns `Ok(true)` once the message holds every index.
    fn park(
        limit: NonZeroUsize,
        message_id: MessageId,
        sparse: &mut SparseMessage,
        header: &FrameHeader,
        payload: &[u8],
        now: Instant,
    ) -> Result<bool, ReassemblyError> {
        if header.total() != sparse.total {
            return Err(ReassemblyError::Series {
                message_id,
                source: SeriesError::TotalMismatch {
                    expected: sparse.total,
                    found: header.total(),
                },
            });
        }
        if sparse.frames.contains_key(&header.index()) {
            return Ok(false);
        }

        let attempted = sparse.len.saturating_add(charged_len(payload));
        if attempted > limit.get() {
            return Err(ReassemblyError::MessageTooLarge {
                message_id,
                attempted,
                limit,
            });
        }

        sparse.frames.insert(
            header.index(),
            (header.part(), Bytes::copy_from_slice(payload)),
        );
        sparse.len = attempted;
        sparse.touched_at = now;
        Ok(sparse.is_complete())
    }

    fn complete(&mut self, message_id: MessageId) -> Result<LogicalMessage, ReassemblyError> {
        let Some(sparse) = self.buffers.remove(&message_id) else {
            return Err(ReassemblyError::Series {
                message_id,
                source: SeriesError::SeriesComplete,
            });
        };
        let mut parts = PartsBuilder::new(message_id, self.max_message_size);
        for (part, payload) in sparse.frames.into_values() {
            parts.append(part, &payload)?;
        }
        parts.finish()
    }

    fn evict_least_recent(&mut self) -> Option<MessageId> {
        let victim = self
            .buffers
            .iter()
            .min_by_key(|(_, sparse)| sparse.touched_at)
            .map(|(message_id, _)| *message_id)?;
        self.buffers.remove(&victim);
        debug!("evicted partial message {victim} to stay within the in-flight bound");
        Some(victim)
    }
}
