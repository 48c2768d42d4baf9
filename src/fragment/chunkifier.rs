//! Outbound half of the codec: splits a logical message into frames.
//!
//! [`Chunkifier`] numbers frames across the whole message. The text part
//! comes first and each attachment follows as its own run of frames, so a
//! frame never mixes bytes from two parts. Every part yields at least one
//! frame, which means an empty text or attachment still produces an empty
//! frame that the receiver can account for.

use std::num::NonZeroUsize;

use bytes::Bytes;

use super::{
    ChunkError,
    DeliveryMode,
    FragmentIndex,
    FrameHeader,
    MessageId,
    PartTag,
    encode_frame,
    id::MessageIdSequence,
};
use crate::LogicalMessage;

/// Splits logical messages into frames for one socket.
#[derive(Debug)]
pub struct Chunkifier {
    payload_cap: NonZeroUsize,
    mode: DeliveryMode,
    ids: MessageIdSequence,
}

impl Chunkifier {
    /// Create a chunkifier whose frames carry at most `payload_cap` bytes.
    #[must_use]
    pub const fn new(payload_cap: NonZeroUsize, mode: DeliveryMode) -> Self {
        Self::with_starting_id(payload_cap, mode, MessageId::new(0))
    }

    /// Create a chunkifier whose first message uses `start_at`.
    #[must_use]
    pub const fn with_starting_id(
        payload_cap: NonZeroUsize,
        mode: DeliveryMode,
        start_at: MessageId,
    ) -> Self {
        Self {
            payload_cap,
            mode,
            ids: MessageIdSequence::starting_at(start_at),
        }
    }

    #[must_use]
    pub const fn payload_cap(&self) -> NonZeroUsize { self.payload_cap }

    #[must_use]
    pub const fn mode(&self) -> DeliveryMode { self.mode }

    /// Split `message` into frames under a fresh [`MessageId`].
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError`] when the message needs more frames or
    /// attachments than the header can describe.
    pub fn chunk(&self, message: &LogicalMessage) -> Result<FrameBatch, ChunkError> {
        self.chunk_with_id(self.ids.next(), message)
    }

    /// Split `message` into frames tagged with `message_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError`] when the message needs more frames or
    /// attachments than the header can describe.
    pub fn chunk_with_id(
        &self,
        message_id: MessageId,
        message: &LogicalMessage,
    ) -> Result<FrameBatch, ChunkError> {
        let parts = Self::parts(message)?;
        let cap = self.payload_cap.get();
        let frames_needed: usize = parts
            .iter()
            .map(|(_, bytes)| bytes.len().div_ceil(cap).max(1))
            .sum();
        let total = u32::try_from(frames_needed).map_err(|_| ChunkError::TooManyFrames {
            frames: frames_needed,
        })?;

        let mut frames = Vec::with_capacity(frames_needed);
        let mut index = FragmentIndex::zero();
        for (part, bytes) in parts {
            let mut offset = 0;
            loop {
                let end = (offset + cap).min(bytes.len());
                let header = FrameHeader::new(message_id, index, total, self.mode, part);
                frames.push(Frame::new(header, bytes.slice(offset..end)));
                // The index only overflows past the last frame, which `total` rules out.
                index = index.checked_increment().unwrap_or(index);
                offset = end;
                if offset >= bytes.len() {
                    break;
                }
            }
        }

        Ok(FrameBatch::new(message_id, frames))
    }

    fn parts(message: &LogicalMessage) -> Result<Vec<(PartTag, Bytes)>, ChunkError> {
        let mut parts = Vec::with_capacity(1 + message.attachments().len());
        parts.push((
            PartTag::Text,
            Bytes::copy_from_slice(message.text().as_bytes()),
        ));
        for (position, attachment) in message.attachments().iter().enumerate() {
            let ordinal = u32::try_from(position).map_err(|_| ChunkError::TooManyAttachments {
                count: message.attachments().len(),
            })?;
            parts.push((PartTag::Attachment(ordinal), attachment.clone()));
        }
        Ok(parts)
    }
}

/// Header and payload of a single outbound frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    header: FrameHeader,
    payload: Bytes,
}

impl Frame {
    #[must_use]
    pub fn new(header: FrameHeader, payload: Bytes) -> Self { Self { header, payload } }

    #[must_use]
    pub fn header(&self) -> &FrameHeader { &self.header }

    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }

    /// Encode the frame into a datagram ready for the channel.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::Encode`] if the header cannot be encoded.
    pub fn encode(&self) -> Result<Bytes, ChunkError> {
        Ok(encode_frame(self.header, &self.payload)?)
    }
}

/// Frames produced for one logical message, in transmission order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBatch {
    message_id: MessageId,
    frames: Vec<Frame>,
}

impl FrameBatch {
    fn new(message_id: MessageId, frames: Vec<Frame>) -> Self {
        debug_assert!(!frames.is_empty(), "frame batches must not be empty");
        Self { message_id, frames }
    }

    #[must_use]
    pub const fn message_id(&self) -> MessageId { self.message_id }

    #[must_use]
    pub fn frames(&self) -> &[Frame] { &self.frames }

    /// Number of frames in the batch.
    #[expect(
        clippy::len_without_is_empty,
        reason = "batches are guaranteed non-empty"
    )]
    #[must_use]
    pub fn len(&self) -> usize { self.frames.len() }

    /// Encode every frame into channel datagrams.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError::Encode`] if any header fails to encode.
    pub fn encode(&self) -> Result<Vec<Bytes>, ChunkError> {
        self.frames.iter().map(Frame::encode).collect()
    }
}

impl IntoIterator for FrameBatch {
    type Item = Frame;
    type IntoIter = std::vec::IntoIter<Frame>;

    fn into_iter(self) -> Self::IntoIter { self.frames.into_iter() }
}
