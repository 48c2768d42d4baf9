//! Error and status types emitted by the frame codec.
//!
//! Every inbound failure names the message it belongs to when the header
//! could be read, so callers can tell which reassembly was discarded.

use std::num::NonZeroUsize;

use bincode::error::{DecodeError, EncodeError};
use thiserror::Error;

use super::{DeliveryMode, FragmentIndex, MessageId, PartTag};

/// Result of feeding a frame into an in-order series.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    /// The message still expects more frames.
    Incomplete,
    /// The frame completed the message.
    Complete,
    /// The frame repeated an index that was already accepted.
    Duplicate,
}

/// Sequencing violations detected while accepting frames.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SeriesError {
    /// The frame belongs to a different message than the one in progress.
    #[error("frame message mismatch: expected {expected}, found {found}")]
    MessageMismatch {
        expected: MessageId,
        found: MessageId,
    },
    /// A frame arrived ahead of the expected index.
    #[error("frame index mismatch: expected {expected}, found {found}")]
    IndexMismatch {
        expected: FragmentIndex,
        found: FragmentIndex,
    },
    /// Frames of one message disagree on the total frame count.
    #[error("frame total mismatch: expected {expected}, found {found}")]
    TotalMismatch { expected: u32, found: u32 },
    /// The series already consumed its final frame.
    #[error("frame series already complete")]
    SeriesComplete,
}

/// Errors produced while splitting outbound messages.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// The message needs more frames than a `u32` index can address.
    #[error("message requires {frames} frames, more than a frame index can address")]
    TooManyFrames { frames: usize },
    /// More attachments than a part tag can number.
    #[error("message carries {count} attachments, more than a part tag can number")]
    TooManyAttachments { count: usize },
    /// The frame header could not be encoded.
    #[error("failed to encode frame header: {0}")]
    Encode(#[from] EncodeError),
}

/// Errors raised while parsing a single datagram into a frame.
#[derive(Debug, Error)]
pub enum FrameDecodeError {
    /// The datagram does not start with the frame marker.
    #[error("datagram is missing the frame marker")]
    MissingMagic,
    /// The datagram ended before the advertised header.
    #[error("datagram truncated: {additional} more bytes expected")]
    Truncated { additional: usize },
    /// The header bytes could not be decoded.
    #[error("malformed frame header: {0}")]
    Header(#[from] DecodeError),
    /// The advertised header length disagrees with the decoded header.
    #[error("frame header length mismatch: advertised {advertised}, decoded {consumed}")]
    HeaderLengthMismatch { advertised: usize, consumed: usize },
    /// The datagram exceeds the configured frame size.
    #[error("frame of {len} bytes exceeds the {limit} byte frame limit")]
    Oversized { len: usize, limit: NonZeroUsize },
    /// The sequence index lies beyond the declared total.
    #[error("frame index {index} outside declared total {total} for message {message_id}")]
    IndexOutOfRange {
        message_id: MessageId,
        index: FragmentIndex,
        total: u32,
    },
}

/// Errors produced while reassembling inbound frames into messages.
#[derive(Debug, Error)]
pub enum ReassemblyError {
    /// The datagram could not be parsed as a frame.
    #[error(transparent)]
    Decode(#[from] FrameDecodeError),
    /// The frame was sent under the other delivery mode.
    #[error("message {message_id} sent as {found:?} but this socket expects {expected:?}")]
    ModeMismatch {
        message_id: MessageId,
        expected: DeliveryMode,
        found: DeliveryMode,
    },
    /// The frame violated the sequencing rules for its message.
    #[error("message {message_id}: {source}")]
    Series {
        message_id: MessageId,
        #[source]
        source: SeriesError,
    },
    /// The message would grow beyond the configured cap.
    #[error("message {message_id} too large: attempted {attempted} bytes (limit {limit})")]
    MessageTooLarge {
        message_id: MessageId,
        attempted: usize,
        limit: NonZeroUsize,
    },
    /// Parts arrived in an impossible order, e.g. an attachment before the text.
    #[error("message {message_id} has part {found:?} where {expected:?} was expected")]
    PartOrder {
        message_id: MessageId,
        expected: PartTag,
        found: PartTag,
    },
    /// The reassembled text is not valid UTF-8.
    #[error("message {message_id} text is not valid UTF-8")]
    InvalidText { message_id: MessageId },
}

impl ReassemblyError {
    /// Identifier of the message the failure is scoped to, when known.
    #[must_use]
    pub fn message_id(&self) -> Option<MessageId> {
        match self {
            Self::Decode(FrameDecodeError::IndexOutOfRange { message_id, .. }) => Some(*message_id),
            Self::Decode(_) => None,
            Self::ModeMismatch { message_id, .. }
            | Self::Series { message_id, .. }
            | Self::MessageTooLarge { message_id, .. }
            | Self::PartOrder { message_id, .. }
            | Self::InvalidText { message_id } => Some(*message_id),
        }
    }
}
