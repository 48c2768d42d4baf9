//! Reassembly for channels that deliver frames once and in order.
//!
//! Frames of one message arrive back to back, so a single in-progress
//! message is enough: payloads are appended until the declared total is
//! reached. Any frame that breaks the sequence discards the message in
//! progress.

use std::num::NonZeroUsize;

use super::{
    FragmentIndex,
    FrameHeader,
    FrameStatus,
    MessageId,
    ReassemblyError,
    SeriesError,
    assembly::PartsBuilder,
};
use crate::LogicalMessage;

/// Tracks the expected ordering of frames for a single message.
///
/// # Examples
///
/// ```
/// use peerframe::fragment::{
///     DeliveryMode, FragmentIndex, FrameHeader, FrameSeries, FrameStatus, MessageId, PartTag,
/// };
/// let header = |index| {
///     FrameHeader::new(
///         MessageId::new(99),
///         FragmentIndex::new(index),
///         2,
///         DeliveryMode::ReliableOrdered,
///         PartTag::Text,
///     )
/// };
/// let mut series = FrameSeries::new(MessageId::new(99), 2);
/// assert_eq!(series.accept(&header(0)), Ok(FrameStatus::Incomplete));
/// assert_eq!(series.accept(&header(1)), Ok(FrameStatus::Complete));
/// assert!(series.is_complete());
/// ```
#[derive(Clone, Debug)]
pub struct FrameSeries {
    message_id: MessageId,
    total: u32,
    next_index: FragmentIndex,
    complete: bool,
}

impl FrameSeries {
    /// Create a series for `message_id` expecting `total` frames.
    #[must_use]
    pub const fn new(message_id: MessageId, total: u32) -> Self {
        Self {
            message_id,
            total,
            next_index: FragmentIndex::zero(),
            complete: false,
        }
    }

    #[must_use]
    pub const fn message_id(&self) -> MessageId { self.message_id }

    #[must_use]
    pub const fn is_complete(&self) -> bool { self.complete }

    /// Accept a frame and advance the expected index.
    ///
    /// Repeating an already accepted index yields [`FrameStatus::Duplicate`]
    /// and leaves the series untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError`] when the frame belongs to another message,
    /// declares a different total, skips ahead, or arrives after completion.
    pub fn accept(&mut self, header: &FrameHeader) -> Result<FrameStatus, SeriesError> {
        if header.message_id() != self.message_id {
            return Err(SeriesError::MessageMismatch {
                expected: self.message_id,
                found: header.message_id(),
            });
        }
        if header.total() != self.total {
            return Err(SeriesError::TotalMismatch {
                expected: self.total,
                found: header.total(),
            });
        }
        if self.complete {
            return Err(SeriesError::SeriesComplete);
        }
        if header.index() < self.next_index {
            return Ok(FrameStatus::Duplicate);
        }
        if header.index() > self.next_index {
            return Err(SeriesError::IndexMismatch {
                expected: self.next_index,
                found: header.index(),
            });
        }

        if header.is_last() {
            self.complete = true;
            return Ok(FrameStatus::Complete);
        }
        // Not the last index, so it is below `total` and cannot overflow.
        self.next_index = header.index().checked_increment().unwrap_or(self.next_index);
        Ok(FrameStatus::Incomplete)
    }
}

#[derive(Debug)]
struct InProgress {
    series: FrameSeries,
    parts: PartsBuilder,
}

/// Append-until-total reassembly state.
#[derive(Debug)]
pub(crate) struct OrderedAssembly {
    max_message_size: NonZeroUsize,
    current: Option<InProgress>,
}

impl OrderedAssembly {
    pub(crate) fn new(max_message_size: NonZeroUsize) -> Self {
        Self {
            max_message_size,
            current: None,
        }
    }

    pub(crate) fn push(
        &mut self,
        header: &FrameHeader,
        payload: &[u8],
    ) -> Result<Option<LogicalMessage>, ReassemblyError> {
        let mut in_progress = self.current.take().unwrap_or_else(|| InProgress {
            series: FrameSeries::new(header.message_id(), header.total()),
            parts: PartsBuilder::new(header.message_id(), self.max_message_size),
        });

        let message_id = in_progress.series.message_id();
        let status = in_progress
            .series
            .accept(header)
            .map_err(|source| ReassemblyError::Series { message_id, source })?;

        match status {
            FrameStatus::Duplicate => {
                self.current = Some(in_progress);
                Ok(None)
            }
            FrameStatus::Incomplete => {
                in_progress.parts.append(header.part(), payload)?;
                self.current = Some(in_progress);
                Ok(None)
            }
            FrameStatus::Complete => {
                in_progress.parts.append(header.part(), payload)?;
                in_progress.parts.finish().map(Some)
            }
        }
    }

    pub(crate) fn is_idle(&self) -> bool { self.current.is_none() }
}
