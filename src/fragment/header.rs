use bincode::{Decode, Encode};

use super::{DeliveryMode, FragmentIndex, MessageId};

/// The part of a logical message a frame's payload belongs to.
///
/// Frame payloads never straddle two parts, so the receiver can rebuild the
/// text and each attachment without scanning for separators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Encode, Decode)]
pub enum PartTag {
    /// The JSON text of the message.
    Text,
    /// Binary attachment at the given position.
    Attachment(u32),
}

/// Header carried in front of every frame payload.
///
/// # Examples
///
/// ```
/// use peerframe::fragment::{DeliveryMode, FragmentIndex, FrameHeader, MessageId, PartTag};
/// let header = FrameHeader::new(
///     MessageId::new(7),
///     FragmentIndex::new(1),
///     2,
///     DeliveryMode::ReliableOrdered,
///     PartTag::Text,
/// );
/// assert!(header.is_last());
/// assert_eq!(header.total(), 2);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Encode, Decode)]
pub struct FrameHeader {
    message_id: MessageId,
    index: FragmentIndex,
    total: u32,
    mode: DeliveryMode,
    part: PartTag,
}

impl FrameHeader {
    /// Create a new frame header.
    #[must_use]
    pub const fn new(
        message_id: MessageId,
        index: FragmentIndex,
        total: u32,
        mode: DeliveryMode,
        part: PartTag,
    ) -> Self {
        Self {
            message_id,
            index,
            total,
            mode,
            part,
        }
    }

    #[must_use]
    pub const fn message_id(&self) -> MessageId { self.message_id }

    /// Position of this frame within the message.
    #[must_use]
    pub const fn index(&self) -> FragmentIndex { self.index }

    /// Number of frames the whole message was split into.
    #[must_use]
    pub const fn total(&self) -> u32 { self.total }

    #[must_use]
    pub const fn mode(&self) -> DeliveryMode { self.mode }

    #[must_use]
    pub const fn part(&self) -> PartTag { self.part }

    /// Whether this frame carries the final index of its message.
    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.total > 0 && self.index.get() == self.total - 1
    }

    /// Whether the declared index fits inside the declared total.
    #[must_use]
    pub const fn is_in_range(&self) -> bool { self.index.get() < self.total }
}
