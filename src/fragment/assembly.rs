//! Accumulates frame payloads into the parts of a logical message.

use std::num::NonZeroUsize;

use bytes::{Bytes, BytesMut};

use super::{MessageId, PartTag, ReassemblyError};
use crate::LogicalMessage;

/// Bytes a stored frame counts against the message size cap.
///
/// Empty frames still cost one byte so a message cannot grow without bound.
pub(crate) fn charged_len(payload: &[u8]) -> usize { payload.len().max(1) }

/// Builds a [`LogicalMessage`] from payloads fed in frame-index order.
///
/// Parts must appear as text first, then attachments numbered from zero
/// without gaps.
#[derive(Debug)]
pub(crate) struct PartsBuilder {
    message_id: MessageId,
    limit: NonZeroUsize,
    text: BytesMut,
    attachments: Vec<BytesMut>,
    current: Option<PartTag>,
    len: usize,
}

impl PartsBuilder {
    pub(crate) fn new(message_id: MessageId, limit: NonZeroUsize) -> Self {
        Self {
            message_id,
            limit,
            text: BytesMut::new(),
            attachments: Vec::new(),
            current: None,
            len: 0,
        }
    }

    /// Append the payload of the next frame.
    pub(crate) fn append(&mut self, part: PartTag, payload: &[u8]) -> Result<(), ReassemblyError> {
        let attempted = self.len.saturating_add(charged_len(payload));
        if attempted > self.limit.get() {
            return Err(ReassemblyError::MessageTooLarge {
                message_id: self.message_id,
                attempted,
                limit: self.limit,
            });
        }

        if self.current != Some(part) {
            let expected = self.next_part();
            if part != expected {
                return Err(ReassemblyError::PartOrder {
                    message_id: self.message_id,
                    expected,
                    found: part,
                });
            }
            if part != PartTag::Text {
                self.attachments.push(BytesMut::new());
            }
            self.current = Some(part);
        }

        match (part, self.attachments.last_mut()) {
            (PartTag::Attachment(_), Some(attachment)) => attachment.extend_from_slice(payload),
            _ => self.text.extend_from_slice(payload),
        }
        self.len = attempted;
        Ok(())
    }

    /// Finish the message, validating the text as UTF-8.
    pub(crate) fn finish(self) -> Result<LogicalMessage, ReassemblyError> {
        let text = String::from_utf8(self.text.to_vec()).map_err(|_| {
            ReassemblyError::InvalidText {
                message_id: self.message_id,
            }
        })?;
        let attachments = self
            .attachments
            .into_iter()
            .map(BytesMut::freeze)
            .collect::<Vec<Bytes>>();
        Ok(LogicalMessage::with_attachments(text, attachments))
    }

    fn next_part(&self) -> PartTag {
        match self.current {
            None => PartTag::Text,
            Some(PartTag::Text) => PartTag::Attachment(0),
            Some(PartTag::Attachment(ordinal)) => PartTag::Attachment(ordinal.saturating_add(1)),
        }
    }
}
