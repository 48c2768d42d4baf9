//! The unit exchanged by sockets: JSON text plus binary attachments.

use bytes::Bytes;

/// A complete application message before fragmentation.
///
/// Attachments travel as their own frame sub-streams, so they are kept as raw
/// bytes rather than encoded into the text.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use peerframe::LogicalMessage;
///
/// let message = LogicalMessage::with_attachments("{}", vec![Bytes::from_static(b"png")]);
/// assert_eq!(message.text(), "{}");
/// assert_eq!(message.attachments().len(), 1);
/// assert_eq!(message.encoded_len(), 5);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogicalMessage {
    text: String,
    attachments: Vec<Bytes>,
}

impl LogicalMessage {
    /// Create a message without attachments.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
        }
    }

    /// Create a message carrying `attachments` in positional order.
    #[must_use]
    pub fn with_attachments(text: impl Into<String>, attachments: Vec<Bytes>) -> Self {
        Self {
            text: text.into(),
            attachments,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str { &self.text }

    #[must_use]
    pub fn attachments(&self) -> &[Bytes] { &self.attachments }

    /// Total payload bytes across the text and all attachments.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        self.text.len() + self.attachments.iter().map(Bytes::len).sum::<usize>()
    }

    /// Consume the message, returning the text and attachments.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<Bytes>) { (self.text, self.attachments) }
}

impl From<String> for LogicalMessage {
    fn from(text: String) -> Self { Self::new(text) }
}

impl From<&str> for LogicalMessage {
    fn from(text: &str) -> Self { Self::new(text) }
}
