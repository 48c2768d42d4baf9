use std::sync::atomic::{AtomicU64, Ordering};

use bincode::{Decode, Encode};
use derive_more::{Display, From, Into};

/// Identifier shared by every frame of one logical message.
///
/// # Examples
///
/// ```
/// use peerframe::fragment::MessageId;
/// let id = MessageId::new(42);
/// assert_eq!(id.get(), 42);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Encode, Decode, Display, From, Into)]
#[display("{_0}")]
pub struct MessageId(u64);

impl MessageId {
    /// Create a new identifier.
    #[must_use]
    pub const fn new(value: u64) -> Self { Self(value) }

    /// Return the inner numeric identifier.
    #[must_use]
    pub const fn get(self) -> u64 { self.0 }
}

/// Hands out fresh [`MessageId`]s for one sending socket.
///
/// The counter wraps at `u64::MAX`; a socket would have to send that many
/// messages before an identifier repeats.
#[derive(Debug)]
pub(crate) struct MessageIdSequence(AtomicU64);

impl MessageIdSequence {
    pub(crate) const fn starting_at(first: MessageId) -> Self { Self(AtomicU64::new(first.get())) }

    pub(crate) fn next(&self) -> MessageId { MessageId::new(self.0.fetch_add(1, Ordering::Relaxed)) }
}
