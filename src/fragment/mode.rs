use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// Delivery guarantees offered by the underlying data channel.
///
/// The mode is chosen once per socket and stamped on every frame so a peer
/// configured for the other mode rejects the traffic instead of silently
/// mis-assembling it.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Encode, Decode, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Frames arrive once and in transmission order.
    ReliableOrdered,
    /// Frames may arrive out of order or not at all.
    #[default]
    UnorderedUnreliable,
}

impl DeliveryMode {
    /// Whether the data channel should be opened with ordered delivery.
    #[must_use]
    pub const fn is_ordered(self) -> bool { matches!(self, Self::ReliableOrdered) }

    /// Short lowercase label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReliableOrdered => "reliable_ordered",
            Self::UnorderedUnreliable => "unordered_unreliable",
        }
    }
}
