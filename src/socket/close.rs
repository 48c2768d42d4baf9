//! Close codes reported in `close` and `error` events.

use derive_more::{Display, From, Into};

/// Numeric code carried by a close event.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash, From, Into)]
pub struct CloseCode(u16);

impl CloseCode {
    /// Orderly shutdown, including the remote peer closing the channel.
    pub const NORMAL: Self = Self(1000);
    /// Default for errors raised by this side.
    pub const APPLICATION_ERROR: Self = Self(4000);
    /// The remote side refused the connection; reconnecting will not help.
    pub const UNRECOVERABLE: Self = Self(4400);
    /// ICE connectivity was lost.
    pub const CONNECTION_LOST: Self = Self(4444);

    #[must_use]
    pub const fn new(code: u16) -> Self { Self(code) }

    #[must_use]
    pub const fn get(self) -> u16 { self.0 }

    #[must_use]
    pub const fn is_normal(self) -> bool { self.0 == Self::NORMAL.0 }
}
