//! Socket lifecycle states.

use std::sync::atomic::{AtomicU8, Ordering};

/// Connection state exposed through [`crate::PeerSocket::ready_state`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ReadyState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for ReadyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// Atomic state that only ever moves forward.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) const fn new() -> Self { Self(AtomicU8::new(ReadyState::Connecting as u8)) }

    pub(crate) fn get(&self) -> ReadyState { ReadyState::from_u8(self.0.load(Ordering::Acquire)) }

    /// Move from `from` to `to`, returning whether this call made the change.
    pub(crate) fn transition(&self, from: ReadyState, to: ReadyState) -> bool {
        debug_assert!(from < to, "state transitions must move forward");
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Enter `Closing` from `Connecting` or `Open`.
    ///
    /// Returns `false` if another caller already started closing.
    pub(crate) fn begin_close(&self) -> bool {
        self.transition(ReadyState::Connecting, ReadyState::Closing)
            || self.transition(ReadyState::Open, ReadyState::Closing)
    }

    /// Enter the terminal `Closed` state.
    pub(crate) fn finish_close(&self) -> bool {
        self.transition(ReadyState::Closing, ReadyState::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_starts_once() {
        let state = StateCell::new();
        assert!(state.begin_close());
        assert!(!state.begin_close());
        assert!(state.finish_close());
        assert!(!state.finish_close());
        assert_eq!(state.get(), ReadyState::Closed);
    }

    #[test]
    fn open_cannot_follow_close() {
        let state = StateCell::new();
        assert!(state.begin_close());
        assert!(!state.transition(ReadyState::Connecting, ReadyState::Open));
        assert_eq!(state.get(), ReadyState::Closing);
    }

    #[test]
    fn open_socket_can_close() {
        let state = StateCell::new();
        assert!(state.transition(ReadyState::Connecting, ReadyState::Open));
        assert!(state.begin_close());
        assert_eq!(state.get(), ReadyState::Closing);
    }
}
