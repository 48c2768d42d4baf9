//! Utilities for working with panic payloads.
//!
//! Listener callbacks run inside `catch_unwind`; these helpers turn the
//! captured payload into text for the close reason and the log line.

use std::{
    any::Any,
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
};

/// Wrapper that formats a panic payload when logged or displayed.
///
/// The payload is downcast to `String` or `&'static str` if possible and falls
/// back to `Debug` formatting otherwise.
///
/// ```
/// use peerframe::panic::format_panic;
/// assert_eq!(format_panic(Box::new("boom")).to_string(), "boom");
/// assert_eq!(
///     format_panic(Box::new(String::from("boom"))).to_string(),
///     "boom"
/// );
/// assert!(format_panic(Box::new(5_u32)).to_string().contains("Any"));
/// ```
#[derive(Debug)]
#[must_use]
pub struct PanicMessage(Box<dyn Any + Send>);

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(s) = self.0.downcast_ref::<String>() {
            f.write_str(s)
        } else if let Some(s) = self.0.downcast_ref::<&'static str>() {
            f.write_str(s)
        } else {
            write!(f, "{:?}", self.0)
        }
    }
}

/// Create a [`PanicMessage`] for the given payload.
pub fn format_panic(panic: Box<dyn Any + Send>) -> PanicMessage { PanicMessage(panic) }

/// Run `callback`, converting a panic into a [`PanicMessage`].
///
/// Listener state is discarded with the socket after a panic, so the closure
/// is treated as unwind safe.
pub(crate) fn catch_callback<R>(callback: impl FnOnce() -> R) -> Result<R, PanicMessage> {
    catch_unwind(AssertUnwindSafe(callback)).map_err(format_panic)
}

#[cfg(test)]
mod tests {
    use super::catch_callback;

    #[test]
    fn callback_result_passes_through() {
        assert_eq!(catch_callback(|| 7).ok(), Some(7));
    }

    #[test]
    fn panic_payload_becomes_text() {
        let message = catch_callback(|| -> u8 { panic!("listener exploded") })
            .expect_err("panic captured");
        assert_eq!(message.to_string(), "listener exploded");
    }
}
