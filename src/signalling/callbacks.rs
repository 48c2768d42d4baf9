//! One-shot notifications about the outcome of establishment.

use std::fmt;

use super::EstablishError;

type SuccessCallback = Box<dyn FnOnce() + Send>;
type ErrorCallback = Box<dyn FnOnce(&EstablishError) + Send>;

/// Success and error hooks, exactly one of which fires.
///
/// Both notify methods consume the callbacks, so a second outcome cannot be
/// reported.
#[derive(Default)]
pub struct SignallingCallbacks {
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

impl SignallingCallbacks {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn on_success(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    #[must_use]
    pub fn on_error(mut self, callback: impl FnOnce(&EstablishError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Report a connected peer.
    pub fn succeeded(self) {
        if let Some(callback) = self.on_success {
            callback();
        }
    }

    /// Report a failed establishment.
    pub fn failed(self, error: &EstablishError) {
        if let Some(callback) = self.on_error {
            callback(error);
        }
    }
}

impl fmt::Debug for SignallingCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignallingCallbacks")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
