//! Data channel double with a controllable send buffer.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use peerframe::channel::{ChannelError, DataChannel};
use tokio::sync::Notify;

#[derive(Default)]
struct State {
    sent: Vec<Bytes>,
    buffered: usize,
    holding: bool,
    failure: Option<ChannelError>,
}

/// In-memory [`DataChannel`] that records every datagram.
///
/// By default the channel drains instantly. After [`FakeDataChannel::hold`]
/// sent bytes accumulate in the buffered amount until
/// [`FakeDataChannel::drain`] releases them.
pub struct FakeDataChannel {
    state: Mutex<State>,
    threshold: usize,
    drained: Notify,
    sent: Notify,
}

impl FakeDataChannel {
    /// Create a channel reporting low once its buffer drops below
    /// `threshold`.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            state: Mutex::default(),
            threshold,
            drained: Notify::new(),
            sent: Notify::new(),
        }
    }

    /// Stop draining; later sends stay buffered.
    pub fn hold(&self) { self.lock().holding = true; }

    /// Release every buffered byte and resume draining instantly.
    pub fn drain(&self) {
        let mut state = self.lock();
        state.holding = false;
        state.buffered = 0;
        drop(state);
        self.drained.notify_waiters();
    }

    /// Make every later send fail with `error`.
    pub fn fail_with(&self, error: ChannelError) { self.lock().failure = Some(error); }

    #[must_use]
    pub fn threshold(&self) -> usize { self.threshold }

    /// Datagrams sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<Bytes> { self.lock().sent.clone() }

    /// Wait until at least `count` datagrams have been sent.
    pub async fn wait_for_sent(&self, count: usize) -> Vec<Bytes> {
        loop {
            let notified = self.sent.notified();
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            notified.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DataChannel for FakeDataChannel {
    async fn send(&self, datagram: Bytes) -> Result<(), ChannelError> {
        let mut state = self.lock();
        if let Some(error) = state.failure.clone() {
            return Err(error);
        }
        if state.holding {
            state.buffered += datagram.len();
        }
        state.sent.push(datagram);
        drop(state);
        self.sent.notify_waiters();
        Ok(())
    }

    fn buffered_amount(&self) -> usize { self.lock().buffered }

    async fn buffered_amount_low(&self) {
        loop {
            let notified = self.drained.notified();
            if self.buffered_amount() < self.threshold {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for FakeDataChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("FakeDataChannel")
            .field("sent", &state.sent.len())
            .field("buffered", &state.buffered)
            .field("holding", &state.holding)
            .finish_non_exhaustive()
    }
}
