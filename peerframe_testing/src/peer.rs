//! Scriptable peer connection.

use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use bytes::Bytes;
use peerframe::channel::{
    DataChannel,
    IceCandidate,
    IceConnectionState,
    PeerConfig,
    PeerConnection,
    PeerError,
    PeerEvent,
    PeerFactory,
    SessionDescription,
};
use tokio::sync::{Notify, mpsc};

use crate::FakeDataChannel;

#[derive(Default)]
struct Journal {
    config: Option<PeerConfig>,
    answers: Vec<SessionDescription>,
    candidates: Vec<IceCandidate>,
}

struct Shared {
    journal: Mutex<Journal>,
    events: Mutex<Option<mpsc::UnboundedSender<PeerEvent>>>,
    channel: Arc<FakeDataChannel>,
    closed: AtomicBool,
    closed_notify: Notify,
}

impl Shared {
    fn journal(&self) -> MutexGuard<'_, Journal> {
        self.journal.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a factory for one scripted peer and the controller that drives it.
///
/// The peer's data channel uses a 16 KiB low-water threshold; use
/// [`fake_peer_with_threshold`] to match a different frame size.
#[must_use]
pub fn fake_peer() -> (FakePeerFactory, PeerController) { fake_peer_with_threshold(16 * 1024) }

/// Like [`fake_peer`] with an explicit data channel threshold.
#[must_use]
pub fn fake_peer_with_threshold(threshold: usize) -> (FakePeerFactory, PeerController) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared {
        journal: Mutex::default(),
        events: Mutex::new(Some(events_tx)),
        channel: Arc::new(FakeDataChannel::new(threshold)),
        closed: AtomicBool::new(false),
        closed_notify: Notify::new(),
    });
    let factory = FakePeerFactory {
        events: Mutex::new(Some(events_rx)),
        failure: None,
        shared: Arc::clone(&shared),
    };
    (factory, PeerController { shared })
}

/// [`PeerFactory`] handing out a single scripted peer.
pub struct FakePeerFactory {
    events: Mutex<Option<mpsc::UnboundedReceiver<PeerEvent>>>,
    failure: Option<PeerError>,
    shared: Arc<Shared>,
}

impl FakePeerFactory {
    /// Fail every `create` call with `error`.
    #[must_use]
    pub fn failing(mut self, error: PeerError) -> Self {
        self.failure = Some(error);
        self
    }
}

#[async_trait]
impl PeerFactory for FakePeerFactory {
    async fn create(&self, config: PeerConfig) -> Result<Box<dyn PeerConnection>, PeerError> {
        self.shared.journal().config = Some(config);
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let events = self
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| PeerError::Create("fake peer already created".into()))?;
        Ok(Box::new(FakePeer {
            events,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct FakePeer {
    events: mpsc::UnboundedReceiver<PeerEvent>,
    shared: Arc<Shared>,
}

#[async_trait]
impl PeerConnection for FakePeer {
    async fn create_offer(&mut self) -> Result<SessionDescription, PeerError> {
        Ok(SessionDescription::offer("v=0 fake offer"))
    }

    async fn apply_answer(&mut self, answer: SessionDescription) -> Result<(), PeerError> {
        self.shared.journal().answers.push(answer);
        Ok(())
    }

    async fn add_ice_candidate(&mut self, candidate: IceCandidate) -> Result<(), PeerError> {
        self.shared.journal().candidates.push(candidate);
        Ok(())
    }

    async fn next_event(&mut self) -> Option<PeerEvent> { self.events.recv().await }

    fn data_channel(&self) -> Arc<dyn DataChannel> {
        Arc::clone(&self.shared.channel) as Arc<dyn DataChannel>
    }

    async fn close(&mut self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.closed_notify.notify_waiters();
    }
}

/// Drives the peer handed out by a [`FakePeerFactory`].
#[derive(Clone)]
pub struct PeerController {
    shared: Arc<Shared>,
}

impl PeerController {
    /// Queue an event for the socket.
    pub fn emit(&self, event: PeerEvent) {
        if let Some(events) = self
            .shared
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            let _ = events.send(event);
        }
    }

    /// Report the data channel as connected.
    pub fn connect(&self) { self.emit(PeerEvent::Connected); }

    /// Deliver raw datagrams in the given order.
    pub fn deliver(&self, frames: impl IntoIterator<Item = Bytes>) {
        for frame in frames {
            self.emit(PeerEvent::Data(frame));
        }
    }

    pub fn set_ice_state(&self, state: IceConnectionState) {
        self.emit(PeerEvent::IceStateChange(state));
    }

    pub fn fail(&self, message: impl Into<String>) { self.emit(PeerEvent::Error(message.into())); }

    /// Report that the remote side closed the connection.
    pub fn close(&self) { self.emit(PeerEvent::Closed); }

    /// End the event stream without a close event.
    pub fn end_stream(&self) {
        self.shared
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    #[must_use]
    pub fn channel(&self) -> Arc<FakeDataChannel> { Arc::clone(&self.shared.channel) }

    /// Configuration the socket created the peer with.
    #[must_use]
    pub fn config(&self) -> Option<PeerConfig> { self.shared.journal().config.clone() }

    #[must_use]
    pub fn answers(&self) -> Vec<SessionDescription> { self.shared.journal().answers.clone() }

    #[must_use]
    pub fn candidates(&self) -> Vec<IceCandidate> { self.shared.journal().candidates.clone() }

    /// Whether the socket has released the peer.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.shared.closed.load(Ordering::SeqCst) }

    /// Wait until the socket releases the peer.
    pub async fn wait_closed(&self) {
        loop {
            let notified = self.shared.closed_notify.notified();
            if self.is_closed() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for PeerController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerController")
            .field("closed", &self.is_closed())
            .field("channel", &self.shared.channel)
            .finish_non_exhaustive()
    }
}
