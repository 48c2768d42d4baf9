//! Event-driven socket over a fragmenting peer channel.
//!
//! [`PeerSocket`] mirrors the familiar WebSocket surface: it starts in
//! [`ReadyState::Connecting`], fires `open` once the peer connects, turns
//! reassembled messages into `message` events, and ends with exactly one
//! `close` event. Fatal errors fire `error` immediately before `close`.
//!
//! Each socket runs a driver task that establishes the peer and reads
//! inbound frames, plus a writer task that feeds outbound frames through the
//! backpressured [`FrameWriter`](crate::channel::FrameWriter).

mod close;
mod dispatch;
mod driver;
pub mod event;
mod options;
mod state;

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use close::CloseCode;
use dispatch::EventDispatcher;
pub use event::{
    CloseEvent,
    ErrorEvent,
    EventKind,
    Listener,
    ListenerError,
    ListenerId,
    ListenerResult,
    MessageEvent,
    SocketEvent,
    listener,
};
pub use options::SocketOptions;
use state::StateCell;
pub use state::ReadyState;

use crate::{
    ConfigError,
    LogicalMessage,
    SendError,
    TransportError,
    channel::PeerConfig,
    envelope::ConnectionRejection,
    fragment::Chunkifier,
    metrics,
    upload::{Extracted, PendingUploads, extract},
};

struct SocketInner {
    url: String,
    protocol: String,
    state: StateCell,
    dispatcher: EventDispatcher,
    /// Cancelled when the socket starts closing; stops both tasks.
    shutdown: CancellationToken,
    /// Cancelled once the socket is closed.
    closed: CancellationToken,
    chunkifier: Chunkifier,
    uploads: Arc<PendingUploads>,
    outbound: mpsc::Sender<Vec<Bytes>>,
}

impl SocketInner {
    /// Close with `code`, firing the `close` event once.
    fn close(&self, code: CloseCode, reason: String) {
        if !code.is_normal() {
            warn!(%code, reason = %reason, "socket closed with non-normal code");
        }
        if self.state.begin_close() {
            self.shutdown.cancel();
            self.finish(CloseEvent::new(code, reason));
        }
    }

    /// Fire `error` then `close` for an unrecoverable failure.
    fn fail(&self, error: TransportError) {
        if !self.state.begin_close() {
            debug!(error = %error, "ignoring error on a closing socket");
            return;
        }
        self.shutdown.cancel();
        warn!(code = %error.close_code(), error = %error, "socket failed");
        let event = ErrorEvent::new(error);
        let close = event.close_event();
        self.dispatcher.notify(&SocketEvent::Error(event));
        self.finish(close);
    }

    fn finish(&self, event: CloseEvent) {
        if self.state.finish_close() {
            info!(code = %event.code(), reason = event.reason(), "socket closed");
            self.dispatcher.notify(&SocketEvent::Close(event));
            self.closed.cancel();
        }
    }

    /// Hand a reassembled message to listeners.
    ///
    /// The first message of a session is checked for a remote rejection.
    fn deliver(&self, message: LogicalMessage, first: bool) {
        if first && let Some(rejection) = ConnectionRejection::detect(message.text()) {
            self.fail(TransportError::Rejected {
                reason: rejection.message(),
            });
            return;
        }

        metrics::inc_messages();
        let event = SocketEvent::Message(MessageEvent::from(message));
        if let Err(failure) = self.dispatcher.dispatch(&event) {
            let data = event.as_message().map_or("", MessageEvent::data);
            warn!(error = %failure, "Error receiving message");
            self.close(
                CloseCode::APPLICATION_ERROR,
                format!(
                    "Error receiving message: {failure}: {}",
                    serde_json::Value::from(data)
                ),
            );
        }
    }
}

/// Handle to a peer-to-peer socket.
///
/// Clones share the same socket.
#[derive(Clone)]
pub struct PeerSocket {
    inner: Arc<SocketInner>,
}

impl PeerSocket {
    /// Create a socket and start establishing its peer session.
    ///
    /// The socket is returned in [`ReadyState::Connecting`]; progress is
    /// reported through events and the signalling callbacks in `options`.
    /// `url` and `protocol` are kept for inspection only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the transport configuration is invalid.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn connect(
        url: impl Into<String>,
        protocol: impl Into<String>,
        options: SocketOptions,
    ) -> Result<Self, ConfigError> {
        let fragmentation = options.config.fragmentation()?;
        let queue_capacity = options.config.queue_capacity()?;
        let mode = options.config.delivery_mode;
        let (outbound, outbound_rx) = mpsc::channel(queue_capacity.get());

        let inner = Arc::new(SocketInner {
            url: url.into(),
            protocol: protocol.into(),
            state: StateCell::new(),
            dispatcher: EventDispatcher::default(),
            shutdown: CancellationToken::new(),
            closed: CancellationToken::new(),
            chunkifier: Chunkifier::new(fragmentation.frame_payload_cap, mode),
            uploads: options.uploads,
            outbound,
        });

        let peer_config = PeerConfig {
            initiator: true,
            trickle: false,
            ice_servers: options.ice_servers,
            ordered: mode.is_ordered(),
            buffered_amount_low_threshold: fragmentation.low_water_threshold(),
        };
        let driver = driver::Driver {
            factory: options.factory,
            signaller: options.signaller,
            callbacks: options.callbacks,
            peer_config,
            fragmentation,
            mode,
            establish_timeout: options.config.establish_timeout,
            outbound: outbound_rx,
        };
        debug!(url = %inner.url, mode = mode.as_str(), "connecting peer socket");
        tokio::spawn(driver.run(Arc::clone(&inner)));

        Ok(Self { inner })
    }

    #[must_use]
    pub fn ready_state(&self) -> ReadyState { self.inner.state.get() }

    #[must_use]
    pub fn url(&self) -> &str { &self.inner.url }

    #[must_use]
    pub fn protocol(&self) -> &str { &self.inner.protocol }

    /// Send an operation, resolving attachment placeholders first.
    ///
    /// Frames are queued for the writer task; this never waits on the
    /// channel. At most `max_queued_messages` messages wait behind the one
    /// being written.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::NotOpen`] while connecting, [`SendError::Closed`]
    /// once closing, [`SendError::QueueFull`] when the outbound queue is at
    /// capacity, and [`SendError::Extract`] when the text is not JSON or
    /// references an attachment that is not staged. None of these close the
    /// socket, and a full queue leaves staged uploads untouched.
    pub fn send(&self, text: &str) -> Result<(), SendError> {
        match self.inner.state.get() {
            ReadyState::Connecting => return Err(SendError::NotOpen),
            ReadyState::Closing | ReadyState::Closed => return Err(SendError::Closed),
            ReadyState::Open => {}
        }

        let permit = self
            .inner
            .outbound
            .try_reserve()
            .map_err(|err| match err {
                TrySendError::Full(()) => SendError::QueueFull,
                TrySendError::Closed(()) => SendError::Closed,
            })?;
        let Extracted { text, attachments } = extract(text, &self.inner.uploads)?;
        let batch = self
            .inner
            .chunkifier
            .chunk(&LogicalMessage::with_attachments(text, attachments))?;
        debug!(
            message_id = %batch.message_id(),
            frames = batch.len(),
            "queueing outbound message"
        );
        permit.send(batch.encode()?);
        Ok(())
    }

    /// Close the socket.
    ///
    /// The `close` event fires before this returns. Frames already handed to
    /// the data channel stay there; queued frames are dropped. Closing an
    /// already closed socket does nothing.
    pub fn close(&self, code: impl Into<CloseCode>, reason: impl Into<String>) {
        self.inner.close(code.into(), reason.into());
    }

    /// Resolve once the socket reaches [`ReadyState::Closed`].
    pub async fn closed(&self) { self.inner.closed.cancelled().await; }

    /// Register `callback` for events named `name`.
    ///
    /// Names other than `open`, `message`, `error`, and `close` are accepted
    /// with a warning and never fire.
    pub fn add_event_listener<F>(&self, name: &str, callback: F) -> ListenerId
    where
        F: Fn(&SocketEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.inner.dispatcher.add(name, listener(callback))
    }

    /// Remove a listener, returning whether it was registered.
    pub fn remove_event_listener(&self, name: &str, id: ListenerId) -> bool {
        self.inner.dispatcher.remove(name, id)
    }

    pub fn set_onopen<F>(&self, callback: F)
    where
        F: Fn(&SocketEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.set_slot(EventKind::Open, callback);
    }

    pub fn set_onmessage<F>(&self, callback: F)
    where
        F: Fn(&SocketEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.set_slot(EventKind::Message, callback);
    }

    pub fn set_onerror<F>(&self, callback: F)
    where
        F: Fn(&SocketEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.set_slot(EventKind::Error, callback);
    }

    pub fn set_onclose<F>(&self, callback: F)
    where
        F: Fn(&SocketEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.set_slot(EventKind::Close, callback);
    }

    /// Empty the `on*` slot for `kind`.
    pub fn clear_on(&self, kind: EventKind) { self.inner.dispatcher.set_slot(kind, None); }

    fn set_slot<F>(&self, kind: EventKind, callback: F)
    where
        F: Fn(&SocketEvent) -> ListenerResult + Send + Sync + 'static,
    {
        self.inner
            .dispatcher
            .set_slot(kind, Some(listener(callback)));
    }
}

impl std::fmt::Debug for PeerSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerSocket")
            .field("url", &self.inner.url)
            .field("protocol", &self.inner.protocol)
            .field("ready_state", &self.ready_state())
            .finish_non_exhaustive()
    }
}
