//! In-memory peer stack for demos and tests.
//!
//! [`LoopbackConnector`] stands in for both the peer factory and the
//! signalling service. The socket's peer talks to a [`LoopbackRemote`], which
//! plays the far side: it reads the frames the socket writes and injects
//! frames, ICE changes, and closure back into the socket.
//!
//! In [`DeliveryMode::UnorderedUnreliable`] every batch of frames crossing
//! the loopback is delivered in reverse order, so out-of-order reassembly is
//! exercised on every multi-frame message.

use std::{
    collections::VecDeque,
    fmt,
    sync::{
        Arc,
        Mutex,
        PoisonError,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;
use tokio::sync::{Notify, mpsc, oneshot};

use crate::{
    ConfigError,
    LogicalMessage,
    SocketOptions,
    TransportConfig,
    channel::{
        ChannelError,
        DataChannel,
        IceCandidate,
        IceConnectionState,
        PeerConfig,
        PeerConnection,
        PeerError,
        PeerEvent,
        PeerFactory,
        SessionDescription,
    },
    fragment::{
        ChunkError,
        Chunkifier,
        Dechunkifier,
        DeliveryMode,
        FragmentationConfig,
        ReassemblyError,
    },
    signalling::{SignalAnswer, Signaller, SignallingError},
};

struct Hub {
    config: TransportConfig,
    fragmentation: FragmentationConfig,
    offers: AtomicU64,
    remote_tx: Mutex<Option<oneshot::Sender<LoopbackRemote>>>,
    remote_rx: Mutex<Option<oneshot::Receiver<LoopbackRemote>>>,
}

/// Factory and signaller for a single in-memory peer.
///
/// # Examples
///
/// ```
/// use peerframe::{DeliveryMode, TransportConfig, loopback::LoopbackConnector};
///
/// let config = TransportConfig::default().with_delivery_mode(DeliveryMode::ReliableOrdered);
/// let connector = LoopbackConnector::new(&config).expect("valid configuration");
/// let options = connector.options();
/// assert_eq!(options.config(), &config);
/// ```
#[derive(Clone)]
pub struct LoopbackConnector {
    hub: Arc<Hub>,
}

impl LoopbackConnector {
    /// Create a connector whose remote side uses the limits in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `config` is invalid.
    pub fn new(config: &TransportConfig) -> Result<Self, ConfigError> {
        let fragmentation = config.fragmentation()?;
        let (remote_tx, remote_rx) = oneshot::channel();
        Ok(Self {
            hub: Arc::new(Hub {
                config: config.clone(),
                fragmentation,
                offers: AtomicU64::new(0),
                remote_tx: Mutex::new(Some(remote_tx)),
                remote_rx: Mutex::new(Some(remote_rx)),
            }),
        })
    }

    #[must_use]
    pub fn factory(&self) -> Arc<dyn PeerFactory> { Arc::new(self.clone()) }

    #[must_use]
    pub fn signaller(&self) -> Arc<dyn Signaller> { Arc::new(self.clone()) }

    /// Socket options wired to this connector with its configuration.
    #[must_use]
    pub fn options(&self) -> SocketOptions {
        SocketOptions::new(self.factory(), self.signaller()).with_config(self.hub.config.clone())
    }

    /// Wait for the socket to create its peer and return the far side.
    ///
    /// Returns `None` if the remote was already taken or the connector never
    /// created a peer.
    pub async fn remote(&self) -> Option<LoopbackRemote> {
        let receiver = self
            .hub
            .remote_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        receiver.await.ok()
    }
}

impl fmt::Debug for LoopbackConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackConnector")
            .field("config", &self.hub.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PeerFactory for LoopbackConnector {
    async fn create(&self, config: PeerConfig) -> Result<Box<dyn PeerConnection>, PeerError> {
        let sender = self
            .hub
            .remote_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| PeerError::Create("loopback connector already in use".into()))?;

        let mode = self.hub.config.delivery_mode;
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let buffer = Arc::new(Buffer {
            amount: AtomicUsize::new(0),
            drained: Notify::new(),
            threshold: config.buffered_amount_low_threshold,
        });
        let local_closed = Arc::new(AtomicBool::new(false));

        let remote = LoopbackRemote {
            mode,
            frames: frames_rx,
            inbox: VecDeque::new(),
            buffer: Arc::clone(&buffer),
            events: events_tx.clone(),
            chunkifier: Chunkifier::new(self.hub.fragmentation.frame_payload_cap, mode),
            dechunkifier: Dechunkifier::new(self.hub.fragmentation, mode),
            local_closed: Arc::clone(&local_closed),
        };
        if sender.send(remote).is_err() {
            debug!("loopback remote dropped before the peer was created");
        }
        debug!(
            "loopback peer created: mode={}, ordered={}",
            mode.as_str(),
            config.ordered
        );

        Ok(Box::new(LoopbackPeer {
            events: events_rx,
            connect: Some(events_tx),
            channel: Arc::new(LoopbackChannel {
                frames: frames_tx,
                buffer,
            }),
            closed: local_closed,
        }))
    }
}

#[async_trait]
impl Signaller for LoopbackConnector {
    async fn connect_to_peer(
        &self,
        offer: SessionDescription,
    ) -> Result<SignalAnswer, SignallingError> {
        let n = self.hub.offers.fetch_add(1, Ordering::Relaxed);
        debug!("loopback answering offer {n}: {}", offer.sdp);
        Ok(SignalAnswer {
            answer: SessionDescription::answer(format!("loopback-answer-{n}")),
            ice_candidates: vec![IceCandidate::new(
                "candidate:loopback 1 UDP 1 127.0.0.1 9 typ host",
            )],
        })
    }
}

/// Bytes written by the socket but not yet read by the remote.
struct Buffer {
    amount: AtomicUsize,
    drained: Notify,
    threshold: usize,
}

impl Buffer {
    fn release(&self, bytes: usize) {
        let before = self.amount.fetch_sub(bytes, Ordering::AcqRel);
        if before - bytes < self.threshold {
            self.drained.notify_waiters();
        }
    }
}

struct LoopbackChannel {
    frames: mpsc::UnboundedSender<Bytes>,
    buffer: Arc<Buffer>,
}

#[async_trait]
impl DataChannel for LoopbackChannel {
    async fn send(&self, datagram: Bytes) -> Result<(), ChannelError> {
        let len = datagram.len();
        self.buffer.amount.fetch_add(len, Ordering::AcqRel);
        if self.frames.send(datagram).is_err() {
            self.buffer.amount.fetch_sub(len, Ordering::AcqRel);
            return Err(ChannelError::Closed);
        }
        Ok(())
    }

    fn buffered_amount(&self) -> usize { self.buffer.amount.load(Ordering::Acquire) }

    async fn buffered_amount_low(&self) {
        loop {
            let drained = self.buffer.drained.notified();
            if self.buffered_amount() < self.buffer.threshold {
                return;
            }
            drained.await;
        }
    }
}

struct LoopbackPeer {
    events: mpsc::UnboundedReceiver<PeerEvent>,
    /// Held until the answer arrives, then used to report the connection.
    connect: Option<mpsc::UnboundedSender<PeerEvent>>,
    channel: Arc<LoopbackChannel>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl PeerConnection for LoopbackPeer {
    async fn create_offer(&mut self) -> Result<SessionDescription, PeerError> {
        Ok(SessionDescription::offer("loopback-offer"))
    }

    async fn apply_answer(&mut self, answer: SessionDescription) -> Result<(), PeerError> {
        let events = self
            .connect
            .take()
            .ok_or_else(|| PeerError::Answer("answer already applied".into()))?;
        debug!("loopback peer applied answer {}", answer.sdp);
        // A dropped remote surfaces as the end of the event stream.
        let _ = events.send(PeerEvent::Connected);
        Ok(())
    }

    async fn add_ice_candidate(&mut self, _candidate: IceCandidate) -> Result<(), PeerError> {
        Ok(())
    }

    async fn next_event(&mut self) -> Option<PeerEvent> { self.events.recv().await }

    fn data_channel(&self) -> Arc<dyn DataChannel> {
        Arc::clone(&self.channel) as Arc<dyn DataChannel>
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
        self.connect = None;
        self.events.close();
    }
}

/// The far side of a loopback peer.
///
/// Dropping the remote ends the socket's event stream, which the socket
/// reports as a normal peer closure.
pub struct LoopbackRemote {
    mode: DeliveryMode,
    frames: mpsc::UnboundedReceiver<Bytes>,
    inbox: VecDeque<Bytes>,
    buffer: Arc<Buffer>,
    events: mpsc::UnboundedSender<PeerEvent>,
    chunkifier: Chunkifier,
    dechunkifier: Dechunkifier,
    local_closed: Arc<AtomicBool>,
}

impl LoopbackRemote {
    #[must_use]
    pub const fn mode(&self) -> DeliveryMode { self.mode }

    /// Bytes the socket has written that the remote has not read yet.
    #[must_use]
    pub fn buffered_amount(&self) -> usize { self.buffer.amount.load(Ordering::Acquire) }

    /// Whether the socket has released its peer connection.
    #[must_use]
    pub fn is_local_closed(&self) -> bool { self.local_closed.load(Ordering::Acquire) }

    /// Read the next frame written by the socket.
    ///
    /// Returns `None` once the socket's data channel is gone and every
    /// written frame has been read.
    pub async fn recv_frame(&mut self) -> Option<Bytes> {
        if self.inbox.is_empty() {
            let first = self.frames.recv().await?;
            let mut batch = vec![first];
            self.collect_ready(&mut batch);
            self.accept(batch);
        }
        self.inbox.pop_front()
    }

    /// Take every frame written so far without waiting.
    pub fn drain(&mut self) -> Vec<Bytes> {
        let mut batch = Vec::new();
        self.collect_ready(&mut batch);
        self.accept(batch);
        self.inbox.drain(..).collect()
    }

    /// Read frames until a whole message from the socket is reassembled.
    ///
    /// Returns `None` when the socket's channel closes first.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError`] when a frame cannot be reassembled.
    pub async fn recv_message(&mut self) -> Option<Result<LogicalMessage, ReassemblyError>> {
        loop {
            let frame = self.recv_frame().await?;
            match self.dechunkifier.push(&frame) {
                Ok(Some(message)) => return Some(Ok(message)),
                Ok(None) => {}
                Err(err) => return Some(Err(err)),
            }
        }
    }

    /// Send `text` to the socket as one logical message.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError`] when the message cannot be framed.
    pub fn send_text(&self, text: impl Into<String>) -> Result<(), ChunkError> {
        self.send_message(&LogicalMessage::new(text))
    }

    /// Send `message` to the socket.
    ///
    /// # Errors
    ///
    /// Returns [`ChunkError`] when the message cannot be framed.
    pub fn send_message(&self, message: &LogicalMessage) -> Result<(), ChunkError> {
        let mut frames = self.chunkifier.chunk(message)?.encode()?;
        if !self.mode.is_ordered() {
            frames.reverse();
        }
        for frame in frames {
            self.send_raw(frame);
        }
        Ok(())
    }

    /// Deliver `datagram` to the socket unchanged.
    pub fn send_raw(&self, datagram: impl Into<Bytes>) {
        self.emit(PeerEvent::Data(datagram.into()));
    }

    /// Report an ICE connection state change to the socket.
    pub fn set_ice_state(&self, state: IceConnectionState) {
        self.emit(PeerEvent::IceStateChange(state));
    }

    /// Report a peer error to the socket.
    pub fn fail(&self, message: impl Into<String>) { self.emit(PeerEvent::Error(message.into())); }

    /// Close the peer connection from the remote side.
    pub fn close(&self) { self.emit(PeerEvent::Closed); }

    fn emit(&self, event: PeerEvent) {
        if self.events.send(event).is_err() {
            debug!("loopback event dropped; the socket released its peer");
        }
    }

    fn collect_ready(&mut self, batch: &mut Vec<Bytes>) {
        while let Ok(frame) = self.frames.try_recv() {
            batch.push(frame);
        }
    }

    fn accept(&mut self, mut batch: Vec<Bytes>) {
        let bytes = batch.iter().map(Bytes::len).sum();
        if bytes > 0 {
            self.buffer.release(bytes);
        }
        if !self.mode.is_ordered() {
            batch.reverse();
        }
        self.inbox.extend(batch);
    }
}

impl fmt::Debug for LoopbackRemote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackRemote")
            .field("mode", &self.mode)
            .field("buffered_amount", &self.buffered_amount())
            .field("queued", &self.inbox.len())
            .finish_non_exhaustive()
    }
}
