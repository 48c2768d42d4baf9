//! Per-socket tasks: establishment, inbound reassembly, and outbound writes.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use bytes::Bytes;
use tokio::{sync::mpsc, time::MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{CloseCode, ReadyState, SocketEvent, SocketInner};
use crate::{
    TransportError,
    channel::{
        ChannelError,
        FrameWriter,
        IceConnectionState,
        PeerConfig,
        PeerEvent,
        PeerFactory,
    },
    fragment::{Dechunkifier, DeliveryMode, FragmentationConfig},
    metrics::{self, Direction},
    signalling::{EstablishError, EstablishedPeer, Signaller, SignallingCallbacks, establish},
};

/// Everything the driver task owns besides the shared socket state.
pub(super) struct Driver {
    pub(super) factory: Arc<dyn PeerFactory>,
    pub(super) signaller: Arc<dyn Signaller>,
    pub(super) callbacks: SignallingCallbacks,
    pub(super) peer_config: PeerConfig,
    pub(super) fragmentation: FragmentationConfig,
    pub(super) mode: DeliveryMode,
    pub(super) establish_timeout: Option<Duration>,
    pub(super) outbound: mpsc::Receiver<Vec<Bytes>>,
}

impl Driver {
    pub(super) async fn run(self, inner: Arc<SocketInner>) {
        let Self {
            factory,
            signaller,
            callbacks,
            peer_config,
            fragmentation,
            mode,
            establish_timeout,
            outbound,
        } = self;

        let attempt = tokio::select! {
            biased;
            () = inner.shutdown.cancelled() => Err(EstablishError::Cancelled),
            result = establish(
                factory.as_ref(),
                signaller.as_ref(),
                peer_config,
                establish_timeout,
            ) => result,
        };
        let EstablishedPeer {
            mut connection,
            early_data,
        } = match attempt {
            Ok(established) => established,
            Err(err) => {
                callbacks.failed(&err);
                inner.fail(TransportError::Establish(err));
                return;
            }
        };

        if !inner
            .state
            .transition(ReadyState::Connecting, ReadyState::Open)
        {
            callbacks.failed(&EstablishError::Cancelled);
            connection.close().await;
            return;
        }
        callbacks.succeeded();
        metrics::inc_sockets();
        inner.dispatcher.notify(&SocketEvent::Open);

        let writer = FrameWriter::new(
            connection.data_channel(),
            fragmentation.low_water_threshold(),
        );
        let writer_task = tokio::spawn(write_frames(Arc::clone(&inner), writer, outbound));

        let mut inbound = Inbound {
            dechunkifier: Dechunkifier::new(fragmentation, mode),
            first: true,
        };
        let mut early_data = early_data.into_iter();
        let mut purge = tokio::time::interval(fragmentation.reassembly_timeout);
        purge.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while inner.state.get() == ReadyState::Open {
            let event = match early_data.next() {
                Some(datagram) => Some(PeerEvent::Data(datagram)),
                None => tokio::select! {
                    biased;
                    () = inner.shutdown.cancelled() => break,
                    _ = purge.tick() => {
                        inbound.purge();
                        continue;
                    }
                    event = connection.next_event() => event,
                },
            };
            match event {
                Some(PeerEvent::Data(datagram)) => inbound.on_datagram(&inner, &datagram),
                Some(PeerEvent::IceStateChange(IceConnectionState::Disconnected)) => {
                    info!("ICE state changed to disconnected");
                    inner.fail(TransportError::ConnectionLost);
                }
                Some(PeerEvent::IceStateChange(state)) => debug!(?state, "ICE state changed"),
                Some(PeerEvent::Connected) => {}
                Some(PeerEvent::Error(message)) => inner.fail(TransportError::Peer(message)),
                Some(PeerEvent::Closed) | None => inner.close(
                    CloseCode::NORMAL,
                    String::from("WebRTC peer connection closed"),
                ),
            }
        }

        connection.close().await;
        if let Err(err) = writer_task.await {
            warn!(error = %err, "frame writer task failed");
        }
        metrics::dec_sockets();
        debug!(url = %inner.url, "socket driver finished");
    }
}

struct Inbound {
    dechunkifier: Dechunkifier,
    first: bool,
}

impl Inbound {
    fn on_datagram(&mut self, inner: &SocketInner, datagram: &[u8]) {
        metrics::inc_frames(Direction::Inbound);
        match self.dechunkifier.push(datagram) {
            Ok(Some(message)) => {
                let first = std::mem::replace(&mut self.first, false);
                inner.deliver(message, first);
            }
            Ok(None) => {}
            Err(err) => {
                metrics::inc_decode_errors();
                warn!(
                    message_id = ?err.message_id(),
                    error = %err,
                    "discarding undecodable frame"
                );
                inner.fail(TransportError::Reassembly(err));
            }
        }
    }

    fn purge(&mut self) {
        let evicted = self.dechunkifier.purge_expired_at(Instant::now());
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "evicted stale partial messages");
        }
    }
}

/// Drain queued messages into the data channel until shutdown.
async fn write_frames(
    inner: Arc<SocketInner>,
    writer: FrameWriter,
    mut outbound: mpsc::Receiver<Vec<Bytes>>,
) {
    loop {
        let frames = tokio::select! {
            biased;
            () = inner.shutdown.cancelled() => break,
            frames = outbound.recv() => match frames {
                Some(frames) => frames,
                None => break,
            },
        };
        match writer.write_all(frames, &inner.shutdown).await {
            Ok(()) => {}
            Err(ChannelError::Cancelled) => break,
            Err(err) => {
                inner.fail(TransportError::Channel(err));
                break;
            }
        }
    }
}
