//! Shared utilities for integration tests.
//!
//! [`connect`] wires a [`PeerSocket`] to a scripted peer and an answering
//! signaller, and [`open`] additionally drives it to the open state.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::sync::Arc;

use peerframe::{PeerSocket, SocketOptions, TransportConfig, signalling::Signaller};
use peerframe_testing::{
    EventRecorder,
    PeerController,
    StubSignaller,
    fake_peer_with_threshold,
};
use rstest::fixture;

/// Frame size small enough that short operations span several frames.
pub const SMALL_FRAME: usize = 64;

pub struct Harness {
    pub socket: PeerSocket,
    pub peer: PeerController,
    pub signaller: Arc<StubSignaller>,
    pub events: EventRecorder,
    pub config: TransportConfig,
}

#[fixture]
pub fn config() -> TransportConfig { TransportConfig::default().with_max_frame_size(SMALL_FRAME) }

/// Connect a socket without driving establishment forward.
pub fn connect(config: TransportConfig, signaller: StubSignaller) -> Harness {
    connect_with(config, signaller, |options| options)
}

/// Connect a socket after letting `customise` adjust its options.
#[expect(
    clippy::expect_used,
    reason = "a rejected test configuration must abort the test immediately"
)]
pub fn connect_with(
    config: TransportConfig,
    signaller: StubSignaller,
    customise: impl FnOnce(SocketOptions) -> SocketOptions,
) -> Harness {
    let (factory, peer) = fake_peer_with_threshold(config.max_frame_size);
    let signaller = Arc::new(signaller);
    let shared: Arc<dyn Signaller> = signaller.clone();
    let options =
        customise(SocketOptions::new(Arc::new(factory), shared).with_config(config.clone()));
    let socket = PeerSocket::connect("peer://printer-1", "graphql-ws", options)
        .expect("valid transport config");
    let events = EventRecorder::attach(&socket);
    Harness {
        socket,
        peer,
        signaller,
        events,
        config,
    }
}

/// Connect a socket and wait for its `open` event.
pub async fn open(config: TransportConfig) -> Harness {
    let mut harness = connect(config, StubSignaller::answering());
    harness.peer.connect();
    harness.events.expect_open().await;
    harness
}
