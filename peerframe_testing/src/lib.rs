//! Test doubles for driving a [`PeerSocket`](peerframe::PeerSocket) without
//! a real WebRTC stack.
//!
//! [`fake_peer`] returns a factory to hand to the socket plus a
//! [`PeerController`] that scripts what the peer reports. The controller
//! exposes the [`FakeDataChannel`] so tests can hold back its buffer and
//! observe the frames the socket writes.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use peerframe::{PeerSocket, SocketOptions};
//! use peerframe_testing::{EventRecorder, StubSignaller, fake_peer};
//!
//! # async fn demo() {
//! let (factory, controller) = fake_peer();
//! let options = SocketOptions::new(Arc::new(factory), Arc::new(StubSignaller::answering()));
//! let socket = PeerSocket::connect("peer://printer", "graphql-ws", options).expect("default config is valid");
//! let mut events = EventRecorder::attach(&socket);
//! controller.connect();
//! events.expect_open().await;
//! # }
//! ```

pub mod channel;
pub mod frames;
pub mod logging;
pub mod metrics;
pub mod peer;
pub mod recorder;
pub mod signaller;

pub use channel::FakeDataChannel;
pub use frames::{message_frames, rejection, text_frames};
pub use logging::{LoggerHandle, logger};
pub use metrics::{CounterSnapshot, counter_value, debugging_recorder_setup};
pub use peer::{FakePeerFactory, PeerController, fake_peer, fake_peer_with_threshold};
pub use recorder::{EventRecorder, Recorded};
pub use signaller::StubSignaller;
