#![doc(html_root_url = "https://docs.rs/peerframe/latest")]
//! Public API for the `peerframe` library.
//!
//! This crate carries GraphQL-style operation messages, with optional binary
//! attachments, over a peer-to-peer data channel whose datagrams are capped
//! in size. It provides session establishment over an external signalling
//! service, a frame codec that splits and reassembles messages, attachment
//! extraction for `#__graphql_file__:` placeholders, and a WebSocket-like
//! event facade.

pub mod channel;
pub mod config;
pub mod envelope;
pub mod error;
pub mod fragment;
pub mod loopback;
pub mod message;
pub mod metrics;
pub mod panic;
pub mod signalling;
pub mod socket;
pub mod upload;

pub use config::{ConfigError, TransportConfig};
pub use error::{SendError, TransportError};
pub use fragment::{
    ChunkError,
    Chunkifier,
    Dechunkifier,
    DeliveryMode,
    FragmentationConfig,
    MessageId,
    ReassemblyError,
};
pub use message::LogicalMessage;
pub use metrics::{
    DECODE_ERRORS,
    Direction,
    FRAMES_PROCESSED,
    LISTENER_PANICS,
    MESSAGES_DELIVERED,
    REASSEMBLY_EVICTIONS,
    SOCKETS_OPEN,
};
pub use signalling::{EstablishError, SignallingCallbacks};
pub use socket::{CloseCode, PeerSocket, ReadyState, SocketEvent, SocketOptions};
pub use upload::PendingUploads;
