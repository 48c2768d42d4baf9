//! Frame codec that carries logical messages over a size-limited channel.
//!
//! The outbound [`Chunkifier`] splits a message (text plus attachments) into
//! frames no larger than the channel's datagram limit; the inbound
//! [`Dechunkifier`] stitches them back together under either
//! [`DeliveryMode`]. The wire format lives in [`payload`], in-order
//! sequencing in [`ordered`], and the bounded out-of-order buffers in a
//! private `unordered` module.

mod assembly;
pub mod chunkifier;
pub mod config;
pub mod dechunkifier;
pub mod error;
pub mod header;
pub mod id;
pub mod index;
pub mod mode;
pub mod ordered;
pub mod payload;
mod unordered;

pub use chunkifier::{Chunkifier, Frame, FrameBatch};
pub use config::FragmentationConfig;
pub use dechunkifier::Dechunkifier;
pub use error::{ChunkError, FrameDecodeError, FrameStatus, ReassemblyError, SeriesError};
pub use header::{FrameHeader, PartTag};
pub use id::MessageId;
pub use index::FragmentIndex;
pub use mode::DeliveryMode;
pub use ordered::FrameSeries;
pub use payload::{FRAME_MAGIC, decode_frame, encode_frame, frame_overhead};

#[cfg(test)]
mod tests;
