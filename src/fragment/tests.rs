//! Unit tests for the frame codec.
//!
//! Tests are split by concern: outbound chunking, in-order reassembly,
//! out-of-order reassembly with eviction, and property checks across both.

use std::{num::NonZeroUsize, time::Duration};

use bytes::Bytes;

use super::{Chunkifier, DeliveryMode, FragmentationConfig, frame_overhead};
use crate::LogicalMessage;

mod property_tests;

/// Payload cap used by most tests; small enough to force fragmentation.
const CAP: usize = 4;

fn config_with(cap: usize, max_message_size: usize, max_in_flight: usize) -> FragmentationConfig {
    FragmentationConfig::for_frame_budget(
        NonZeroUsize::new(frame_overhead().get() + cap).expect("non-zero frame size"),
        NonZeroUsize::new(max_message_size).expect("non-zero message size"),
        Duration::from_secs(30),
        NonZeroUsize::new(max_in_flight).expect("non-zero in-flight bound"),
    )
    .expect("frame budget fits the header")
}

fn config() -> FragmentationConfig { config_with(CAP, 1024, 8) }

fn chunkifier(mode: DeliveryMode) -> Chunkifier {
    Chunkifier::new(config().frame_payload_cap, mode)
}

/// Chunk and encode `message`, returning the datagrams in send order.
fn datagrams(chunkifier: &Chunkifier, message: &LogicalMessage) -> Vec<Bytes> {
    chunkifier
        .chunk(message)
        .expect("chunk message")
        .encode()
        .expect("encode frames")
}
