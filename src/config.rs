//! Transport configuration.
//!
//! [`TransportConfig`] gathers the per-socket knobs: delivery mode, frame and
//! message limits, the unordered eviction policy, and the optional
//! establishment deadline. It deserialises with `serde`, so missing fields
//! fall back to the defaults below.

use std::{num::NonZeroUsize, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fragment::{DeliveryMode, FragmentationConfig, frame_overhead};

/// Largest datagram written to the data channel, in bytes.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024;
/// Largest reassembled message, text and attachments together.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 256 * 1024 * 1024;
/// Age at which an incomplete unordered message is evicted.
pub const DEFAULT_REASSEMBLY_TIMEOUT: Duration = Duration::from_secs(30);
/// Incomplete unordered messages held before the oldest is evicted.
pub const DEFAULT_MAX_IN_FLIGHT_MESSAGES: usize = 64;
/// Outbound messages queued behind the data channel before `send` refuses more.
pub const DEFAULT_MAX_QUEUED_MESSAGES: usize = 64;

/// Errors returned when a [`TransportConfig`] cannot be applied.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The frame size leaves no room for payload after the header.
    #[error("max frame size {max_frame_size} must exceed the {overhead} byte frame header")]
    FrameTooSmall {
        /// Configured frame size.
        max_frame_size: usize,
        /// Bytes consumed by the frame header.
        overhead: usize,
    },
    /// A limit that must be positive was zero.
    #[error("{field} must be greater than zero")]
    Zero {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// Per-socket transport settings.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use peerframe::{DeliveryMode, TransportConfig};
///
/// let config = TransportConfig::default()
///     .with_delivery_mode(DeliveryMode::ReliableOrdered)
///     .with_max_frame_size(1200)
///     .with_establish_timeout(Some(Duration::from_secs(10)));
/// let fragmentation = config.fragmentation().expect("valid configuration");
/// assert!(fragmentation.frame_payload_cap.get() < 1200);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub delivery_mode: DeliveryMode,
    pub max_frame_size: usize,
    pub max_message_size: usize,
    pub reassembly_timeout: Duration,
    pub max_in_flight_messages: usize,
    pub max_queued_messages: usize,
    /// Deadline for establishment; `None` waits indefinitely.
    pub establish_timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            delivery_mode: DeliveryMode::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            reassembly_timeout: DEFAULT_REASSEMBLY_TIMEOUT,
            max_in_flight_messages: DEFAULT_MAX_IN_FLIGHT_MESSAGES,
            max_queued_messages: DEFAULT_MAX_QUEUED_MESSAGES,
            establish_timeout: None,
        }
    }
}

impl TransportConfig {
    #[must_use]
    pub fn with_delivery_mode(mut self, mode: DeliveryMode) -> Self {
        self.delivery_mode = mode;
        self
    }

    #[must_use]
    pub fn with_max_frame_size(mut self, bytes: usize) -> Self {
        self.max_frame_size = bytes;
        self
    }

    #[must_use]
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    #[must_use]
    pub fn with_reassembly_timeout(mut self, timeout: Duration) -> Self {
        self.reassembly_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_in_flight_messages(mut self, count: usize) -> Self {
        self.max_in_flight_messages = count;
        self
    }

    #[must_use]
    pub fn with_max_queued_messages(mut self, count: usize) -> Self {
        self.max_queued_messages = count;
        self
    }

    #[must_use]
    pub fn with_establish_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.establish_timeout = timeout;
        self
    }

    /// Capacity of the queue between `send` and the data channel writer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] when `max_queued_messages` is zero.
    pub fn queue_capacity(&self) -> Result<NonZeroUsize, ConfigError> {
        non_zero(self.max_queued_messages, "max_queued_messages")
    }

    /// Validate the limits and derive the codec configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Zero`] when a limit or the reassembly timeout
    /// is zero and [`ConfigError::FrameTooSmall`] when a frame cannot carry a
    /// single payload byte after its header.
    pub fn fragmentation(&self) -> Result<FragmentationConfig, ConfigError> {
        let max_frame_size = non_zero(self.max_frame_size, "max_frame_size")?;
        let max_message_size = non_zero(self.max_message_size, "max_message_size")?;
        let max_in_flight = non_zero(self.max_in_flight_messages, "max_in_flight_messages")?;
        if self.reassembly_timeout.is_zero() {
            return Err(ConfigError::Zero {
                field: "reassembly_timeout",
            });
        }
        FragmentationConfig::for_frame_budget(
            max_frame_size,
            max_message_size,
            self.reassembly_timeout,
            max_in_flight,
        )
        .ok_or(ConfigError::FrameTooSmall {
            max_frame_size: self.max_frame_size,
            overhead: frame_overhead().get(),
        })
    }
}

fn non_zero(value: usize, field: &'static str) -> Result<NonZeroUsize, ConfigError> {
    NonZeroUsize::new(value).ok_or(ConfigError::Zero { field })
}
