//! Attachment extraction for outbound operations.
//!
//! Callers stage binary blobs in a shared [`PendingUploads`] table and embed
//! the returned placeholder token in the operation's variables. On send,
//! [`extract`] swaps each token for a positional pointer and hands the blobs
//! to the frame codec as attachments.

mod extract;
mod pending;

pub use extract::{ExtractError, Extracted, extract};
pub use pending::PendingUploads;

/// Prefix marking a string value as a reference to a binary attachment.
pub const FILE_PLACEHOLDER_PREFIX: &str = "#__graphql_file__:";
