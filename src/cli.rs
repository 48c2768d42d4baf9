//! Command line interface for the `peerframe` demo binary.
//!
//! The binary connects a socket to an in-memory loopback peer, stages any
//! attachment files, sends one operation, and prints the reply.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Delivery mode selectable from the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Reliable, in-order channel.
    Ordered,
    /// Unordered, unreliable channel.
    #[default]
    Unordered,
}

/// Command line arguments for the `peerframe` binary.
#[derive(Debug, Parser)]
#[command(
    name = "peerframe",
    version,
    about = "Send an operation over a loopback peer socket"
)]
pub struct Cli {
    /// Operation JSON to send. Defaults to a mutation uploading every
    /// attachment.
    #[arg(short, long)]
    pub operation: Option<String>,

    /// File to stage as an attachment. May be repeated.
    #[arg(short, long = "attach", value_name = "PATH")]
    pub attachments: Vec<PathBuf>,

    /// Data channel delivery mode.
    #[arg(short, long, value_enum, default_value_t = ModeArg::default())]
    pub mode: ModeArg,

    /// Largest datagram written to the channel, header included.
    #[arg(long, default_value_t = 16 * 1024)]
    pub frame_size: usize,
}
