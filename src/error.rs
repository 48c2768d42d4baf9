//! Canonical error types for the crate.
//!
//! [`TransportError`] is the payload of a socket's `error` event. Each
//! variant maps onto the close code the socket reports when it shuts down
//! because of that error.

use thiserror::Error;

use crate::{
    channel::ChannelError,
    fragment::{ChunkError, ReassemblyError},
    signalling::EstablishError,
    socket::CloseCode,
    upload::ExtractError,
};

/// Fatal socket errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer session could not be established.
    #[error(transparent)]
    Establish(#[from] EstablishError),
    /// The remote side answered the connection with `connection_error`.
    #[error("{reason}")]
    Rejected { reason: String },
    /// ICE reported the connection as disconnected after it opened.
    #[error("Connection lost")]
    ConnectionLost,
    /// The peer reported an error after the socket opened.
    #[error("{0}")]
    Peer(String),
    /// An inbound frame could not be reassembled.
    #[error(transparent)]
    Reassembly(#[from] ReassemblyError),
    /// Writing to the data channel failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl TransportError {
    /// Close code reported when this error shuts the socket down.
    #[must_use]
    pub fn close_code(&self) -> CloseCode {
        match self {
            Self::Establish(EstablishError::IceDisconnected) | Self::ConnectionLost => {
                CloseCode::CONNECTION_LOST
            }
            Self::Rejected { .. } => CloseCode::UNRECOVERABLE,
            Self::Establish(_) | Self::Peer(_) | Self::Reassembly(_) | Self::Channel(_) => {
                CloseCode::APPLICATION_ERROR
            }
        }
    }
}

/// Errors returned synchronously from [`crate::PeerSocket::send`].
#[derive(Debug, Error)]
pub enum SendError {
    /// The socket is still connecting.
    #[error("socket is not open yet")]
    NotOpen,
    /// The socket is closing or closed.
    #[error("socket is closed")]
    Closed,
    /// Too many messages are already waiting for the data channel to drain.
    #[error("outbound queue is full")]
    QueueFull,
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Chunk(#[from] ChunkError),
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::signalling::SignallingError;

    #[rstest]
    #[case(
        TransportError::Establish(EstablishError::Signalling(SignallingError::Unavailable(
            "offline".into()
        ))),
        4000
    )]
    #[case(TransportError::Establish(EstablishError::IceDisconnected), 4444)]
    #[case(TransportError::ConnectionLost, 4444)]
    #[case(TransportError::Rejected { reason: "Invite expired".into() }, 4400)]
    #[case(TransportError::Peer("dtls".into()), 4000)]
    #[case(TransportError::Channel(ChannelError::Closed), 4000)]
    fn errors_map_to_close_codes(#[case] error: TransportError, #[case] code: u16) {
        assert_eq!(error.close_code().get(), code);
    }

    #[test]
    fn rejection_reason_is_the_display_text() {
        let error = TransportError::Rejected {
            reason: "Invite expired".into(),
        };
        assert_eq!(error.to_string(), "Invite expired");
    }
}
