//! The offer/answer exchange that brings a peer connection up.

use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info};

use super::{Signaller, SignallingError};
use crate::channel::{
    IceConnectionState,
    PeerConfig,
    PeerConnection,
    PeerError,
    PeerEvent,
    PeerFactory,
};

/// Reasons establishment can fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EstablishError {
    #[error(transparent)]
    Signalling(#[from] SignallingError),
    #[error(transparent)]
    Peer(#[from] PeerError),
    /// ICE negotiation did not find a working candidate pair.
    #[error("ICE negotiation failed")]
    IceFailed,
    /// Connectivity dropped while the channel was coming up.
    #[error("Connection lost")]
    IceDisconnected,
    /// The peer closed before its data channel connected.
    #[error("peer closed before connecting")]
    Closed,
    /// The socket was closed while establishment was still running.
    #[error("socket closed during establishment")]
    Cancelled,
    #[error("peer did not connect within {0:?}")]
    Timeout(Duration),
}

/// A connected peer plus any datagrams that arrived during the handshake.
pub struct EstablishedPeer {
    pub connection: Box<dyn PeerConnection>,
    /// Datagrams received before the connected event, in arrival order.
    pub early_data: Vec<Bytes>,
}

impl std::fmt::Debug for EstablishedPeer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EstablishedPeer")
            .field("early_data", &self.early_data.len())
            .finish_non_exhaustive()
    }
}

/// Negotiate one peer connection.
///
/// The peer is created as the offering side with candidate trickling
/// disabled, so the offer carries every local candidate and the answer
/// brings back the remote ones in a single round trip. Nothing is retried.
///
/// # Errors
///
/// Returns [`EstablishError`] when the peer cannot be created, signalling
/// fails, ICE fails or disconnects, the peer closes, or `timeout` elapses
/// before the peer reports connected. The peer is released on every error.
pub async fn establish(
    factory: &dyn PeerFactory,
    signaller: &dyn Signaller,
    config: PeerConfig,
    timeout: Option<Duration>,
) -> Result<EstablishedPeer, EstablishError> {
    let attempt = negotiate(factory, signaller, config);
    match timeout {
        Some(limit) => tokio::time::timeout(limit, attempt)
            .await
            .map_err(|_| EstablishError::Timeout(limit))?,
        None => attempt.await,
    }
}

async fn negotiate(
    factory: &dyn PeerFactory,
    signaller: &dyn Signaller,
    config: PeerConfig,
) -> Result<EstablishedPeer, EstablishError> {
    let mut peer = factory.create(config).await?;
    match handshake(peer.as_mut(), signaller).await {
        Ok(early_data) => Ok(EstablishedPeer {
            connection: peer,
            early_data,
        }),
        Err(err) => {
            peer.close().await;
            Err(err)
        }
    }
}

async fn handshake(
    peer: &mut dyn PeerConnection,
    signaller: &dyn Signaller,
) -> Result<Vec<Bytes>, EstablishError> {
    let offer = peer.create_offer().await?;
    debug!("local offer ready; contacting signalling service");

    let answer = signaller.connect_to_peer(offer).await?;
    peer.apply_answer(answer.answer).await?;
    let candidates = answer.ice_candidates.len();
    for candidate in answer.ice_candidates {
        peer.add_ice_candidate(candidate).await?;
    }
    debug!(candidates, "remote answer applied");

    let mut early_data = Vec::new();
    loop {
        match peer.next_event().await {
            Some(PeerEvent::Connected) => {
                info!("peer connected");
                return Ok(early_data);
            }
            Some(PeerEvent::Data(datagram)) => early_data.push(datagram),
            Some(PeerEvent::IceStateChange(IceConnectionState::Disconnected)) => {
                return Err(EstablishError::IceDisconnected);
            }
            Some(PeerEvent::IceStateChange(IceConnectionState::Failed)) => {
                return Err(EstablishError::IceFailed);
            }
            Some(PeerEvent::IceStateChange(state)) => debug!(?state, "ICE state changed"),
            Some(PeerEvent::Error(message)) => {
                return Err(PeerError::Remote(message).into());
            }
            Some(PeerEvent::Closed) | None => return Err(EstablishError::Closed),
        }
    }
}
