//! Session establishment over an external signalling service.
//!
//! [`establish`] creates the offering peer, trades its offer for the remote
//! answer through a [`Signaller`], applies the answer and the bundled ICE
//! candidates, and waits for the data channel to connect.

mod callbacks;
mod establish;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use callbacks::SignallingCallbacks;
pub use establish::{EstablishError, EstablishedPeer, establish};

use crate::channel::{IceCandidate, SessionDescription};

/// Remote response to an offer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalAnswer {
    pub answer: SessionDescription,
    #[serde(default)]
    pub ice_candidates: Vec<IceCandidate>,
}

/// Failures reported by the signalling service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignallingError {
    /// The service could not be reached.
    #[error("signalling service unavailable: {0}")]
    Unavailable(String),
    /// The service refused to connect us to the peer.
    #[error("signalling rejected: {0}")]
    Rejected(String),
}

/// Exchanges a local offer for the remote peer's answer.
#[async_trait]
pub trait Signaller: Send + Sync {
    async fn connect_to_peer(
        &self,
        offer: SessionDescription,
    ) -> Result<SignalAnswer, SignallingError>;
}
