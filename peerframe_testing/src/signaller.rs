//! Signalling service double.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use peerframe::{
    channel::{IceCandidate, SessionDescription},
    signalling::{SignalAnswer, Signaller, SignallingError},
};

enum Behaviour {
    Answer(SignalAnswer),
    Fail(SignallingError),
    Hang,
}

/// [`Signaller`] returning a canned response and recording offers.
pub struct StubSignaller {
    behaviour: Behaviour,
    offers: Mutex<Vec<SessionDescription>>,
}

impl StubSignaller {
    /// Answer every offer with one bundled candidate.
    #[must_use]
    pub fn answering() -> Self {
        Self::with_answer(SignalAnswer {
            answer: SessionDescription::answer("v=0 stub answer"),
            ice_candidates: vec![IceCandidate::new(
                "candidate:1 1 UDP 2122260223 192.0.2.10 50000 typ host",
            )],
        })
    }

    #[must_use]
    pub fn with_answer(answer: SignalAnswer) -> Self { Self::new(Behaviour::Answer(answer)) }

    #[must_use]
    pub fn failing(error: SignallingError) -> Self { Self::new(Behaviour::Fail(error)) }

    /// Never respond.
    #[must_use]
    pub fn hanging() -> Self { Self::new(Behaviour::Hang) }

    /// Offers received so far.
    #[must_use]
    pub fn offers(&self) -> Vec<SessionDescription> {
        self.offers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            offers: Mutex::default(),
        }
    }
}

#[async_trait]
impl Signaller for StubSignaller {
    async fn connect_to_peer(
        &self,
        offer: SessionDescription,
    ) -> Result<SignalAnswer, SignallingError> {
        self.offers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(offer);
        match &self.behaviour {
            Behaviour::Answer(answer) => Ok(answer.clone()),
            Behaviour::Fail(error) => Err(error.clone()),
            Behaviour::Hang => futures::future::pending().await,
        }
    }
}
