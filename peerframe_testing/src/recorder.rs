//! Captures socket events for assertions.

use std::time::Duration;

use bytes::Bytes;
use peerframe::{PeerSocket, SocketEvent, socket::EventKind};
use tokio::sync::mpsc;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Owned copy of a socket event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recorded {
    Open,
    Message { data: String, attachments: Vec<Bytes> },
    Error { code: u16, reason: String },
    Close { code: u16, reason: String },
}

impl From<&SocketEvent> for Recorded {
    fn from(event: &SocketEvent) -> Self {
        match event {
            SocketEvent::Open => Self::Open,
            SocketEvent::Message(message) => Self::Message {
                data: message.data().to_owned(),
                attachments: message.attachments().to_vec(),
            },
            SocketEvent::Error(error) => Self::Error {
                code: error.code().get(),
                reason: error.reason(),
            },
            SocketEvent::Close(close) => Self::Close {
                code: close.code().get(),
                reason: close.reason().to_owned(),
            },
        }
    }
}

/// Listener set recording every event a socket fires, in order.
///
/// Attach before the test yields to the runtime so no event is missed.
#[derive(Debug)]
pub struct EventRecorder {
    events: mpsc::UnboundedReceiver<Recorded>,
}

impl EventRecorder {
    pub fn attach(socket: &PeerSocket) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        for kind in EventKind::ALL {
            let tx = tx.clone();
            socket.add_event_listener(&kind.to_string(), move |event: &SocketEvent| {
                let _ = tx.send(Recorded::from(event));
                Ok(())
            });
        }
        Self { events }
    }

    /// Wait for the next event.
    ///
    /// # Panics
    ///
    /// Panics if no event arrives within five seconds.
    pub async fn next(&mut self) -> Recorded {
        tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
            .await
            .expect("timed out waiting for a socket event")
            .expect("socket dropped its listeners")
    }

    /// Take an already recorded event without waiting.
    pub fn try_next(&mut self) -> Option<Recorded> { self.events.try_recv().ok() }

    /// # Panics
    ///
    /// Panics unless the next event is `open`.
    pub async fn expect_open(&mut self) {
        assert_eq!(self.next().await, Recorded::Open);
    }

    /// # Panics
    ///
    /// Panics unless the next event is `message`.
    pub async fn expect_message(&mut self) -> (String, Vec<Bytes>) {
        match self.next().await {
            Recorded::Message { data, attachments } => (data, attachments),
            other => panic!("expected message event, got {other:?}"),
        }
    }

    /// # Panics
    ///
    /// Panics unless the next event is `error`.
    pub async fn expect_error(&mut self) -> (u16, String) {
        match self.next().await {
            Recorded::Error { code, reason } => (code, reason),
            other => panic!("expected error event, got {other:?}"),
        }
    }

    /// # Panics
    ///
    /// Panics unless the next event is `close`.
    pub async fn expect_close(&mut self) -> (u16, String) {
        match self.next().await {
            Recorded::Close { code, reason } => (code, reason),
            other => panic!("expected close event, got {other:?}"),
        }
    }
}
