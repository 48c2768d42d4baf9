//! Events delivered to socket listeners.

use std::{fmt, sync::Arc};

use bytes::Bytes;
use derive_more::Display;

use super::CloseCode;
use crate::{LogicalMessage, TransportError};

/// Names under which listeners can register.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
pub enum EventKind {
    #[display("open")]
    Open,
    #[display("message")]
    Message,
    #[display("error")]
    Error,
    #[display("close")]
    Close,
}

impl EventKind {
    pub const ALL: [Self; 4] = [Self::Open, Self::Message, Self::Error, Self::Close];

    /// Look up an event by its listener name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.to_string() == name)
    }
}

/// A reassembled inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    data: String,
    attachments: Vec<Bytes>,
}

impl MessageEvent {
    /// Operation text as sent by the remote side.
    #[must_use]
    pub fn data(&self) -> &str { &self.data }

    /// Attachments referenced by positional pointers in the text.
    #[must_use]
    pub fn attachments(&self) -> &[Bytes] { &self.attachments }
}

impl From<LogicalMessage> for MessageEvent {
    fn from(message: LogicalMessage) -> Self {
        let (data, attachments) = message.into_parts();
        Self { data, attachments }
    }
}

/// Code and reason describing why the socket closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloseEvent {
    code: CloseCode,
    reason: String,
}

impl CloseEvent {
    #[must_use]
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> CloseCode { self.code }

    #[must_use]
    pub fn reason(&self) -> &str { &self.reason }
}

/// The error that is about to close the socket.
#[derive(Clone, Debug)]
pub struct ErrorEvent {
    error: Arc<TransportError>,
}

impl ErrorEvent {
    pub(crate) fn new(error: TransportError) -> Self {
        Self {
            error: Arc::new(error),
        }
    }

    #[must_use]
    pub fn error(&self) -> &TransportError { &self.error }

    /// Code of the close event that follows.
    #[must_use]
    pub fn code(&self) -> CloseCode { self.error.close_code() }

    /// Reason of the close event that follows.
    #[must_use]
    pub fn reason(&self) -> String { self.error.to_string() }

    pub(crate) fn close_event(&self) -> CloseEvent { CloseEvent::new(self.code(), self.reason()) }
}

/// Payload handed to listeners.
#[derive(Clone, Debug)]
pub enum SocketEvent {
    Open,
    Message(MessageEvent),
    Error(ErrorEvent),
    Close(CloseEvent),
}

impl SocketEvent {
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Open => EventKind::Open,
            Self::Message(_) => EventKind::Message,
            Self::Error(_) => EventKind::Error,
            Self::Close(_) => EventKind::Close,
        }
    }

    #[must_use]
    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_close(&self) -> Option<&CloseEvent> {
        match self {
            Self::Close(close) => Some(close),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_error(&self) -> Option<&ErrorEvent> {
        match self {
            Self::Error(error) => Some(error),
            _ => None,
        }
    }
}

/// Boxed error a listener may return.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of a listener call.
pub type ListenerResult = Result<(), ListenerError>;

/// Callback registered for socket events.
pub type Listener = Arc<dyn Fn(&SocketEvent) -> ListenerResult + Send + Sync>;

/// Box a closure as a [`Listener`].
pub fn listener<F>(callback: F) -> Listener
where
    F: Fn(&SocketEvent) -> ListenerResult + Send + Sync + 'static,
{
    Arc::new(callback)
}

/// Handle returned by [`crate::PeerSocket::add_event_listener`].
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[display("listener-{_0}")]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) const fn new(id: u64) -> Self { Self(id) }
}

/// Why delivering a message to listeners failed.
#[derive(Debug)]
pub(crate) enum ListenerFailure {
    Returned(ListenerError),
    Panicked(String),
}

impl fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Returned(err) => write!(f, "{err}"),
            Self::Panicked(message) => write!(f, "listener panicked: {message}"),
        }
    }
}
