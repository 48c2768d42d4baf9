//! Construction options for [`crate::PeerSocket`].

use std::{fmt, sync::Arc};

use crate::{
    TransportConfig,
    channel::{IceServer, PeerFactory},
    signalling::{EstablishError, Signaller, SignallingCallbacks},
    upload::PendingUploads,
};

/// Collaborators and settings for one socket.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use peerframe::{
///     DeliveryMode, SocketOptions, TransportConfig, channel::IceServer, loopback::LoopbackConnector,
///     upload::PendingUploads,
/// };
///
/// let config = TransportConfig::default().with_delivery_mode(DeliveryMode::ReliableOrdered);
/// let connector = LoopbackConnector::new(&config).expect("valid configuration");
/// let options = SocketOptions::new(connector.factory(), connector.signaller())
///     .with_ice_servers(vec![IceServer::new("stun:stun.l.google.com:19302")])
///     .with_uploads(Arc::new(PendingUploads::new()))
///     .with_config(config)
///     .on_signalling_success(|| println!("connected"));
/// # drop(options);
/// ```
pub struct SocketOptions {
    pub(crate) factory: Arc<dyn PeerFactory>,
    pub(crate) signaller: Arc<dyn Signaller>,
    pub(crate) ice_servers: Vec<IceServer>,
    pub(crate) uploads: Arc<PendingUploads>,
    pub(crate) callbacks: SignallingCallbacks,
    pub(crate) config: TransportConfig,
}

impl SocketOptions {
    /// Options with no ICE servers, an empty upload table, and defaults.
    #[must_use]
    pub fn new(factory: Arc<dyn PeerFactory>, signaller: Arc<dyn Signaller>) -> Self {
        Self {
            factory,
            signaller,
            ice_servers: Vec::new(),
            uploads: Arc::default(),
            callbacks: SignallingCallbacks::new(),
            config: TransportConfig::default(),
        }
    }

    #[must_use]
    pub fn with_ice_servers(mut self, servers: Vec<IceServer>) -> Self {
        self.ice_servers = servers;
        self
    }

    /// Share a pending-uploads table with other sockets of the session.
    #[must_use]
    pub fn with_uploads(mut self, uploads: Arc<PendingUploads>) -> Self {
        self.uploads = uploads;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn on_signalling_success(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.callbacks = self.callbacks.on_success(callback);
        self
    }

    #[must_use]
    pub fn on_signalling_error(
        mut self,
        callback: impl FnOnce(&EstablishError) + Send + 'static,
    ) -> Self {
        self.callbacks = self.callbacks.on_error(callback);
        self
    }

    #[must_use]
    pub fn uploads(&self) -> &Arc<PendingUploads> { &self.uploads }

    #[must_use]
    pub fn config(&self) -> &TransportConfig { &self.config }
}

impl fmt::Debug for SocketOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketOptions")
            .field("ice_servers", &self.ice_servers)
            .field("uploads", &self.uploads.len())
            .field("callbacks", &self.callbacks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
