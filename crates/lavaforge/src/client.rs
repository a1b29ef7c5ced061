//! `LavaforgeBuilder`, the entry point for talking to a node over
//! WebSocket.
//!
//! It ties the layers together: transport → protocol → player → session.

use std::fmt;

use lavaforge_session::{NoRest, NodeConfig, NodeRest, NodeSession};
use lavaforge_transport::WebSocketConnector;

use crate::LavaforgeError;

/// A node session over the bundled WebSocket connector.
pub type LavaforgeSession<R = NoRest> = NodeSession<WebSocketConnector, R>;

/// Builder for a node session.
///
/// # Example
///
/// ```rust,no_run
/// use lavaforge::prelude::*;
///
/// # async fn run() -> Result<(), LavaforgeError> {
/// let session = LavaforgeBuilder::new()
///     .config(NodeConfig::new("127.0.0.1", 2333).password("youshallnotpass"))
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct LavaforgeBuilder<R: NodeRest = NoRest> {
    config: NodeConfig,
    rest: R,
}

impl LavaforgeBuilder<NoRest> {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: NodeConfig::default(),
            rest: NoRest,
        }
    }
}

impl Default for LavaforgeBuilder<NoRest> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: NodeRest> LavaforgeBuilder<R> {
    /// Sets the node configuration.
    pub fn config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the REST client used to resume node sessions.
    pub fn rest<T: NodeRest>(self, rest: T) -> LavaforgeBuilder<T> {
        LavaforgeBuilder {
            config: self.config,
            rest,
        }
    }

    /// Builds the session without connecting.
    ///
    /// Subscribe to the session before calling
    /// [`connect`](NodeSession::connect) to see its `Ready` event.
    pub fn build(self) -> Result<LavaforgeSession<R>, LavaforgeError> {
        Ok(NodeSession::with_rest(
            self.config,
            WebSocketConnector,
            self.rest,
        )?)
    }

    /// Builds the session and connects it.
    ///
    /// If the first handshake fails the session is already `Reconnecting`
    /// in the background. The error carries it, so the caller can keep it
    /// with [`ConnectError::into_session`] or shut it down.
    pub async fn connect(self) -> Result<LavaforgeSession<R>, ConnectError<R>> {
        tracing::info!(
            url = %self.config.url(),
            client = %self.config.client_name,
            "Lavaforge v{} connecting",
            env!("CARGO_PKG_VERSION")
        );
        let session = self.build().map_err(|error| ConnectError {
            session: None,
            error,
        })?;
        match session.connect().await {
            Ok(()) => Ok(session),
            Err(e) => Err(ConnectError {
                session: Some(session),
                error: e.into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectError
// ---------------------------------------------------------------------------

/// Returned by [`LavaforgeBuilder::connect`] when the session could not
/// be built or its first handshake failed.
///
/// Converting it into a [`LavaforgeError`] drops the handle, but a session
/// that was built keeps retrying until it reconnects or runs out of
/// attempts.
#[derive(thiserror::Error)]
#[error("{error}")]
pub struct ConnectError<R: NodeRest = NoRest> {
    session: Option<LavaforgeSession<R>>,
    #[source]
    error: LavaforgeError,
}

impl<R: NodeRest> ConnectError<R> {
    /// Why connecting failed.
    pub fn error(&self) -> &LavaforgeError {
        &self.error
    }

    /// The session, still reconnecting. `None` if it was never built.
    pub fn session(&self) -> Option<&LavaforgeSession<R>> {
        self.session.as_ref()
    }

    pub fn into_session(self) -> Option<LavaforgeSession<R>> {
        self.session
    }
}

impl<R: NodeRest> fmt::Debug for ConnectError<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectError")
            .field("error", &self.error)
            .field("state", &self.session.as_ref().map(NodeSession::state))
            .finish()
    }
}

impl<R: NodeRest> From<ConnectError<R>> for LavaforgeError {
    fn from(e: ConnectError<R>) -> Self {
        e.error
    }
}
