//! Error types for the session layer.

use lavaforge_player::PlayerError;
use lavaforge_protocol::ProtocolError;
use lavaforge_transport::TransportError;

/// Errors that can occur while talking to a node.
///
/// Write-path errors ([`NotConnected`](Self::NotConnected),
/// [`Transport`](Self::Transport)) are surfaced to the caller and never
/// retried automatically. Connection loss is handled by the reconnect
/// policy and reported through [`NodeEvent`](crate::NodeEvent)s instead.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session isn't `Connected`, so nothing can be sent.
    #[error("not connected to the node")]
    NotConnected,

    /// The session was closed. It can't be used again.
    #[error("session is closed")]
    Closed,

    /// `connect()` was called while the session is already connecting,
    /// connected or reconnecting.
    #[error("session is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A player rejected the action (illegal transition, bad argument).
    #[error(transparent)]
    Player(#[from] PlayerError),

    /// The node configuration is unusable (empty host, port 0, bad env).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
