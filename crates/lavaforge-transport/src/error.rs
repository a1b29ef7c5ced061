/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Opening the connection failed before the WebSocket upgrade.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// The node answered the upgrade request with a non-101 status.
    /// 401 means the configured password was rejected.
    #[error("handshake rejected with HTTP status {0}")]
    HandshakeRejected(u16),

    /// The URL or one of the handshake headers could not be encoded.
    #[error("invalid connect request: {0}")]
    InvalidRequest(String),

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
