//! Unified error type for Lavaforge.

use lavaforge_player::PlayerError;
use lavaforge_protocol::ProtocolError;
use lavaforge_session::SessionError;
use lavaforge_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `lavaforge` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LavaforgeError {
    /// A transport-level error (handshake, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (track codec, payload validation, decoding).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A player rejected an action.
    #[error(transparent)]
    Player(#[from] PlayerError),

    /// A session-level error (not connected, closed, bad config).
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use lavaforge_player::PlayerState;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let lavaforge_err: LavaforgeError = err.into();
        assert!(matches!(lavaforge_err, LavaforgeError::Transport(_)));
        assert!(lavaforge_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidVolume(2_000);
        let lavaforge_err: LavaforgeError = err.into();
        assert!(matches!(lavaforge_err, LavaforgeError::Protocol(_)));
    }

    #[test]
    fn test_from_player_error() {
        let err = PlayerError::InvalidTransition {
            from: PlayerState::Stopped,
            action: "pause",
        };
        let lavaforge_err: LavaforgeError = err.into();
        assert!(matches!(lavaforge_err, LavaforgeError::Player(_)));
        assert_eq!(lavaforge_err.to_string(), "cannot pause while Stopped");
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::NotConnected;
        let lavaforge_err: LavaforgeError = err.into();
        assert!(matches!(lavaforge_err, LavaforgeError::Session(_)));
    }
}
