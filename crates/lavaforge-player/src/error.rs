//! Error types for the player layer.

use lavaforge_protocol::ProtocolError;

use crate::PlayerState;

/// Errors that can occur during player operations.
///
/// A failed operation never changes the player.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// The action isn't legal in the player's current state.
    /// For example, pausing a player that is `Stopped`.
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        /// State the player was in.
        from: PlayerState,
        /// The rejected action (`"play"`, `"pause"`, ...).
        action: &'static str,
    },

    /// Command arguments failed validation (volume, equalizer, filters).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
