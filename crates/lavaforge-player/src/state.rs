//! Player lifecycle state machine.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PlayerState
// ---------------------------------------------------------------------------

/// The lifecycle state of a guild's player.
///
/// ```text
///                 ┌──────────── play ────────────┐
///                 ▼                              │
/// Disconnected → Connected → Playing ⇄ Paused → Stopped
///       ▲                       │                ▲
///       │                       └──── stop ──────┘
///       └──────────── from any state ─────────────
/// ```
///
/// - **Disconnected**: no voice connection. Nothing can be played until
///   voice credentials are relayed. This is the initial state, and every
///   state may fall back to it (forced teardown, voice socket closed).
/// - **Connected**: voice is up, nothing has been played yet.
/// - **Playing**: a track is current and audible.
/// - **Paused**: a track is current but paused.
/// - **Stopped**: playback ended (explicit stop, or the queue ran dry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerState {
    #[default]
    Disconnected,
    Connected,
    Playing,
    Paused,
    Stopped,
}

impl PlayerState {
    /// Returns `true` if the player has a voice connection.
    pub fn is_connected(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }

    /// Returns `true` if a track is current (playing or paused).
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }

    /// Returns `true` if moving to `target` follows an edge of the
    /// lifecycle graph.
    ///
    /// This is the state-level rule only. Individual actions are stricter:
    /// `resume` needs `Paused` even though `Stopped → Playing` is an edge.
    pub fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (_, Self::Disconnected) => true,
            (Self::Disconnected, Self::Connected) => true,
            (Self::Disconnected, _) => false,
            (_, Self::Connected) => false,
            (Self::Playing, Self::Paused) => true,
            (_, Self::Paused) => false,
            (_, Self::Playing) | (_, Self::Stopped) => true,
        }
    }
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connected => write!(f, "Connected"),
            Self::Playing => write!(f, "Playing"),
            Self::Paused => write!(f, "Paused"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}
