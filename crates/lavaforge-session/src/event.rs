//! Connection state and the notifications a session publishes.

use lavaforge_protocol::{GuildId, InboundEvent, NodeStats, Ready};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NodeState
// ---------------------------------------------------------------------------

/// The lifecycle state of a node connection.
///
/// ```text
/// Disconnected → Connecting → Connected ─(lost)→ Reconnecting → Connecting → …
///       ▲                                             │
///       └──────────── attempts exhausted ─────────────┘
///
/// any state ─(close)→ Closed
/// ```
///
/// - **Disconnected**: not connected and not trying. The initial state,
///   and where the session lands once reconnect attempts run out. Only an
///   explicit `connect()` leaves it.
/// - **Connecting**: a handshake is in flight.
/// - **Connected**: commands can be sent, events are flowing.
/// - **Reconnecting**: waiting out the interval before the next attempt.
/// - **Closed**: shut down by the application. Terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

impl NodeState {
    /// Returns `true` while the session owns a supervisor task.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Reconnecting)
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Reconnecting => write!(f, "Reconnecting"),
            Self::Closed => write!(f, "Closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// NodeEvent
// ---------------------------------------------------------------------------

/// A notification from a [`NodeSession`](crate::NodeSession) to its
/// listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// The node accepted the connection.
    Ready(Ready),

    /// A guild-scoped event, delivered after the guild's player (if any)
    /// applied it.
    Player {
        guild_id: GuildId,
        event: InboundEvent,
    },

    /// Periodic node statistics.
    Stats(NodeStats),

    /// The connection was lost; a reconnect attempt is scheduled.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
        /// No further attempt follows if this one fails.
        is_final: bool,
    },

    /// A reconnect attempt succeeded.
    Reconnected,

    /// Every reconnect attempt failed. The session is `Disconnected` and
    /// stays there until `connect()` is called again.
    Exhausted {
        attempts: u32,
    },

    /// The session was closed by the application.
    Closed,
}
