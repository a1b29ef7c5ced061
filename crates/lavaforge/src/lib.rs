//! # Lavaforge
//!
//! A client for Lavalink-compatible audio nodes.
//!
//! An audio node does the heavy lifting: it resolves tracks, decodes audio
//! and streams it into voice channels. Lavaforge keeps a session with the
//! node, tracks one player per guild, and turns the node's events back
//! into player state, including starting the next queued track when one
//! finishes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lavaforge::prelude::*;
//!
//! # async fn run() -> Result<(), LavaforgeError> {
//! let session = LavaforgeBuilder::new()
//!     .config(NodeConfig::from_env()?)
//!     .connect()
//!     .await?;
//!
//! let player = session.player(GuildId(614_000_000_000_000_001)).await;
//! // Voice credentials come from the chat platform's gateway.
//! player.connect("voice-session-id", "voice-token", "us-east.example.gg").await?;
//! player.play(Track::from_signature("QAAAjQIAJFJpY2sgQXN0bGV5...")?).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crates
//!
//! | Layer | Crate | |
//! |---|---|---|
//! | Transport | [`transport`] | `Connector` / `Connection`, WebSocket client |
//! | Protocol | [`protocol`] | track codec, commands, event decoding |
//! | Player | [`player`] | per-guild state machine and registry |
//! | Session | [`session`] | node connection, dispatch, reconnect |

mod client;
mod error;
pub mod logging;

pub use client::{ConnectError, LavaforgeBuilder, LavaforgeSession};
pub use error::LavaforgeError;

pub use lavaforge_player as player;
pub use lavaforge_protocol as protocol;
pub use lavaforge_session as session;
pub use lavaforge_transport as transport;

/// Everything an application usually needs, in one import.
pub mod prelude {
    pub use crate::{ConnectError, LavaforgeBuilder, LavaforgeError, LavaforgeSession};
    pub use lavaforge_player::{PlayerError, PlayerSnapshot, PlayerState};
    pub use lavaforge_protocol::{
        EqualizerBand, Filters, GuildId, InboundEvent, NodeStats, Payload, Track, TrackEndReason,
        TrackInfo, Volume,
    };
    pub use lavaforge_session::{
        NodeConfig, NodeEvent, NodeRest, NodeSession, NodeState, PlayerHandle, RestError,
        SessionError, SessionUpdate,
    };
}
