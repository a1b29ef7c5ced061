//! Inbound messages: what the node tells the client.
//!
//! The node sends one JSON object per frame, discriminated by `op`. Track
//! lifecycle notifications share `op: "event"` and are further
//! discriminated by `type`:
//!
//! ```text
//! { "op": "playerUpdate", "guildId": "1", "state": { ... } }
//! { "op": "event", "type": "TrackEndEvent", "guildId": "1", "reason": "FINISHED", ... }
//! ```
//!
//! [`EventDecoder::decode`] reads both discriminators first and only then
//! deserializes the matching shape, so an unknown discriminator is reported
//! as [`ProtocolError::UnknownEventType`] rather than a generic parse
//! failure. The caller drops such messages and keeps reading.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{GuildId, ProtocolError};

// ---------------------------------------------------------------------------
// Event records
// ---------------------------------------------------------------------------

/// Sent once after the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ready {
    /// Whether the node resumed players from a previous session.
    #[serde(default)]
    pub resumed: bool,
    /// The node's id for this session, used by the REST API.
    pub session_id: String,
}

/// Periodic player position report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerUpdateState {
    /// Node wall-clock time of the report, unix milliseconds.
    pub time: u64,
    /// Playback position in milliseconds.
    #[serde(default)]
    pub position: u64,
    /// Whether the node is connected to the voice gateway.
    #[serde(default)]
    pub connected: bool,
    /// Voice gateway round trip in milliseconds, -1 if unknown.
    #[serde(default = "unknown_ping")]
    pub ping: i64,
}

fn unknown_ping() -> i64 {
    -1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerUpdate {
    pub guild_id: GuildId,
    pub state: PlayerUpdateState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub free: u64,
    pub used: u64,
    pub allocated: u64,
    pub reservable: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuStats {
    pub cores: u32,
    pub system_load: f64,
    /// Load caused by the node process itself.
    #[serde(rename = "lavalinkLoad", alias = "nodeLoad")]
    pub node_load: f64,
}

/// Audio frame delivery over the last minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameStats {
    pub sent: i64,
    pub nulled: i64,
    pub deficit: i64,
}

/// Node-wide statistics, sent about once a minute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStats {
    pub players: u32,
    pub playing_players: u32,
    /// Milliseconds since the node started.
    pub uptime: u64,
    pub memory: MemoryStats,
    pub cpu: CpuStats,
    /// Absent when no player produced audio frames.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_stats: Option<FrameStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStarted {
    pub guild_id: GuildId,
    /// Signature of the track that started.
    #[serde(default)]
    pub track: Option<String>,
}

/// Why a track stopped playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackEndReason {
    /// Played to the end.
    #[serde(rename = "FINISHED", alias = "finished")]
    Finished,
    /// Failed to start.
    #[serde(rename = "LOAD_FAILED", alias = "loadFailed")]
    LoadFailed,
    /// Stopped by a `stop` command.
    #[serde(rename = "STOPPED", alias = "stopped")]
    Stopped,
    /// Superseded by a new `play`.
    #[serde(rename = "REPLACED", alias = "replaced")]
    Replaced,
    /// The player was cleaned up (e.g. idle for too long).
    #[serde(rename = "CLEANUP", alias = "cleanup")]
    Cleanup,
}

impl TrackEndReason {
    /// Whether the player should move on to the next queued track.
    ///
    /// Only `Replaced` does not: a newer `play` already took over.
    pub fn may_start_next(self) -> bool {
        !matches!(self, Self::Replaced)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEnded {
    pub guild_id: GuildId,
    #[serde(default)]
    pub track: Option<String>,
    pub reason: TrackEndReason,
}

/// How bad a playback exception is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Expected failure (unavailable video, region lock).
    #[serde(rename = "COMMON", alias = "common")]
    Common,
    /// Unexpected failure, possibly caused by the source changing.
    #[serde(rename = "SUSPICIOUS", alias = "suspicious")]
    Suspicious,
    /// A bug or environment problem on the node.
    #[serde(rename = "FAULT", alias = "fault")]
    Fault,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackException {
    #[serde(default)]
    pub message: Option<String>,
    pub severity: Severity,
    #[serde(default)]
    pub cause: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackExceptionEvent {
    pub guild_id: GuildId,
    #[serde(default)]
    pub track: Option<String>,
    pub exception: TrackException,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStuck {
    pub guild_id: GuildId,
    #[serde(default)]
    pub track: Option<String>,
    pub threshold_ms: u64,
}

/// The node's voice WebSocket for a guild was closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketClosed {
    pub guild_id: GuildId,
    pub code: u16,
    #[serde(default)]
    pub reason: String,
    pub by_remote: bool,
}

// ---------------------------------------------------------------------------
// InboundEvent
// ---------------------------------------------------------------------------

/// Any message the node can send.
///
/// Every variant except [`Ready`](Self::Ready) and [`Stats`](Self::Stats)
/// is scoped to one guild; see [`guild_id`](Self::guild_id).
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Ready(Ready),
    PlayerUpdate(PlayerUpdate),
    Stats(NodeStats),
    TrackStarted(TrackStarted),
    TrackEnded(TrackEnded),
    TrackException(TrackExceptionEvent),
    TrackStuck(TrackStuck),
    SocketClosed(SocketClosed),
}

impl InboundEvent {
    /// The guild this event concerns, or `None` for node-wide events.
    pub fn guild_id(&self) -> Option<GuildId> {
        match self {
            Self::Ready(_) | Self::Stats(_) => None,
            Self::PlayerUpdate(e) => Some(e.guild_id),
            Self::TrackStarted(e) => Some(e.guild_id),
            Self::TrackEnded(e) => Some(e.guild_id),
            Self::TrackException(e) => Some(e.guild_id),
            Self::TrackStuck(e) => Some(e.guild_id),
            Self::SocketClosed(e) => Some(e.guild_id),
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ready(_) => "ready",
            Self::PlayerUpdate(_) => "playerUpdate",
            Self::Stats(_) => "stats",
            Self::TrackStarted(_) => "TrackStartEvent",
            Self::TrackEnded(_) => "TrackEndEvent",
            Self::TrackException(_) => "TrackExceptionEvent",
            Self::TrackStuck(_) => "TrackStuckEvent",
            Self::SocketClosed(_) => "WebSocketClosedEvent",
        }
    }
}

// ---------------------------------------------------------------------------
// EventDecoder
// ---------------------------------------------------------------------------

/// Classifies raw inbound frames into [`InboundEvent`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventDecoder;

impl EventDecoder {
    /// Decodes one inbound frame.
    ///
    /// # Errors
    /// - [`ProtocolError::Decode`] if the frame is not JSON or a known
    ///   discriminator carries the wrong fields.
    /// - [`ProtocolError::InvalidMessage`] if `op` (or `type` for events)
    ///   is missing.
    /// - [`ProtocolError::UnknownEventType`] for an unrecognized `op` or
    ///   event `type`.
    pub fn decode(&self, data: &[u8]) -> Result<InboundEvent, ProtocolError> {
        let value: Value = serde_json::from_slice(data).map_err(ProtocolError::Decode)?;
        let op = discriminator(&value, "op")?;

        match op.as_str() {
            "ready" => parse(value).map(InboundEvent::Ready),
            "playerUpdate" => parse(value).map(InboundEvent::PlayerUpdate),
            "stats" => parse(value).map(InboundEvent::Stats),
            "event" => {
                let kind = discriminator(&value, "type")?;
                match kind.as_str() {
                    "TrackStartEvent" => parse(value).map(InboundEvent::TrackStarted),
                    "TrackEndEvent" => parse(value).map(InboundEvent::TrackEnded),
                    "TrackExceptionEvent" => parse(value).map(InboundEvent::TrackException),
                    "TrackStuckEvent" => parse(value).map(InboundEvent::TrackStuck),
                    "WebSocketClosedEvent" => parse(value).map(InboundEvent::SocketClosed),
                    _ => Err(ProtocolError::UnknownEventType(kind)),
                }
            }
            _ => Err(ProtocolError::UnknownEventType(op)),
        }
    }
}

fn discriminator(value: &Value, field: &str) -> Result<String, ProtocolError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| ProtocolError::InvalidMessage(format!("missing `{field}` discriminator")))
}

fn parse<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(ProtocolError::Decode)
}
