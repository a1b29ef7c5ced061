//! Wire protocol for Lavaforge.
//!
//! This crate defines the "language" the client and the audio node speak:
//!
//! - **Tracks** ([`Track`], [`TrackInfo`]): the base64 signature format the
//!   node uses to identify a track, built on the [`cursor`] primitives.
//! - **Commands** ([`Payload`]): what the client asks the node to do.
//! - **Events** ([`InboundEvent`], [`EventDecoder`]): what the node reports.
//! - **Codec** ([`Codec`], [`JsonCodec`]): how commands become frame bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong in all of the above.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the player
//! and session layers. It doesn't know about connections or players. It
//! only knows how values look on the wire.
//!
//! ```text
//! Transport (frames) → Protocol (Payload / InboundEvent) → Player, Session
//! ```

mod codec;
pub mod cursor;
mod error;
mod event;
pub mod filters;
mod payload;
mod track;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use event::{
    CpuStats, EventDecoder, FrameStats, InboundEvent, MemoryStats, NodeStats, PlayerUpdate,
    PlayerUpdateState, Ready, Severity, SocketClosed, TrackEndReason, TrackEnded, TrackException,
    TrackExceptionEvent, TrackStarted, TrackStuck,
};
pub use filters::{EqualizerBand, Filters};
pub use payload::{Payload, VoiceServerUpdate};
pub use track::{Track, TrackInfo};
pub use types::{GuildId, MAX_VOLUME, Volume};
