//! Outbound commands: what the client asks the node to do.
//!
//! Every command is one JSON object tagged by `op`:
//!
//! ```text
//! { "op": "seek", "guildId": "1234", "position": 60000 }
//! ```
//!
//! [`Payload`] is a plain value. Construct it with the associated
//! functions, which validate their arguments, and hand it to the session.

use serde::{Deserialize, Serialize};

use crate::filters::{EqualizerBand, Filters};
use crate::{GuildId, ProtocolError, Track, Volume};

/// The voice server credentials the node needs to join a voice channel.
///
/// These come from the chat platform's voice gateway; the client only
/// relays them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceServerUpdate {
    pub token: String,
    // The node expects the platform's snake_case key here.
    pub guild_id: GuildId,
    pub endpoint: String,
}

/// A command sent to the node.
///
/// `#[serde(tag = "op")]` puts the variant name in the `op` field and the
/// variant's fields next to it, matching the node's envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Payload {
    /// Start a track, replacing whatever is playing unless `no_replace`.
    Play {
        guild_id: GuildId,
        track: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        start_time: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        end_time: Option<u64>,
        #[serde(default)]
        no_replace: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        volume: Option<Volume>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pause: Option<bool>,
    },

    /// Pause (`true`) or resume (`false`).
    Pause { guild_id: GuildId, pause: bool },

    /// Stop the current track.
    Stop { guild_id: GuildId },

    /// Jump to a position in milliseconds.
    Seek { guild_id: GuildId, position: u64 },

    #[serde(rename = "volume")]
    SetVolume { guild_id: GuildId, volume: Volume },

    #[serde(rename = "equalizer")]
    SetEqualizer {
        guild_id: GuildId,
        bands: Vec<EqualizerBand>,
    },

    #[serde(rename = "filters")]
    SetFilters {
        guild_id: GuildId,
        #[serde(flatten)]
        filters: Filters,
    },

    /// Relay voice credentials so the node can join the channel.
    #[serde(rename = "voiceUpdate")]
    VoiceStateUpdate {
        guild_id: GuildId,
        session_id: String,
        event: VoiceServerUpdate,
    },

    /// Tear the player down on the node.
    Destroy { guild_id: GuildId },

    /// Ask the node to keep players alive for `timeout` seconds after a
    /// disconnect, so a reconnect presenting `key` can resume them.
    ConfigureResuming { key: String, timeout: u64 },
}

impl Payload {
    /// Plays `track` from its beginning, replacing the current one.
    pub fn play(guild_id: GuildId, track: &Track) -> Self {
        Self::Play {
            guild_id,
            track: track.signature().to_string(),
            start_time: None,
            end_time: None,
            no_replace: false,
            volume: None,
            pause: None,
        }
    }

    /// Plays `track` between two offsets (milliseconds).
    pub fn play_range(
        guild_id: GuildId,
        track: &Track,
        start_time: Option<u64>,
        end_time: Option<u64>,
    ) -> Self {
        Self::Play {
            guild_id,
            track: track.signature().to_string(),
            start_time,
            end_time,
            no_replace: false,
            volume: None,
            pause: None,
        }
    }

    pub fn pause(guild_id: GuildId, pause: bool) -> Self {
        Self::Pause { guild_id, pause }
    }

    pub fn stop(guild_id: GuildId) -> Self {
        Self::Stop { guild_id }
    }

    pub fn seek(guild_id: GuildId, position: u64) -> Self {
        Self::Seek { guild_id, position }
    }

    /// Sets the player volume.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidVolume`] unless `0 <= volume <= 1000`.
    pub fn set_volume(guild_id: GuildId, volume: i32) -> Result<Self, ProtocolError> {
        Ok(Self::SetVolume {
            guild_id,
            volume: Volume::new(volume)?,
        })
    }

    /// Sets equalizer bands. Bands not listed keep their current gain.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidBand`] for the first band outside range.
    pub fn set_equalizer(
        guild_id: GuildId,
        bands: impl IntoIterator<Item = EqualizerBand>,
    ) -> Result<Self, ProtocolError> {
        let bands: Vec<EqualizerBand> = bands.into_iter().collect();
        bands.iter().try_for_each(EqualizerBand::validate)?;
        Ok(Self::SetEqualizer { guild_id, bands })
    }

    /// Replaces the whole filter set.
    pub fn set_filters(guild_id: GuildId, filters: Filters) -> Result<Self, ProtocolError> {
        filters.validate()?;
        Ok(Self::SetFilters { guild_id, filters })
    }

    pub fn voice_update(
        guild_id: GuildId,
        session_id: impl Into<String>,
        token: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self::VoiceStateUpdate {
            guild_id,
            session_id: session_id.into(),
            event: VoiceServerUpdate {
                token: token.into(),
                guild_id,
                endpoint: endpoint.into(),
            },
        }
    }

    pub fn destroy(guild_id: GuildId) -> Self {
        Self::Destroy { guild_id }
    }

    pub fn configure_resuming(key: impl Into<String>, timeout_secs: u64) -> Self {
        Self::ConfigureResuming {
            key: key.into(),
            timeout: timeout_secs,
        }
    }

    /// Sets the `pause` flag of a `play` command. Other commands are
    /// returned unchanged.
    pub fn with_pause(mut self, paused: bool) -> Self {
        if let Self::Play { pause, .. } = &mut self {
            *pause = Some(paused);
        }
        self
    }

    /// The guild the command targets. `None` for node-wide commands.
    pub fn guild_id(&self) -> Option<GuildId> {
        match self {
            Self::Play { guild_id, .. }
            | Self::Pause { guild_id, .. }
            | Self::Stop { guild_id }
            | Self::Seek { guild_id, .. }
            | Self::SetVolume { guild_id, .. }
            | Self::SetEqualizer { guild_id, .. }
            | Self::SetFilters { guild_id, .. }
            | Self::VoiceStateUpdate { guild_id, .. }
            | Self::Destroy { guild_id } => Some(*guild_id),
            Self::ConfigureResuming { .. } => None,
        }
    }

    /// The wire `op` tag, for logging.
    pub fn op(&self) -> &'static str {
        match self {
            Self::Play { .. } => "play",
            Self::Pause { .. } => "pause",
            Self::Stop { .. } => "stop",
            Self::Seek { .. } => "seek",
            Self::SetVolume { .. } => "volume",
            Self::SetEqualizer { .. } => "equalizer",
            Self::SetFilters { .. } => "filters",
            Self::VoiceStateUpdate { .. } => "voiceUpdate",
            Self::Destroy { .. } => "destroy",
            Self::ConfigureResuming { .. } => "configureResuming",
        }
    }
}
