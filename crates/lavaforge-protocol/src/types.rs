//! Identity and value types shared by every layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// A chat-platform guild (server) id.
///
/// Guild ids are 64-bit snowflakes. JavaScript-based tooling can't hold
/// them as numbers without losing precision, so the wire format carries
/// them as decimal strings: `GuildId(42)` becomes `"42"`. Plain numbers are
/// still accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "RawGuildId")]
pub struct GuildId(pub u64);

impl fmt::Display for GuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GuildId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(GuildId).map_err(|_| {
            ProtocolError::InvalidMessage(format!("invalid guild id `{s}`"))
        })
    }
}

impl From<u64> for GuildId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<GuildId> for String {
    fn from(id: GuildId) -> Self {
        id.0.to_string()
    }
}

/// Either representation a guild id may arrive in.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawGuildId {
    Text(String),
    Number(u64),
}

impl TryFrom<RawGuildId> for GuildId {
    type Error = ProtocolError;

    fn try_from(raw: RawGuildId) -> Result<Self, Self::Error> {
        match raw {
            RawGuildId::Text(s) => s.parse(),
            RawGuildId::Number(n) => Ok(Self(n)),
        }
    }
}

/// Highest volume the node accepts (percent).
pub const MAX_VOLUME: i32 = 1000;

/// A player volume in percent, `0..=1000`. 100 leaves the audio as is.
///
/// The only ways to get one are [`Volume::new`] and deserializing, and both
/// check the range, so a [`Payload`](crate::Payload) can't carry a volume
/// the node would reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "i32")]
pub struct Volume(u16);

impl Volume {
    /// # Errors
    /// [`ProtocolError::InvalidVolume`] unless `0 <= percent <= 1000`.
    pub fn new(percent: i32) -> Result<Self, ProtocolError> {
        if !(0..=MAX_VOLUME).contains(&percent) {
            return Err(ProtocolError::InvalidVolume(percent));
        }
        u16::try_from(percent)
            .map(Self)
            .map_err(|_| ProtocolError::InvalidVolume(percent))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl TryFrom<i32> for Volume {
    type Error = ProtocolError;

    fn try_from(percent: i32) -> Result<Self, Self::Error> {
        Self::new(percent)
    }
}

impl From<Volume> for u16 {
    fn from(volume: Volume) -> Self {
        volume.0
    }
}
