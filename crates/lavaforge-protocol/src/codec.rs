//! Codec trait and the JSON implementation used on the node socket.
//!
//! Outbound [`Payload`](crate::Payload)s go through a [`Codec`] before they
//! reach the transport. Inbound frames are classified by
//! [`EventDecoder`](crate::EventDecoder) instead, because the node's
//! two-level discriminator (`op`, then `type`) needs a look at the raw
//! JSON before the target shape is known.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts serde types to frame bytes and back.
///
/// `Send + Sync + 'static` because the session keeps its codec inside
/// long-lived tasks that tokio may move between threads.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`. The node speaks nothing else.
///
/// ## Example
///
/// ```rust
/// use lavaforge_protocol::{Codec, GuildId, JsonCodec, Payload};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&Payload::stop(GuildId(7))).unwrap();
/// assert_eq!(bytes, br#"{"op":"stop","guildId":"7"}"#);
///
/// let back: Payload = codec.decode(&bytes).unwrap();
/// assert_eq!(back, Payload::stop(GuildId(7)));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
