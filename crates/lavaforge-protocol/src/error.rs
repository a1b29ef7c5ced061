//! Error types for the protocol layer.
//!
//! Each crate in Lavaforge defines its own error enum. A `ProtocolError`
//! always means the problem is in the bytes or values themselves, never in
//! the network: none of these are retried.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of an outbound payload failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// An inbound message was not valid JSON or had the wrong shape for
    /// its discriminator.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// A track signature violates the binary layout (bad base64,
    /// unsupported version, invalid string bytes, negative length).
    #[error("malformed track: {0}")]
    MalformedTrack(String),

    /// A read would run past the end of the buffer.
    ///
    /// Usually means a truncated signature or one produced by a foreign
    /// encoder.
    #[error("buffer underrun: needed {needed} bytes, {remaining} remaining")]
    BufferUnderrun {
        /// Bytes the read required.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// A string field does not fit a 16-bit length prefix.
    /// This is a programming error on the caller's side.
    #[error("field `{field}` is {len} bytes, the limit is 65535")]
    FieldTooLarge {
        /// Which track field overflowed.
        field: &'static str,
        /// Its encoded length in bytes.
        len: usize,
    },

    /// Volume outside `0..=1000`.
    #[error("invalid volume {0}: must be within 0..=1000")]
    InvalidVolume(i32),

    /// Equalizer band index outside `0..15` or gain outside `-0.25..=1.0`.
    #[error("invalid equalizer band {band} with gain {gain}")]
    InvalidBand {
        /// Band index (0-14).
        band: u8,
        /// Requested gain.
        gain: f32,
    },

    /// A filter parameter is out of its accepted range.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The inbound discriminator is not one this client knows about.
    /// The receive loop drops the message and keeps going.
    #[error("unknown event type `{0}`")]
    UnknownEventType(String),

    /// The message is invalid at the protocol level (e.g. no `op` field).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
