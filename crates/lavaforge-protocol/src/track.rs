//! Track signatures: the node's compact binary description of a track.
//!
//! A signature is base64 text wrapping one "message" in the audio engine's
//! framing:
//!
//! ```text
//! [i32 header]  top 2 bits = flags, low 30 bits = body size
//! body:
//!   [u8 version]            only if flags & VERSIONED
//!   [utf title] [utf author] [i64 length ms] [utf identifier] [bool stream]
//!   [bool + utf uri]        version >= 2
//!   [bool + utf artwork]    version >= 3
//!   [bool + utf isrc]       version >= 3
//!   [utf source name]
//!   [source specific bytes] opaque, source-defined
//!   [i64 position ms]
//! [i32 0]       end-of-stream marker (ignored on decode)
//! ```
//!
//! Decoding only trusts the header's size: the body is read from exactly
//! that many bytes, so anything after it (the marker, or nothing at all
//! for signatures that were written without one) is irrelevant.

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;
use crate::cursor::{MAX_UTF_LEN, ReadCursor, WriteCursor, modified_utf8_len};

/// Header flag: an explicit version byte follows the header.
const FLAG_VERSIONED: u32 = 1;

/// The flags live in the two highest header bits.
const FLAG_SHIFT: u32 = 30;

/// Mask for the body size in the low 30 bits.
const SIZE_MASK: u32 = (1 << FLAG_SHIFT) - 1;

/// Format written for tracks without artwork or ISRC.
const VERSION_URI: u8 = 2;

/// Format written when artwork or ISRC is present.
const VERSION_EXTENDED: u8 = 3;

const HEADER_LEN: usize = 4;
const MARKER_LEN: usize = 4;

// ---------------------------------------------------------------------------
// TrackInfo
// ---------------------------------------------------------------------------

/// Every field a signature carries.
///
/// Two infos are equal when every field matches. Decoding a signature
/// produced by [`TrackInfo::encode`] gives back an equal value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackInfo {
    /// Source-specific identifier (a video id, a file path, ...).
    pub identifier: String,
    /// Display title.
    pub title: String,
    /// Display author or uploader.
    pub author: String,
    /// Length in milliseconds. Live streams report `i64::MAX`.
    pub length: u64,
    /// `true` for live streams without a fixed length.
    pub is_stream: bool,
    /// Name of the source manager that resolved the track (e.g. `youtube`).
    /// Empty when decoded from a layout that predates the field.
    pub source_name: String,
    /// Playable URI, if the source has one.
    pub uri: Option<String>,
    /// Cover art URL.
    pub artwork_url: Option<String>,
    /// International Standard Recording Code.
    pub isrc: Option<String>,
    /// Source-specific trailing data, carried through untouched.
    pub source_data: Vec<u8>,
    /// Start position in milliseconds.
    pub position: u64,
}

impl TrackInfo {
    fn version(&self) -> u8 {
        if self.artwork_url.is_some() || self.isrc.is_some() {
            VERSION_EXTENDED
        } else {
            VERSION_URI
        }
    }

    /// Exact size of the message body this info encodes to.
    ///
    /// Fails with [`ProtocolError::FieldTooLarge`] before anything is
    /// written if a string would overflow its length prefix.
    fn body_len(&self) -> Result<usize, ProtocolError> {
        fn utf(field: &'static str, value: &str) -> Result<usize, ProtocolError> {
            let len = modified_utf8_len(value);
            if len > MAX_UTF_LEN {
                return Err(ProtocolError::FieldTooLarge { field, len });
            }
            Ok(2 + len)
        }
        fn nullable(
            field: &'static str,
            value: Option<&str>,
        ) -> Result<usize, ProtocolError> {
            Ok(1 + value.map_or(Ok(0), |v| utf(field, v))?)
        }

        let version = self.version();
        // version byte + length + stream flag + position
        let mut len = 1 + 8 + 1 + 8;
        len += utf("title", &self.title)?;
        len += utf("author", &self.author)?;
        len += utf("identifier", &self.identifier)?;
        len += nullable("uri", self.uri.as_deref())?;
        if version >= VERSION_EXTENDED {
            len += nullable("artwork_url", self.artwork_url.as_deref())?;
            len += nullable("isrc", self.isrc.as_deref())?;
        }
        len += utf("source_name", &self.source_name)?;
        len += self.source_data.len();
        Ok(len)
    }

    /// Encodes this info into raw signature bytes (before base64).
    ///
    /// The buffer is sized up front, so the header insertion at the end
    /// shifts bytes in place without reallocating.
    pub fn encode_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        let body_len = self.body_len()?;
        if body_len > SIZE_MASK as usize {
            return Err(ProtocolError::FieldTooLarge {
                field: "source_data",
                len: self.source_data.len(),
            });
        }

        let version = self.version();
        let mut out = WriteCursor::with_capacity(HEADER_LEN + body_len + MARKER_LEN);

        out.write_u8(version);
        out.write_utf("title", &self.title)?;
        out.write_utf("author", &self.author)?;
        out.write_i64(clamp_to_i64(self.length));
        out.write_utf("identifier", &self.identifier)?;
        out.write_bool(self.is_stream);
        out.write_nullable_utf("uri", self.uri.as_deref())?;
        if version >= VERSION_EXTENDED {
            out.write_nullable_utf("artwork_url", self.artwork_url.as_deref())?;
            out.write_nullable_utf("isrc", self.isrc.as_deref())?;
        }
        out.write_utf("source_name", &self.source_name)?;
        out.write_bytes(&self.source_data);
        out.write_i64(clamp_to_i64(self.position));

        // The size is only final now; prepend the header.
        let header = (FLAG_VERSIONED << FLAG_SHIFT) | (out.len() as u32);
        out.seek(0);
        out.write_i32(header as i32);
        out.seek_end();
        out.write_i32(0);

        debug_assert_eq!(out.len(), HEADER_LEN + body_len + MARKER_LEN);
        Ok(out.into_inner())
    }

    /// Encodes this info into a base64 signature.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(STANDARD.encode(self.encode_bytes()?))
    }

    /// Decodes raw signature bytes (after base64).
    pub fn decode_bytes(raw: &[u8]) -> Result<Self, ProtocolError> {
        let mut outer = ReadCursor::new(raw);
        let header = outer.read_i32()? as u32;
        let flags = header >> FLAG_SHIFT;
        let size = (header & SIZE_MASK) as usize;
        let body = outer.read_bytes(size)?;
        if outer.remaining() != MARKER_LEN {
            tracing::trace!(
                trailing = outer.remaining(),
                "track signature without standard end marker"
            );
        }

        let mut r = ReadCursor::new(body);
        let version = if flags & FLAG_VERSIONED != 0 {
            r.read_u8()?
        } else {
            1
        };
        if version == 0 || version > VERSION_EXTENDED {
            return Err(ProtocolError::MalformedTrack(format!(
                "unsupported track version {version}"
            )));
        }

        let title = r.read_utf()?;
        let author = r.read_utf()?;
        let length = non_negative("length", r.read_i64()?)?;
        let identifier = r.read_utf()?;
        let is_stream = r.read_bool()?;
        let uri = if version >= VERSION_URI {
            r.read_nullable_utf()?
        } else {
            None
        };
        let (artwork_url, isrc) = if version >= VERSION_EXTENDED {
            (r.read_nullable_utf()?, r.read_nullable_utf()?)
        } else {
            (None, None)
        };

        // Oldest layouts stop here; later fields default.
        let source_name = if r.remaining() > 0 {
            r.read_utf()?
        } else {
            String::new()
        };

        let (source_data, position) = match r.remaining() {
            0 => (Vec::new(), 0),
            n if n < 8 => {
                return Err(ProtocolError::BufferUnderrun {
                    needed: 8,
                    remaining: n,
                });
            }
            n => {
                let data = r.read_bytes(n - 8)?.to_vec();
                (data, non_negative("position", r.read_i64()?)?)
            }
        };

        Ok(Self {
            identifier,
            title,
            author,
            length,
            is_stream,
            source_name,
            uri,
            artwork_url,
            isrc,
            source_data,
            position,
        })
    }

    /// Decodes a base64 signature.
    pub fn decode(signature: &str) -> Result<Self, ProtocolError> {
        let raw = STANDARD.decode(signature.trim()).map_err(|e| {
            ProtocolError::MalformedTrack(format!("invalid base64: {e}"))
        })?;
        Self::decode_bytes(&raw)
    }
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn non_negative(field: &str, value: i64) -> Result<u64, ProtocolError> {
    u64::try_from(value).map_err(|_| {
        ProtocolError::MalformedTrack(format!("negative {field}: {value}"))
    })
}

// ---------------------------------------------------------------------------
// Track
// ---------------------------------------------------------------------------

/// A playable track: its decoded info, the signature it came from, and the
/// live playback position.
///
/// The signature is fixed at construction and is the track's identity:
/// two tracks are equal exactly when their signatures are. Only
/// [`position`](Self::position) changes afterwards, from player updates.
///
/// Serializes as the bare signature string, which is what the node expects
/// in a `play` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Track {
    signature: String,
    info: TrackInfo,
    position: u64,
}

impl Track {
    /// Decodes a signature received from the node.
    pub fn from_signature(signature: impl Into<String>) -> Result<Self, ProtocolError> {
        let signature = signature.into();
        let info = TrackInfo::decode(&signature)?;
        Ok(Self {
            position: info.position,
            signature,
            info,
        })
    }

    /// Builds a synthetic track by encoding `info`.
    pub fn from_info(info: TrackInfo) -> Result<Self, ProtocolError> {
        let signature = info.encode()?;
        Ok(Self {
            position: info.position,
            signature,
            info,
        })
    }

    /// The base64 signature.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The decoded fields.
    pub fn info(&self) -> &TrackInfo {
        &self.info
    }

    /// Shorthand for `info().title`.
    pub fn title(&self) -> &str {
        &self.info.title
    }

    /// Shorthand for `info().length`.
    pub fn length(&self) -> u64 {
        self.info.length
    }

    /// Last known playback position in milliseconds.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Records a new playback position.
    pub fn set_position(&mut self, position: u64) {
        self.position = position;
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.signature == other.signature
    }
}

impl Eq for Track {}

impl std::hash::Hash for Track {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.signature.hash(state);
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.info.author, self.info.title)
    }
}

impl From<Track> for String {
    fn from(track: Track) -> Self {
        track.signature
    }
}

impl TryFrom<String> for Track {
    type Error = ProtocolError;

    fn try_from(signature: String) -> Result<Self, Self::Error> {
        Self::from_signature(signature)
    }
}

#[cfg(test)]
mod tests {
    //! Codec tests.
    //!
    //! The fixtures below are built by hand, byte by byte, the way the
    //! node's encoder lays them out. Matching them exactly is what makes
    //! the signatures interchangeable with the node's.

    use super::*;

    fn sample() -> TrackInfo {
        TrackInfo {
            identifier: "dQw4w9WgXcQ".into(),
            title: "test title".into(),
            author: "test author".into(),
            length: 212_000,
            is_stream: false,
            source_name: "youtube".into(),
            uri: Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".into()),
            artwork_url: None,
            isrc: None,
            source_data: Vec::new(),
            position: 0,
        }
    }

    /// Writes a body the way the node does, framed with the given flags.
    fn frame(flags: u32, body: &[u8]) -> Vec<u8> {
        let header = (flags << 30) | body.len() as u32;
        let mut out = header.to_be_bytes().to_vec();
        out.extend_from_slice(body);
        out
    }

    fn utf(s: &str) -> Vec<u8> {
        let mut v = (s.len() as u16).to_be_bytes().to_vec();
        v.extend_from_slice(s.as_bytes());
        v
    }

    // =====================================================================
    // Layout
    // =====================================================================

    #[test]
    fn test_encode_bytes_matches_node_layout() {
        let info = TrackInfo {
            identifier: "id".into(),
            title: "t".into(),
            author: "a".into(),
            length: 1000,
            is_stream: false,
            source_name: "http".into(),
            uri: None,
            position: 5,
            ..TrackInfo::default()
        };

        let mut body = vec![2u8];
        body.extend(utf("t"));
        body.extend(utf("a"));
        body.extend(1000i64.to_be_bytes());
        body.extend(utf("id"));
        body.push(0); // stream
        body.push(0); // no uri
        body.extend(utf("http"));
        body.extend(5i64.to_be_bytes());
        let mut expected = frame(1, &body);
        expected.extend(0i32.to_be_bytes());

        assert_eq!(info.encode_bytes().unwrap(), expected);
    }

    #[test]
    fn test_encode_header_has_versioned_flag_and_body_size() {
        let bytes = sample().encode_bytes().unwrap();
        let header = u32::from_be_bytes(bytes[..4].try_into().unwrap());
        assert_eq!(header >> 30, 1);
        assert_eq!((header & SIZE_MASK) as usize, bytes.len() - 8);
        assert_eq!(&bytes[bytes.len() - 4..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_picks_extended_version_only_when_needed() {
        let plain = sample().encode_bytes().unwrap();
        assert_eq!(plain[4], 2);

        let mut info = sample();
        info.isrc = Some("USRC17607839".into());
        let extended = info.encode_bytes().unwrap();
        assert_eq!(extended[4], 3);
    }

    // =====================================================================
    // Round trips
    // =====================================================================

    #[test]
    fn test_decode_of_encode_reproduces_every_field() {
        let mut info = sample();
        info.position = 42_000;
        let decoded = TrackInfo::decode(&info.encode().unwrap()).unwrap();
        assert_eq!(decoded, info);
    }

    #[test]
    fn test_round_trip_extended_fields_and_source_data() {
        let info = TrackInfo {
            artwork_url: Some("https://i.ytimg.com/vi/x/hq.jpg".into()),
            isrc: Some("GBARL9300135".into()),
            source_data: vec![0, 3, b'm', b'p', b'3'],
            is_stream: true,
            length: i64::MAX as u64,
            ..sample()
        };
        assert_eq!(TrackInfo::decode(&info.encode().unwrap()).unwrap(), info);
    }

    #[test]
    fn test_round_trip_non_ascii_strings() {
        let info = TrackInfo {
            title: "Bj\u{f6}rk \u{2014} J\u{f3}ga \u{1F3B6}".into(),
            author: "\u{30B9}\u{30D4}\u{30C3}\u{30C4}".into(),
            ..sample()
        };
        assert_eq!(TrackInfo::decode(&info.encode().unwrap()).unwrap(), info);
    }

    #[test]
    fn test_signature_of_decoded_track_decodes_identically() {
        let first = Track::from_info(sample()).unwrap();
        let again = Track::from_signature(first.signature()).unwrap();
        let reencoded = Track::from_info(again.info().clone()).unwrap();
        assert_eq!(reencoded.signature(), first.signature());
        assert_eq!(reencoded.title(), "test title");
    }

    // =====================================================================
    // Older layouts
    // =====================================================================

    #[test]
    fn test_decode_unversioned_layout_defaults_missing_fields() {
        // Version 1: no version byte, no URI, and here no source/position.
        let mut body = Vec::new();
        body.extend(utf("old title"));
        body.extend(utf("old author"));
        body.extend(90_000i64.to_be_bytes());
        body.extend(utf("abc"));
        body.push(1);
        let raw = frame(0, &body);

        let info = TrackInfo::decode_bytes(&raw).unwrap();
        assert_eq!(info.title, "old title");
        assert_eq!(info.length, 90_000);
        assert!(info.is_stream);
        assert_eq!(info.uri, None);
        assert_eq!(info.source_name, "");
        assert_eq!(info.position, 0);
    }

    #[test]
    fn test_decode_without_trailing_marker() {
        let mut raw = sample().encode_bytes().unwrap();
        raw.truncate(raw.len() - 4);
        assert_eq!(TrackInfo::decode_bytes(&raw).unwrap(), sample());
    }

    #[test]
    fn test_decode_version_one_with_source_and_position() {
        let mut body = Vec::new();
        body.extend(utf("t"));
        body.extend(utf("a"));
        body.extend(1i64.to_be_bytes());
        body.extend(utf("i"));
        body.push(0);
        body.extend(utf("soundcloud"));
        body.extend(777i64.to_be_bytes());

        let info = TrackInfo::decode_bytes(&frame(0, &body)).unwrap();
        assert_eq!(info.source_name, "soundcloud");
        assert_eq!(info.position, 777);
        assert!(info.source_data.is_empty());
    }

    // =====================================================================
    // Rejections
    // =====================================================================

    #[test]
    fn test_decode_invalid_base64_is_malformed() {
        assert!(matches!(
            TrackInfo::decode("not base64!!"),
            Err(ProtocolError::MalformedTrack(_))
        ));
    }

    #[test]
    fn test_decode_every_truncation_fails_without_panicking() {
        let raw = sample().encode_bytes().unwrap();
        let body_end = raw.len() - 4;
        for cut in 0..body_end {
            let result = TrackInfo::decode_bytes(&raw[..cut]);
            assert!(
                matches!(
                    result,
                    Err(ProtocolError::BufferUnderrun { .. })
                        | Err(ProtocolError::MalformedTrack(_))
                ),
                "cut at {cut} should fail, got {result:?}"
            );
        }
    }

    #[test]
    fn test_decode_header_size_beyond_buffer_underruns() {
        let raw = frame(1, &[2, 0, 1]);
        let mut lying = raw.clone();
        lying[3] = 200; // claims 200 body bytes
        assert!(matches!(
            TrackInfo::decode_bytes(&lying),
            Err(ProtocolError::BufferUnderrun { needed: 200, .. })
        ));
    }

    #[test]
    fn test_decode_unknown_version_is_malformed() {
        let raw = frame(1, &[9, 0, 0]);
        assert!(matches!(
            TrackInfo::decode_bytes(&raw),
            Err(ProtocolError::MalformedTrack(_))
        ));
    }

    #[test]
    fn test_decode_garbage_bytes_fail() {
        let garbage = [0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02];
        assert!(TrackInfo::decode_bytes(&garbage).is_err());
    }

    #[test]
    fn test_encode_oversized_title_is_field_too_large() {
        let info = TrackInfo {
            title: "x".repeat(70_000),
            ..sample()
        };
        assert!(matches!(
            info.encode(),
            Err(ProtocolError::FieldTooLarge { field: "title", len: 70_000 })
        ));
    }

    // =====================================================================
    // Track
    // =====================================================================

    #[test]
    fn test_track_equality_is_by_signature() {
        let a = Track::from_info(sample()).unwrap();
        let mut b = Track::from_signature(a.signature()).unwrap();
        b.set_position(10_000);
        assert_eq!(a, b, "position does not affect identity");

        let c = Track::from_info(TrackInfo {
            title: "other".into(),
            ..sample()
        })
        .unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_track_serializes_as_signature_string() {
        let track = Track::from_info(sample()).unwrap();
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(json, serde_json::Value::String(track.signature().into()));

        let back: Track = serde_json::from_value(json).unwrap();
        assert_eq!(back, track);
    }

    #[test]
    fn test_track_position_starts_at_encoded_position() {
        let info = TrackInfo {
            position: 30_000,
            ..sample()
        };
        let track = Track::from_info(info).unwrap();
        assert_eq!(track.position(), 30_000);
    }
}
