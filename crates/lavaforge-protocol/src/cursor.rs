//! Big-endian cursors over byte buffers, compatible with the JVM's
//! `DataInput` / `DataOutput` streams.
//!
//! The node's audio engine serializes tracks with Java's data streams, so
//! every multi-byte integer is big-endian and every string is written with
//! `writeUTF`: a `u16` byte length followed by *modified* UTF-8.
//!
//! Modified UTF-8 differs from standard UTF-8 in two ways:
//! - U+0000 is written as the two bytes `C0 80` (never a raw zero byte).
//! - Characters outside the BMP are written as a UTF-16 surrogate pair,
//!   each half encoded as three bytes (six bytes total instead of four).
//!
//! Reading is done through [`ReadCursor`], which never looks past the end
//! of its slice. Writing goes through [`WriteCursor`], which appends or
//! inserts at its position.

use crate::ProtocolError;

/// Largest string payload a `u16` length prefix can describe.
pub const MAX_UTF_LEN: usize = u16::MAX as usize;

// ---------------------------------------------------------------------------
// Modified UTF-8
// ---------------------------------------------------------------------------

/// Number of bytes `value` occupies in modified UTF-8 (without the prefix).
pub fn modified_utf8_len(value: &str) -> usize {
    value
        .encode_utf16()
        .map(|unit| match unit {
            0x0001..=0x007F => 1,
            0x0000 | 0x0080..=0x07FF => 2,
            _ => 3,
        })
        .sum()
}

fn encode_modified_utf8(value: &str, out: &mut Vec<u8>) {
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
}

fn decode_modified_utf8(bytes: &[u8]) -> Result<String, ProtocolError> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let unit = if b & 0x80 == 0 {
            i += 1;
            u16::from(b)
        } else if b & 0xE0 == 0xC0 {
            let b2 = continuation(bytes, i + 1)?;
            i += 2;
            (u16::from(b & 0x1F) << 6) | u16::from(b2 & 0x3F)
        } else if b & 0xF0 == 0xE0 {
            let b2 = continuation(bytes, i + 1)?;
            let b3 = continuation(bytes, i + 2)?;
            i += 3;
            (u16::from(b & 0x0F) << 12)
                | (u16::from(b2 & 0x3F) << 6)
                | u16::from(b3 & 0x3F)
        } else {
            return Err(ProtocolError::MalformedTrack(format!(
                "invalid modified UTF-8 lead byte {b:#04x} at offset {i}"
            )));
        };
        units.push(unit);
    }

    String::from_utf16(&units).map_err(|_| {
        ProtocolError::MalformedTrack("unpaired surrogate in string".into())
    })
}

fn continuation(bytes: &[u8], at: usize) -> Result<u8, ProtocolError> {
    match bytes.get(at) {
        Some(&b) if b & 0xC0 == 0x80 => Ok(b),
        Some(&b) => Err(ProtocolError::MalformedTrack(format!(
            "invalid continuation byte {b:#04x} at offset {at}"
        ))),
        None => Err(ProtocolError::MalformedTrack(
            "string ends inside a multi-byte sequence".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// ReadCursor
// ---------------------------------------------------------------------------

/// A forward-only reader over a borrowed byte slice.
///
/// Every read checks the remaining length first and fails with
/// [`ProtocolError::BufferUnderrun`] instead of reading out of bounds.
#[derive(Debug, Clone)]
pub struct ReadCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    /// Creates a cursor positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Reads exactly `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if n > self.remaining() {
            return Err(ProtocolError::BufferUnderrun {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Reads one unsigned byte.
    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads one signed byte.
    pub fn read_i8(&mut self) -> Result<i8, ProtocolError> {
        Ok(i8::from_be_bytes(self.read_array()?))
    }

    /// Reads a boolean byte; any non-zero value is `true`, as in Java.
    pub fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.read_u8()? != 0)
    }

    /// Reads a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Reads a big-endian `i64`.
    pub fn read_i64(&mut self) -> Result<i64, ProtocolError> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    /// Reads a `u16`-prefixed modified UTF-8 string.
    ///
    /// A declared length larger than the remaining bytes is rejected
    /// before anything is consumed past the prefix.
    pub fn read_utf(&mut self) -> Result<String, ProtocolError> {
        let len = usize::from(self.read_u16()?);
        let bytes = self.read_bytes(len)?;
        decode_modified_utf8(bytes)
    }

    /// Reads a presence flag followed by a string when the flag is set.
    pub fn read_nullable_utf(&mut self) -> Result<Option<String>, ProtocolError> {
        if self.read_bool()? {
            self.read_utf().map(Some)
        } else {
            Ok(None)
        }
    }
}

// ---------------------------------------------------------------------------
// WriteCursor
// ---------------------------------------------------------------------------

/// A writer over an owned, growable buffer.
///
/// Writes land at the cursor position. At the end of the buffer they
/// append; anywhere else they *insert*, shifting the trailing bytes right
/// so nothing already written is overwritten. The track encoder relies on
/// this to prepend the message header once the body size is known.
#[derive(Debug, Clone, Default)]
pub struct WriteCursor {
    buf: Vec<u8>,
    pos: usize,
}

impl WriteCursor {
    /// Creates an empty cursor with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            pos: 0,
        }
    }

    /// Current write offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Allocated capacity of the backing buffer.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Moves the cursor. Positions past the end are clamped to the end.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.buf.len());
    }

    /// Moves the cursor to the end of the written data.
    pub fn seek_end(&mut self) {
        self.pos = self.buf.len();
    }

    /// Writes raw bytes at the cursor.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.pos == self.buf.len() {
            self.buf.extend_from_slice(bytes);
        } else {
            self.buf.splice(self.pos..self.pos, bytes.iter().copied());
        }
        self.pos += bytes.len();
    }

    /// Writes one unsigned byte.
    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    /// Writes one signed byte.
    pub fn write_i8(&mut self, value: i8) {
        self.write_bytes(&value.to_be_bytes());
    }

    /// Writes `1` for `true`, `0` for `false`.
    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    /// Writes a big-endian `u16`.
    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_be_bytes());
    }

    /// Writes a big-endian `i32`.
    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_be_bytes());
    }

    /// Writes a big-endian `i64`.
    pub fn write_i64(&mut self, value: i64) {
        self.write_bytes(&value.to_be_bytes());
    }

    /// Writes a `u16`-prefixed modified UTF-8 string.
    ///
    /// `field` only labels the error when the string is too long.
    pub fn write_utf(
        &mut self,
        field: &'static str,
        value: &str,
    ) -> Result<(), ProtocolError> {
        let len = modified_utf8_len(value);
        if len > MAX_UTF_LEN {
            return Err(ProtocolError::FieldTooLarge { field, len });
        }
        let mut encoded = Vec::with_capacity(2 + len);
        encoded.extend_from_slice(&(len as u16).to_be_bytes());
        encode_modified_utf8(value, &mut encoded);
        self.write_bytes(&encoded);
        Ok(())
    }

    /// Writes a presence flag, then the string if there is one.
    pub fn write_nullable_utf(
        &mut self,
        field: &'static str,
        value: Option<&str>,
    ) -> Result<(), ProtocolError> {
        self.write_bool(value.is_some());
        match value {
            Some(v) => self.write_utf(field, v),
            None => Ok(()),
        }
    }

    /// Returns the written bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =====================================================================
    // ReadCursor
    // =====================================================================

    #[test]
    fn test_read_integers_are_big_endian() {
        let data = [
            0x01, 0x02, // u16
            0x00, 0x00, 0x01, 0x00, // i32
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE, // i64
        ];
        let mut r = ReadCursor::new(&data);
        assert_eq!(r.read_u16().unwrap(), 0x0102);
        assert_eq!(r.read_i32().unwrap(), 256);
        assert_eq!(r.read_i64().unwrap(), -2);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_read_past_end_returns_underrun() {
        let mut r = ReadCursor::new(&[0, 0, 1]);
        let err = r.read_i32().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::BufferUnderrun { needed: 4, remaining: 3 }
        ));
        // A failed read consumes nothing.
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn test_read_utf_rejects_length_beyond_buffer() {
        // Declares 10 bytes, only 2 follow.
        let mut r = ReadCursor::new(&[0x00, 0x0A, b'h', b'i']);
        assert!(matches!(
            r.read_utf(),
            Err(ProtocolError::BufferUnderrun { needed: 10, remaining: 2 })
        ));
    }

    #[test]
    fn test_read_bool_treats_nonzero_as_true() {
        let mut r = ReadCursor::new(&[0, 1, 7]);
        assert!(!r.read_bool().unwrap());
        assert!(r.read_bool().unwrap());
        assert!(r.read_bool().unwrap());
    }

    #[test]
    fn test_read_utf_invalid_lead_byte_is_malformed() {
        let mut r = ReadCursor::new(&[0x00, 0x01, 0xFF]);
        assert!(matches!(r.read_utf(), Err(ProtocolError::MalformedTrack(_))));
    }

    #[test]
    fn test_read_utf_truncated_multibyte_is_malformed() {
        // Lead byte of a 3-byte sequence with only one continuation.
        let mut r = ReadCursor::new(&[0x00, 0x02, 0xE2, 0x82]);
        assert!(matches!(r.read_utf(), Err(ProtocolError::MalformedTrack(_))));
    }

    // =====================================================================
    // Modified UTF-8
    // =====================================================================

    #[test]
    fn test_nul_is_encoded_as_two_bytes() {
        let mut w = WriteCursor::default();
        w.write_utf("t", "a\0b").unwrap();
        assert_eq!(w.into_inner(), vec![0x00, 0x04, b'a', 0xC0, 0x80, b'b']);
    }

    #[test]
    fn test_supplementary_char_uses_surrogate_pair() {
        // U+1F3B5 (musical note) is 4 bytes in UTF-8 but 6 in modified UTF-8.
        let s = "\u{1F3B5}";
        assert_eq!(s.len(), 4);
        assert_eq!(modified_utf8_len(s), 6);

        let mut w = WriteCursor::default();
        w.write_utf("t", s).unwrap();
        let bytes = w.into_inner();
        assert_eq!(&bytes[..2], &[0x00, 0x06]);
        assert_eq!(&bytes[2..], &[0xED, 0xA0, 0xBC, 0xED, 0xBE, 0xB5]);

        let mut r = ReadCursor::new(&bytes);
        assert_eq!(r.read_utf().unwrap(), s);
    }

    #[test]
    fn test_mixed_width_string_survives_write_then_read() {
        let s = "caf\u{e9} \u{2603} \u{1F600}\0";
        let mut w = WriteCursor::default();
        w.write_utf("t", s).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes.len(), 2 + modified_utf8_len(s));
        assert_eq!(ReadCursor::new(&bytes).read_utf().unwrap(), s);
    }

    #[test]
    fn test_unpaired_surrogate_is_malformed() {
        // A lone high surrogate (D83C) in 3-byte form.
        let mut r = ReadCursor::new(&[0x00, 0x03, 0xED, 0xA0, 0xBC]);
        assert!(matches!(r.read_utf(), Err(ProtocolError::MalformedTrack(_))));
    }

    // =====================================================================
    // WriteCursor
    // =====================================================================

    #[test]
    fn test_write_utf_too_large_fails_fast() {
        let big = "x".repeat(MAX_UTF_LEN + 1);
        let mut w = WriteCursor::default();
        let err = w.write_utf("title", &big).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::FieldTooLarge { field: "title", len } if len == MAX_UTF_LEN + 1
        ));
        assert!(w.is_empty(), "nothing is written on failure");
    }

    #[test]
    fn test_write_utf_at_limit_is_accepted() {
        let max = "x".repeat(MAX_UTF_LEN);
        let mut w = WriteCursor::default();
        w.write_utf("title", &max).unwrap();
        assert_eq!(w.len(), MAX_UTF_LEN + 2);
    }

    #[test]
    fn test_insert_shifts_trailing_bytes() {
        let mut w = WriteCursor::default();
        w.write_u8(0xAA);
        w.write_u8(0xBB);
        w.seek(1);
        w.write_i32(0x0102_0304);
        assert_eq!(w.position(), 5);
        w.seek_end();
        w.write_u8(0xCC);
        assert_eq!(
            w.into_inner(),
            vec![0xAA, 0x01, 0x02, 0x03, 0x04, 0xBB, 0xCC]
        );
    }

    #[test]
    fn test_insert_within_capacity_does_not_reallocate() {
        let mut w = WriteCursor::with_capacity(8);
        let cap = w.capacity();
        w.write_i32(7);
        w.seek(0);
        w.write_i32(9);
        assert_eq!(w.capacity(), cap);
        assert_eq!(w.into_inner(), vec![0, 0, 0, 9, 0, 0, 0, 7]);
    }

    #[test]
    fn test_seek_past_end_clamps() {
        let mut w = WriteCursor::default();
        w.write_u16(1);
        w.seek(100);
        assert_eq!(w.position(), 2);
    }

    #[test]
    fn test_nullable_utf_writes_flag() {
        let mut w = WriteCursor::default();
        w.write_nullable_utf("uri", None).unwrap();
        w.write_nullable_utf("uri", Some("a")).unwrap();
        let bytes = w.into_inner();
        assert_eq!(bytes, vec![0, 1, 0x00, 0x01, b'a']);

        let mut r = ReadCursor::new(&bytes);
        assert_eq!(r.read_nullable_utf().unwrap(), None);
        assert_eq!(r.read_nullable_utf().unwrap().as_deref(), Some("a"));
    }
}
