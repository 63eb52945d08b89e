//! Adaptive-length integer encodings for protocol versions 30 and newer.
//!
//! Small magnitudes occupy a single wire byte; larger values claim extra bytes
//! by setting high bits in a leading tag byte. The 32-bit form uses one to
//! five bytes. The 64-bit form is parameterized by a minimum byte count agreed
//! by both sides per field and uses up to nine bytes, with the tag byte
//! carrying the most significant in-range bits directly when they fit.
//!
//! Values decoded from the wire are rejected (never truncated) when their
//! payload would not fit the target integer width.

use crate::ProtocolError;
use crate::msg::{MsgReader, MsgWriter};

/// Extra payload bytes implied by a tag byte, indexed by `tag / 4`.
const INT_BYTE_EXTRA: [u8; 64] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 0x00..0x3F
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // 0x40..0x7F
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0x80..0xBF
    2, 2, 2, 2, 2, 2, 2, 2, // 0xC0..0xDF
    3, 3, 3, 3, // 0xE0..0xEF
    4, 4, // 0xF0..0xF7
    5, // 0xF8..0xFB
    6, // 0xFC..0xFF
];

/// Encodes `value` into its wire form: (length, bytes).
fn encode_bytes(value: i32) -> (usize, [u8; 5]) {
    let mut bytes = [0u8; 5];
    bytes[1..5].copy_from_slice(&value.to_le_bytes());

    // Trim trailing zero bytes, but always keep at least one payload byte.
    let mut count = 4usize;
    while count > 1 && bytes[count] == 0 {
        count -= 1;
    }

    let shift = 7 - ((count - 1) as u32);
    let bit = 1u8 << shift;
    let current = bytes[count];
    if current >= bit {
        // The top payload byte collides with the tag bits; demote it to a
        // plain payload byte and start a fresh tag.
        count += 1;
        bytes[0] = !(bit - 1);
    } else if count > 1 {
        bytes[0] = current | !((bit << 1) - 1);
    } else {
        bytes[0] = bytes[1];
    }
    (count, bytes)
}

/// Appends a 32-bit adaptive-length integer.
pub fn write_varint(writer: &mut MsgWriter<'_>, value: i32) -> Result<(), ProtocolError> {
    let (count, bytes) = encode_bytes(value);
    writer.write_data(&bytes[..count])
}

/// Reads a 32-bit adaptive-length integer.
pub fn read_varint(reader: &mut MsgReader<'_>) -> Result<i32, ProtocolError> {
    let first = reader.read_byte()?;
    let extra = usize::from(INT_BYTE_EXTRA[usize::from(first) / 4]);
    if extra > 4 {
        return Err(ProtocolError::IntegerOverflow("varint"));
    }
    let mut bytes = [0u8; 5];
    if extra > 0 {
        let span = reader.read_data(extra)?;
        bytes[..extra].copy_from_slice(span);
        bytes[extra] = first & ((1 << (8 - extra)) - 1);
    } else {
        bytes[0] = first;
    }
    // A four-extra-byte tag with nonzero low bits claims bits past the
    // 32-bit range.
    if bytes[4] != 0 {
        return Err(ProtocolError::IntegerOverflow("varint"));
    }
    Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Appends a 64-bit adaptive-length integer with `min_bytes` guaranteed bytes.
pub fn write_varlong(
    writer: &mut MsgWriter<'_>,
    value: i64,
    min_bytes: usize,
) -> Result<(), ProtocolError> {
    debug_assert!((1..=8).contains(&min_bytes));
    let le = value.to_le_bytes();

    let mut count = 8usize;
    while count > min_bytes && le[count - 1] == 0 {
        count -= 1;
    }

    let bit = 1u8 << ((7 + min_bytes) - count);
    let tag;
    if le[count - 1] >= bit {
        count += 1;
        tag = !(bit - 1);
    } else if count > min_bytes {
        tag = le[count - 1] | !((bit << 1) - 1);
    } else {
        tag = le[count - 1];
    }

    // The tag byte can signal at most six extra bytes past the floor, so
    // floors below three cannot carry every value. Refuse rather than emit
    // bytes that decode to something else.
    if count - min_bytes > 6 {
        return Err(ProtocolError::IntegerOverflow("varlong"));
    }

    writer.write_byte(tag)?;
    writer.write_data(&le[..count - 1])
}

/// Reads a 64-bit adaptive-length integer with `min_bytes` guaranteed bytes.
pub fn read_varlong(
    reader: &mut MsgReader<'_>,
    min_bytes: usize,
) -> Result<i64, ProtocolError> {
    debug_assert!((1..=8).contains(&min_bytes));
    let tag = reader.read_byte()?;
    let extra = usize::from(INT_BYTE_EXTRA[usize::from(tag) / 4]);
    if min_bytes + extra > 9 {
        return Err(ProtocolError::IntegerOverflow("varlong"));
    }

    let mut bytes = [0u8; 9];
    let payload = reader.read_data(min_bytes - 1 + extra)?;
    bytes[..payload.len()].copy_from_slice(payload);
    if extra > 0 {
        bytes[min_bytes - 1 + extra] = tag & ((1 << (8 - extra)) - 1);
    } else {
        bytes[min_bytes - 1] = tag;
    }
    if bytes[8] != 0 {
        return Err(ProtocolError::IntegerOverflow("varlong"));
    }
    let mut le = [0u8; 8];
    le.copy_from_slice(&bytes[..8]);
    Ok(i64::from_le_bytes(le))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint_bytes(value: i32) -> Vec<u8> {
        let mut buf = [0u8; 5];
        let mut w = MsgWriter::new(&mut buf);
        write_varint(&mut w, value).unwrap();
        w.as_slice().to_vec()
    }

    fn varint_value(bytes: &[u8]) -> i32 {
        let mut r = MsgReader::new(bytes);
        let value = read_varint(&mut r).unwrap();
        assert!(r.is_empty(), "decoder left trailing bytes");
        value
    }

    fn varlong_roundtrip(value: i64, min_bytes: usize) -> usize {
        let mut buf = [0u8; 9];
        let mut w = MsgWriter::new(&mut buf);
        write_varlong(&mut w, value, min_bytes).unwrap();
        let written = w.written();
        let mut r = MsgReader::new(&buf[..written]);
        assert_eq!(read_varlong(&mut r, min_bytes).unwrap(), value);
        assert!(r.is_empty());
        written
    }

    #[test]
    fn single_byte_values_encode_as_themselves() {
        assert_eq!(varint_bytes(0), vec![0x00]);
        assert_eq!(varint_bytes(0x7F), vec![0x7F]);
        assert_eq!(varint_value(&[0x7F]), 0x7F);
    }

    #[test]
    fn two_byte_boundary() {
        // 0x80 no longer fits beside a one-byte tag.
        assert_eq!(varint_bytes(0x80), vec![0x80, 0x80]);
        assert_eq!(varint_value(&[0x80, 0x80]), 0x80);
        assert_eq!(varint_bytes(0x3FFF), vec![0xBF, 0xFF]);
    }

    #[test]
    fn negative_values_use_all_five_bytes() {
        assert_eq!(varint_bytes(-42), vec![0xF0, 0xD6, 0xFF, 0xFF, 0xFF]);
        assert_eq!(varint_value(&[0xF0, 0xD6, 0xFF, 0xFF, 0xFF]), -42);
        assert_eq!(varint_bytes(-1), vec![0xF0, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(varint_bytes(i32::MIN), vec![0xF0, 0x00, 0x00, 0x00, 0x80]);
    }

    #[test]
    fn varint_roundtrip_across_width_boundaries() {
        for value in [
            0,
            1,
            0x7F,
            0x80,
            0x3FFF,
            0x4000,
            0x001F_FFFF,
            0x0020_0000,
            0x0FFF_FFFF,
            0x1000_0000,
            i32::MAX,
            i32::MIN,
            -1,
        ] {
            assert_eq!(varint_value(&varint_bytes(value)), value);
        }
    }

    #[test]
    fn varint_rejects_tags_demanding_too_many_bytes() {
        // A 0xFC tag claims 6 extra bytes, which cannot fit an i32.
        let err = read_varint(&mut MsgReader::new(&[0xFC, 0, 0, 0, 0, 0, 0]));
        assert!(matches!(err, Err(ProtocolError::IntegerOverflow("varint"))));
    }

    #[test]
    fn varint_rejects_payloads_past_the_32_bit_range() {
        // A 0xF4 tag carries four payload bytes plus nonzero low tag bits,
        // which would need a 36-bit value.
        let err = read_varint(&mut MsgReader::new(&[0xF4, 0xFF, 0xFF, 0xFF, 0xFF]));
        assert!(matches!(err, Err(ProtocolError::IntegerOverflow("varint"))));
    }

    #[test]
    fn varint_truncated_payload_underflows() {
        let err = read_varint(&mut MsgReader::new(&[0xF0, 0xD6]));
        assert!(matches!(err, Err(ProtocolError::BufferUnderflow { .. })));
    }

    #[test]
    fn varlong_floor_is_respected() {
        // Tiny values still occupy min_bytes on the wire.
        assert_eq!(varlong_roundtrip(0, 3), 3);
        assert_eq!(varlong_roundtrip(1, 4), 4);
    }

    #[test]
    fn varlong_grows_with_magnitude() {
        assert_eq!(varlong_roundtrip(0xFFFF, 3), 3);
        assert_eq!(varlong_roundtrip(0x0100_0000, 3), 4);
        assert_eq!(varlong_roundtrip(0x1234_5678_9ABC, 3), 7);
        assert_eq!(varlong_roundtrip(i64::MAX, 3), 9);
        assert_eq!(varlong_roundtrip(i64::MAX, 4), 9);
        assert_eq!(varlong_roundtrip(-1, 3), 9);
    }

    #[test]
    fn varlong_refuses_values_its_floor_cannot_carry() {
        // Negative values need all nine wire bytes, which a floor of one or
        // two cannot signal. Nothing may reach the buffer.
        for (value, min_bytes) in [(-1i64, 1usize), (-1, 2), (i64::MAX, 1), (i64::MAX, 2)] {
            let mut buf = [0u8; 16];
            let mut w = MsgWriter::new(&mut buf);
            let err = write_varlong(&mut w, value, min_bytes);
            assert!(matches!(err, Err(ProtocolError::IntegerOverflow("varlong"))));
            assert_eq!(w.written(), 0);
        }
    }

    #[test]
    fn varlong_known_encoding() {
        let mut buf = [0u8; 9];
        let mut w = MsgWriter::new(&mut buf);
        write_varlong(&mut w, 0x1234, 3).unwrap();
        assert_eq!(w.as_slice(), &[0x00, 0x34, 0x12]);
    }

    #[test]
    fn varlong_rejects_out_of_range_tags() {
        // min_bytes 4 plus the 6 extra bytes a 0xFC tag claims exceeds the
        // nine-byte ceiling.
        let err = read_varlong(&mut MsgReader::new(&[0xFC; 10]), 4);
        assert!(matches!(err, Err(ProtocolError::IntegerOverflow("varlong"))));
    }

    #[test]
    fn varlong_rejects_payloads_past_the_64_bit_range() {
        // Nine wire bytes whose topmost decoded byte is nonzero.
        let bytes = [0xFFu8; 9];
        let err = read_varlong(&mut MsgReader::new(&bytes), 3);
        assert!(matches!(err, Err(ProtocolError::IntegerOverflow("varlong"))));
    }
}
