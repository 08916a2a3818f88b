//! Signed integer encoding.
//!
//! Small magnitudes are inlined into the tag byte; everything else spills
//! into a little-endian payload whose width is picked by [`width_for`].
//! Width is derived purely from tag bits, never from a leading run-length
//! nibble, so the encoding logic only has to answer "how many little-endian
//! bytes does this unsigned magnitude need".

use crate::error::{Error, Result};
use crate::sink::ByteSink;
use crate::source::ByteSource;
use crate::tag::{self, Tag};

/// Smallest width in `1..=8` whose little-endian byte span can hold `u`.
pub fn width_for(u: u64) -> usize {
    let used_bytes = 8 - (u.leading_zeros() as usize / 8);
    used_bytes.max(1)
}

/// Encode a logical `i64` using the small/wide positive/negative forms.
pub fn write_int(sink: &mut impl ByteSink, value: i64) -> Result<()> {
    if (1..=24).contains(&value) {
        sink.write_u8(tag::POS_INT_INLINE_BASE + (value as u8 - 1))
    } else if (-23..=0).contains(&value) {
        sink.write_u8(tag::NEG_INT_INLINE_BASE + (-value) as u8)
    } else if value > 24 {
        let u = (value as i128 - 25) as u64;
        let width = width_for(u);
        sink.write_u8(tag::POS_INT_WIDE_BASE + (width as u8 - 1))?;
        sink.write_uint_le(u, width)
    } else {
        let u = (-(value as i128) - 24) as u64;
        let width = width_for(u);
        sink.write_u8(tag::NEG_INT_WIDE_BASE + (width as u8 - 1))?;
        sink.write_uint_le(u, width)
    }
}

/// Decode an already-classified integer tag, reading any trailing width
/// bytes it implies.
pub fn read_int<'a>(tag: Tag, src: &mut impl ByteSource<'a>) -> Result<i64> {
    match tag {
        Tag::PosIntInline(v) => Ok(v),
        Tag::NegIntInline(v) => Ok(v),
        Tag::PosIntWide(width) => {
            let u = src.read_uint_le(width)?;
            let v = u as i128 + 25;
            i64::try_from(v).map_err(|_| Error::Malformed("positive integer overflows i64".into()))
        }
        Tag::NegIntWide(width) => {
            let u = src.read_uint_le(width)?;
            let v = -(u as i128) - 24;
            i64::try_from(v).map_err(|_| Error::Malformed("negative integer overflows i64".into()))
        }
        other => Err(Error::TypeMismatch {
            expected: "int",
            found: other.category(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SliceSource;

    fn roundtrip(v: i64) -> Vec<u8> {
        let mut buf = Vec::new();
        write_int(&mut buf, v).unwrap();
        let mut src = SliceSource::new(&buf);
        let tag = tag::read_tag(&mut src).unwrap();
        assert_eq!(read_int(tag, &mut src).unwrap(), v);
        buf
    }

    #[test]
    fn boundary_bytes_match_reference_table() {
        assert_eq!(roundtrip(0), vec![0x60]);
        assert_eq!(roundtrip(1), vec![0x40]);
        assert_eq!(roundtrip(24), vec![0x57]);
        assert_eq!(roundtrip(25), vec![0x58, 0x00]);
        assert_eq!(roundtrip(-1), vec![0x61]);
        assert_eq!(roundtrip(-24), vec![0x78, 0x00]);
    }

    #[test]
    fn small_int_inline_is_one_byte() {
        for i in -23..=24 {
            assert_eq!(roundtrip(i).len(), 1);
        }
    }

    #[test]
    fn extremes_round_trip() {
        roundtrip(i64::MAX);
        roundtrip(i64::MIN);
    }
}
