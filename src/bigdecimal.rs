//! Arbitrary-precision decimal / integer encoding.
//!
//! The unscaled magnitude is carried in a [`num_bigint::BigInt`] rather than
//! a fixed-width integer, since the format allows arbitrary precision.

use num_bigint::{BigInt, Sign};

use crate::error::{Error, Result};
use crate::integer::width_for;
use crate::sink::ByteSink;
use crate::source::ByteSource;

/// `scale == 0 && precision == 0` collapses a bigdecimal into a bare
/// big integer on decode.
pub struct Decimal {
    pub unscaled: BigInt,
    pub scale: i32,
    pub precision: u32,
}

fn width_field(value: u64, max_width: usize, what: &'static str) -> Result<usize> {
    let width = width_for(value);
    if width > max_width {
        return Err(Error::InvalidArgument(format!(
            "{} needs {} bytes, more than the {} the format allows",
            what, width, max_width
        )));
    }
    Ok(width)
}

/// Write the `0x07` tag, flags byte, and payload for a bigdecimal/biginteger.
pub fn write_decimal(sink: &mut impl ByteSink, unscaled: &BigInt, scale: i32, precision: u32) -> Result<()> {
    let (sign, magnitude) = unscaled.to_bytes_be();
    let unscaled_sign = sign == Sign::Minus;
    let len_width = width_field(magnitude.len() as u64, 4, "unscaled data length")?;

    let scale_sign = scale < 0;
    let scale_mag = scale.unsigned_abs() as u64;
    let scale_width = width_field(scale_mag, 4, "scale")?;
    let precision_width = width_field(precision as u64, 4, "precision")?;

    let flags = ((scale_sign as u8) << 7)
        | (((scale_width - 1) as u8) << 5)
        | (((precision_width - 1) as u8) << 3)
        | ((unscaled_sign as u8) << 2)
        | ((len_width - 1) as u8);

    sink.write_u8(crate::tag::TAG_BIGDECIMAL)?;
    sink.write_u8(flags)?;
    sink.write_uint_le(scale_mag, scale_width)?;
    sink.write_uint_le(precision as u64, precision_width)?;
    sink.write_uint_le(magnitude.len() as u64, len_width)?;
    sink.write_bytes(&magnitude)
}

/// Read the payload following a `0x07` tag (the tag byte itself must
/// already be consumed by the caller).
pub fn read_decimal<'a>(src: &mut impl ByteSource<'a>) -> Result<Decimal> {
    let flags = src.read_u8()?;
    let scale_sign = flags & 0x80 != 0;
    let scale_width = (((flags >> 5) & 0b11) + 1) as usize;
    let precision_width = (((flags >> 3) & 0b11) + 1) as usize;
    let unscaled_sign = flags & 0x04 != 0;
    let len_width = ((flags & 0b11) + 1) as usize;

    let scale_mag = src.read_uint_le(scale_width)?;
    let scale_mag =
        i32::try_from(scale_mag).map_err(|_| Error::Malformed("scale magnitude overflows i32".into()))?;
    let scale = if scale_sign { -scale_mag } else { scale_mag };

    let precision = src.read_uint_le(precision_width)?;
    let precision =
        u32::try_from(precision).map_err(|_| Error::Malformed("precision overflows u32".into()))?;

    let unscaled_len = src.read_uint_le(len_width)?;
    let unscaled_len =
        usize::try_from(unscaled_len).map_err(|_| Error::Malformed("unscaled length overflows usize".into()))?;
    let mut magnitude = src.read_bytes(unscaled_len)?;

    // Some producers sign-extend with a leading 0x00 before a byte whose
    // high bit is set; strip it so both conventions round-trip losslessly.
    if magnitude.len() >= 2 && magnitude[0] == 0x00 && magnitude[1] & 0x80 != 0 {
        magnitude = &magnitude[1..];
    }

    let sign = if unscaled_sign { Sign::Minus } else { Sign::Plus };
    let unscaled = BigInt::from_bytes_be(sign, magnitude);

    Ok(Decimal {
        unscaled,
        scale,
        precision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SliceSource;
    use num_bigint::ToBigInt;

    fn roundtrip(unscaled: i64, scale: i32, precision: u32) -> Decimal {
        let mut buf = Vec::new();
        write_decimal(&mut buf, &unscaled.to_bigint().unwrap(), scale, precision).unwrap();
        // first byte is the 0x07 tag, consumed by the dispatcher in real use
        let mut src = SliceSource::new(&buf[1..]);
        read_decimal(&mut src).unwrap()
    }

    #[test]
    fn simple_decimal_round_trips() {
        let d = roundtrip(12345, 2, 7);
        assert_eq!(d.unscaled, 12345.to_bigint().unwrap());
        assert_eq!(d.scale, 2);
        assert_eq!(d.precision, 7);
    }

    #[test]
    fn zero_scale_and_precision_means_biginteger() {
        let d = roundtrip(-9001, 0, 0);
        assert_eq!(d.scale, 0);
        assert_eq!(d.precision, 0);
        assert_eq!(d.unscaled, (-9001).to_bigint().unwrap());
    }

    #[test]
    fn leading_sign_pad_is_stripped() {
        // Manually build an encoding with a padded magnitude: unscaled = 0x80
        // (128), sign positive, encoded with an extra leading zero byte.
        let mut buf = vec![crate::tag::TAG_BIGDECIMAL];
        // flags: scale width 1, precision width 1, positive, len width 1
        buf.push(0b0000_0000);
        buf.push(0); // scale = 0
        buf.push(0); // precision = 0
        buf.push(2); // unscaled data len = 2
        buf.push(0x00);
        buf.push(0x80);
        let mut src = SliceSource::new(&buf[1..]);
        let d = read_decimal(&mut src).unwrap();
        assert_eq!(d.unscaled, 128.to_bigint().unwrap());
    }

    #[test]
    fn negative_unscaled_round_trips() {
        let d = roundtrip(i64::MIN, 5, 20);
        assert_eq!(d.unscaled, BigInt::from(i64::MIN));
    }
}
