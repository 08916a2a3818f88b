//! The tag byte vocabulary.
//!
//! [`Tag::from_u8`] is a pure classification of the first byte of a value's
//! encoding: it extracts whatever immediate parameter lives in the tag bits
//! (an inline integer, a width, an inline length) but never reads further
//! bytes itself. Callers that need a wide-form value or length read the
//! extra bytes themselves via [`read_extended`].

use crate::error::{Error, Result};
use crate::integer::width_for;
use crate::sink::ByteSink;
use crate::source::ByteSource;

pub const TAG_NULL: u8 = 0x00;
pub const TAG_END: u8 = 0x01;
pub const TAG_FALSE: u8 = 0x02;
pub const TAG_TRUE: u8 = 0x03;
pub const TAG_RESERVED_VLE: u8 = 0x04;
pub const TAG_F32: u8 = 0x05;
pub const TAG_F64: u8 = 0x06;
pub const TAG_BIGDECIMAL: u8 = 0x07;
pub const TAG_ENUM_CONFIG: u8 = 0x08;
pub const TAG_ENUM_REF8: u8 = 0x09;
pub const TAG_ENUM_REF16: u8 = 0x0A;

pub const POS_INT_INLINE_BASE: u8 = 0x40;
pub const POS_INT_WIDE_BASE: u8 = 0x58;
pub const NEG_INT_INLINE_BASE: u8 = 0x60;
pub const NEG_INT_WIDE_BASE: u8 = 0x78;
pub const BYTES_BASE: u8 = 0x80;
pub const STRING_BASE: u8 = 0xC0;
pub const ARRAY_BASE: u8 = 0x20;
pub const OBJECT_BASE: u8 = 0x30;

/// A classified tag byte. Wide forms carry only the *width* of the trailing
/// integer; the value itself is read separately once a caller commits to
/// that branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    Null,
    End,
    False,
    True,
    F32,
    F64,
    BigDecimal,
    EnumConfig,
    EnumRef8,
    EnumRef16,
    /// Reserved tag that is explicitly unimplemented (`0x04`,
    /// `0x0B..=0x0F`).
    Reserved(u8),
    /// A tag byte with no assigned meaning at all (`0x10..=0x1F`).
    Unmapped(u8),
    /// Inline positive int, value in `1..=24`.
    PosIntInline(i64),
    /// Wide positive int, width in `1..=8`; payload unscaled, add 25 after
    /// reading.
    PosIntWide(usize),
    /// Inline negative-or-zero int, value in `-23..=0`.
    NegIntInline(i64),
    /// Wide negative int, width in `1..=8`; payload unscaled, negate and
    /// subtract 24 after reading.
    NegIntWide(usize),
    /// Bytes value; low 6 bits of the tag.
    Bytes(u8),
    /// String value; low 6 bits of the tag.
    Str(u8),
    /// Sized array; low 4 bits of the tag (`0..=10` direct, `11..=14`
    /// wide, `15` EOF-terminated).
    Array(u8),
    /// Sized object; same low-4-bit rule as [`Tag::Array`].
    Object(u8),
}

impl Tag {
    /// Classify a single tag byte. Never reads further input.
    pub fn from_u8(byte: u8) -> Tag {
        match byte {
            TAG_NULL => Tag::Null,
            TAG_END => Tag::End,
            TAG_FALSE => Tag::False,
            TAG_TRUE => Tag::True,
            TAG_RESERVED_VLE => Tag::Reserved(byte),
            TAG_F32 => Tag::F32,
            TAG_F64 => Tag::F64,
            TAG_BIGDECIMAL => Tag::BigDecimal,
            TAG_ENUM_CONFIG => Tag::EnumConfig,
            TAG_ENUM_REF8 => Tag::EnumRef8,
            TAG_ENUM_REF16 => Tag::EnumRef16,
            0x0B..=0x0F => Tag::Reserved(byte),
            0x10..=0x1F => Tag::Unmapped(byte),
            ARRAY_BASE..=0x2F => Tag::Array(byte - ARRAY_BASE),
            OBJECT_BASE..=0x3F => Tag::Object(byte - OBJECT_BASE),
            POS_INT_INLINE_BASE..=0x57 => Tag::PosIntInline((byte - POS_INT_INLINE_BASE) as i64 + 1),
            POS_INT_WIDE_BASE..=0x5F => Tag::PosIntWide((byte - POS_INT_WIDE_BASE) as usize + 1),
            NEG_INT_INLINE_BASE..=0x77 => Tag::NegIntInline(-((byte - NEG_INT_INLINE_BASE) as i64)),
            NEG_INT_WIDE_BASE..=0x7F => Tag::NegIntWide((byte - NEG_INT_WIDE_BASE) as usize + 1),
            BYTES_BASE..=0xBF => Tag::Bytes(byte - BYTES_BASE),
            STRING_BASE..=0xFF => Tag::Str(byte - STRING_BASE),
        }
    }

    /// The category name, for [`Error::TypeMismatch`] messages.
    pub fn category(&self) -> &'static str {
        match self {
            Tag::Null => "null",
            Tag::End => "end marker",
            Tag::False | Tag::True => "bool",
            Tag::F32 => "float32",
            Tag::F64 => "float64",
            Tag::BigDecimal => "bigdecimal",
            Tag::EnumConfig => "enum config",
            Tag::EnumRef8 | Tag::EnumRef16 => "enum ref",
            Tag::Reserved(_) => "reserved",
            Tag::Unmapped(_) => "unmapped",
            Tag::PosIntInline(_) | Tag::PosIntWide(_) => "int",
            Tag::NegIntInline(_) | Tag::NegIntWide(_) => "int",
            Tag::Bytes(_) => "bytes",
            Tag::Str(_) => "string",
            Tag::Array(_) => "array",
            Tag::Object(_) => "object",
        }
    }
}

/// Read `byte` as a tag and classify it. Reserved tags are `Unsupported`;
/// anything else outside the assigned vocabulary is `Malformed`.
pub fn read_tag<'a>(src: &mut impl ByteSource<'a>) -> Result<Tag> {
    let byte = src.read_u8()?;
    Ok(Tag::from_u8(byte))
}

/// Decode the extended-length rule shared by Bytes/String (`inline_max =
/// 59`) and Array/Object (`inline_max = 10`): values up to `inline_max` are
/// carried directly in the tag; above that, the low bits hold a width
/// `1..=max_width` and `inline_max + U` is the real value.
pub fn read_extended<'a>(
    src: &mut impl ByteSource<'a>,
    low_bits: u8,
    inline_max: u8,
) -> Result<usize> {
    if low_bits <= inline_max {
        return Ok(low_bits as usize);
    }
    let width = (low_bits - inline_max) as usize;
    let extra = src.read_uint_le(width)?;
    Ok(inline_max as usize + extra as usize)
}

/// Write the tag/length encoding that mirrors [`read_extended`]: values up
/// to `inline_max` go directly in the tag; above that, a `1..=4`-byte
/// little-endian width follows carrying `value - inline_max`.
pub fn write_extended(sink: &mut impl ByteSink, base: u8, inline_max: u8, value: usize) -> Result<()> {
    if value <= inline_max as usize {
        return sink.write_u8(base + value as u8);
    }
    let extra = (value - inline_max as usize) as u64;
    let width = width_for(extra);
    if width > 4 {
        return Err(Error::InvalidArgument(format!(
            "length {} is too large for this format's length field",
            value
        )));
    }
    sink.write_u8(base + inline_max + width as u8)?;
    sink.write_uint_le(extra, width)
}
