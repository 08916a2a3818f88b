//! Push-style document encoder.
//!
//! `Encoder` wraps a [`ByteSink`] plus the per-document state the format
//! needs: the field-name dictionary, the optional enum-string table, and the
//! open-container stack. Once any call fails the encoder is poisoned and
//! every later call fails too.

use num_bigint::BigInt;

use crate::depth::{DepthStack, FrameKind};
use crate::enumstring::EnumStringEncoder;
use crate::error::{Error, Result};
use crate::fieldname::FieldNameEncoder;
use crate::integer::write_int;
use crate::sink::ByteSink;
use crate::tag::{self, write_extended};

/// Knobs for [`Encoder::new`]. Enum-string compression is off unless
/// explicitly requested — it's a wire-negotiated extra, not the baseline
/// encoding.
#[derive(Clone, Copy, Debug, Default)]
pub struct EncoderOptions {
    /// `Some((min_frequency, lru_capacity))` turns on enum-string
    /// compression for string values (never object keys).
    pub enum_strings: Option<(u8, usize)>,
}

/// Whether the current innermost object expects a field name or a value
/// next.
#[derive(Clone, Copy, PartialEq, Eq)]
enum ObjectSlot {
    Key,
    Value,
}

enum OpenFrame {
    Array,
    Object(ObjectSlot),
}

pub struct Encoder<S: ByteSink> {
    sink: S,
    fields: FieldNameEncoder,
    enums: EnumStringEncoder,
    depth: DepthStack,
    frames: Vec<OpenFrame>,
    errored: bool,
}

impl<S: ByteSink> Encoder<S> {
    pub fn new(sink: S) -> Self {
        Self::with_options(sink, EncoderOptions::default())
    }

    pub fn with_options(sink: S, options: EncoderOptions) -> Self {
        let enums = match options.enum_strings {
            Some((min_frequency, capacity)) => {
                EnumStringEncoder::new(min_frequency, capacity).unwrap_or_else(|_| EnumStringEncoder::disabled())
            }
            None => EnumStringEncoder::disabled(),
        };
        Self {
            sink,
            fields: FieldNameEncoder::new(),
            enums,
            depth: DepthStack::new(),
            frames: Vec::new(),
            errored: false,
        }
    }

    /// Consume the encoder, returning the underlying sink. Fails if a
    /// container is still open or the encoder is poisoned.
    pub fn finish(self) -> Result<S> {
        if self.errored {
            return Err(Error::Malformed("encoder already failed".into()));
        }
        if !self.frames.is_empty() {
            return Err(Error::Malformed("document has an unclosed container".into()));
        }
        Ok(self.sink)
    }

    fn fail<T>(&mut self, e: Error) -> Result<T> {
        self.errored = true;
        Err(e)
    }

    fn before_value(&mut self) -> Result<()> {
        if self.errored {
            return Err(Error::Malformed("encoder already failed; document is unusable".into()));
        }
        if let Some(OpenFrame::Object(slot)) = self.frames.last() {
            if *slot != ObjectSlot::Value {
                return self.fail(Error::Malformed("expected a field name, not a value".into()));
            }
        }
        if let Err(e) = self.depth.consume_slot() {
            return self.fail(e);
        }
        Ok(())
    }

    fn after_value(&mut self) {
        if let Some(OpenFrame::Object(slot)) = self.frames.last_mut() {
            *slot = ObjectSlot::Key;
        }
    }

    pub fn write_null(&mut self) -> Result<()> {
        self.before_value()?;
        self.sink.write_u8(tag::TAG_NULL)?;
        self.after_value();
        Ok(())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.before_value()?;
        self.sink
            .write_u8(if value { tag::TAG_TRUE } else { tag::TAG_FALSE })?;
        self.after_value();
        Ok(())
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.before_value()?;
        if let Err(e) = write_int(&mut self.sink, value) {
            return self.fail(e);
        }
        self.after_value();
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.before_value()?;
        self.sink.write_u8(tag::TAG_F32)?;
        self.sink.write_bytes(&value.to_le_bytes())?;
        self.after_value();
        Ok(())
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.before_value()?;
        self.sink.write_u8(tag::TAG_F64)?;
        self.sink.write_bytes(&value.to_le_bytes())?;
        self.after_value();
        Ok(())
    }

    /// Write a bigdecimal; `scale == 0 && precision == 0` is the
    /// biginteger-collapsed form.
    pub fn write_bigdecimal(&mut self, unscaled: &BigInt, scale: i32, precision: u32) -> Result<()> {
        self.before_value()?;
        if let Err(e) = crate::bigdecimal::write_decimal(&mut self.sink, unscaled, scale, precision) {
            return self.fail(e);
        }
        self.after_value();
        Ok(())
    }

    pub fn write_biginteger(&mut self, value: &BigInt) -> Result<()> {
        self.write_bigdecimal(value, 0, 0)
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.before_value()?;
        if let Err(e) = write_extended(&mut self.sink, tag::BYTES_BASE, 59, data.len()) {
            return self.fail(e);
        }
        self.sink.write_bytes(data)?;
        self.after_value();
        Ok(())
    }

    /// Write a string value. Not necessarily UTF-8: the format
    /// treats strings as length-prefixed byte sequences.
    pub fn write_string(&mut self, s: &[u8]) -> Result<()> {
        self.before_value()?;
        let handled = match self.enums.try_encode(&mut self.sink, s) {
            Ok(h) => h,
            Err(e) => return self.fail(e),
        };
        if !handled {
            if let Err(e) = write_extended(&mut self.sink, tag::STRING_BASE, 59, s.len()) {
                return self.fail(e);
            }
            self.sink.write_bytes(s)?;
        }
        self.after_value();
        Ok(())
    }

    /// Begin an array. `count`, if known ahead of time, produces a sized
    /// container; `None` produces an EOF-terminated one closed by
    /// [`Self::end_array`].
    pub fn begin_array(&mut self, count: Option<u32>) -> Result<()> {
        self.before_value()?;
        if let Err(e) = write_container_tag(&mut self.sink, tag::ARRAY_BASE, count) {
            return self.fail(e);
        }
        self.after_value();
        if let Err(e) = self.depth.push(FrameKind::Array, count) {
            return self.fail(e);
        }
        self.frames.push(OpenFrame::Array);
        Ok(())
    }

    pub fn end_array(&mut self) -> Result<()> {
        self.end_container(FrameKind::Array)
    }

    /// Begin an object. Same sizing rule as [`Self::begin_array`].
    pub fn begin_object(&mut self, count: Option<u32>) -> Result<()> {
        self.before_value()?;
        if let Err(e) = write_container_tag(&mut self.sink, tag::OBJECT_BASE, count) {
            return self.fail(e);
        }
        self.after_value();
        if let Err(e) = self.depth.push(FrameKind::Object, count) {
            return self.fail(e);
        }
        self.frames.push(OpenFrame::Object(ObjectSlot::Key));
        Ok(())
    }

    pub fn write_field_name(&mut self, name: &[u8]) -> Result<()> {
        if self.errored {
            return Err(Error::Malformed("encoder already failed; document is unusable".into()));
        }
        match self.frames.last() {
            Some(OpenFrame::Object(ObjectSlot::Key)) => {}
            Some(OpenFrame::Object(ObjectSlot::Value)) => {
                return self.fail(Error::Malformed("expected a value, not a field name".into()));
            }
            _ => return self.fail(Error::Malformed("field name outside an object".into())),
        }
        if let Err(e) = self.depth.consume_slot() {
            return self.fail(e);
        }
        if let Err(e) = self.fields.encode(&mut self.sink, name) {
            return self.fail(e);
        }
        if let Some(OpenFrame::Object(slot)) = self.frames.last_mut() {
            *slot = ObjectSlot::Value;
        }
        Ok(())
    }

    pub fn end_object(&mut self) -> Result<()> {
        if let Some(OpenFrame::Object(ObjectSlot::Value)) = self.frames.last() {
            return self.fail(Error::Malformed("object closed after a key with no value".into()));
        }
        self.end_container(FrameKind::Object)
    }

    fn end_container(&mut self, kind: FrameKind) -> Result<()> {
        if self.errored {
            return Err(Error::Malformed("encoder already failed; document is unusable".into()));
        }
        let eof_terminated = self.depth.at_eof_container();
        if let Err(e) = self.depth.pop(kind) {
            return self.fail(e);
        }
        self.frames.pop();
        if eof_terminated {
            self.sink.write_u8(tag::TAG_END)?;
        }
        Ok(())
    }
}

fn write_container_tag(sink: &mut impl ByteSink, base: u8, count: Option<u32>) -> Result<()> {
    match count {
        None => sink.write_u8(base | 0x0F),
        Some(n) => write_extended(sink, base, 10, n as usize),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_round_trip_bytes() {
        let mut enc = Encoder::new(Vec::new());
        enc.write_null().unwrap();
        enc.write_bool(true).unwrap();
        enc.write_i64(42).unwrap();
        let buf = enc.finish().unwrap();
        assert_eq!(buf[0], tag::TAG_NULL);
        assert_eq!(buf[1], tag::TAG_TRUE);
    }

    #[test]
    fn sized_array_of_ints() {
        let mut enc = Encoder::new(Vec::new());
        enc.begin_array(Some(2)).unwrap();
        enc.write_i64(1).unwrap();
        enc.write_i64(2).unwrap();
        enc.end_array().unwrap();
        let buf = enc.finish().unwrap();
        assert_eq!(buf[0], tag::ARRAY_BASE + 2);
    }

    #[test]
    fn eof_array_gets_end_marker() {
        let mut enc = Encoder::new(Vec::new());
        enc.begin_array(None).unwrap();
        enc.write_i64(1).unwrap();
        enc.end_array().unwrap();
        let buf = enc.finish().unwrap();
        assert_eq!(buf[0], tag::ARRAY_BASE | 0x0F);
        assert_eq!(*buf.last().unwrap(), tag::TAG_END);
    }

    #[test]
    fn object_requires_field_name_before_value() {
        let mut enc = Encoder::new(Vec::new());
        enc.begin_object(Some(1)).unwrap();
        assert!(enc.write_i64(1).is_err());
    }

    #[test]
    fn object_round_trips_one_entry() {
        let mut enc = Encoder::new(Vec::new());
        enc.begin_object(Some(1)).unwrap();
        enc.write_field_name(b"a").unwrap();
        enc.write_i64(1).unwrap();
        enc.end_object().unwrap();
        assert!(enc.finish().is_ok());
    }

    #[test]
    fn closing_object_mid_entry_is_an_error() {
        let mut enc = Encoder::new(Vec::new());
        enc.begin_object(None).unwrap();
        enc.write_field_name(b"a").unwrap();
        assert!(enc.end_object().is_err());
    }

    #[test]
    fn encoder_poisons_after_first_error() {
        let mut enc = Encoder::new(Vec::new());
        enc.begin_object(Some(1)).unwrap();
        assert!(enc.write_i64(1).is_err());
        assert!(enc.write_null().is_err());
    }

    #[test]
    fn unclosed_container_fails_finish() {
        let mut enc = Encoder::new(Vec::new());
        enc.begin_array(None).unwrap();
        assert!(enc.finish().is_err());
    }
}
