//! Pull-style document decoder.
//!
//! `Decoder::next_event` walks the byte stream one value at a time. Inside
//! an EOF-terminated container the decoder must peek the next byte before
//! committing to either "this is the `0x01` end marker" or "this is the
//! start of another element".

use num_bigint::BigInt;

use crate::bigdecimal::read_decimal;
use crate::depth::{DepthStack, FrameKind};
use crate::enumstring::EnumStringDecoder;
use crate::error::{Error, Result};
use crate::fieldname::FieldNameDecoder;
use crate::integer::read_int;
use crate::source::ByteSource;
use crate::tag::{self, Tag};

/// One decoded unit of the document stream.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Null,
    Bool(bool),
    Int(i64),
    Float32(f32),
    Float64(f64),
    BigInteger(BigInt),
    BigDecimal {
        unscaled: BigInt,
        scale: i32,
        precision: u32,
    },
    Bytes(Vec<u8>),
    String(Vec<u8>),
    ArrayStart(Option<u32>),
    ArrayEnd,
    ObjectStart(Option<u32>),
    FieldName(Vec<u8>),
    ObjectEnd,
    /// Emitted exactly once, after the root value (and all its nested
    /// containers) has been fully read.
    DocumentEnd,
}

impl Event {
    fn category(&self) -> &'static str {
        match self {
            Event::Null => "null",
            Event::Bool(_) => "bool",
            Event::Int(_) => "int",
            Event::Float32(_) => "float32",
            Event::Float64(_) => "float64",
            Event::BigInteger(_) => "biginteger",
            Event::BigDecimal { .. } => "bigdecimal",
            Event::Bytes(_) => "bytes",
            Event::String(_) => "string",
            Event::ArrayStart(_) => "array start",
            Event::ArrayEnd => "array end",
            Event::ObjectStart(_) => "object start",
            Event::FieldName(_) => "field name",
            Event::ObjectEnd => "object end",
            Event::DocumentEnd => "document end",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ObjectSlot {
    Key,
    Value,
}

enum OpenFrame {
    Array,
    Object(ObjectSlot),
}

pub struct Decoder<'a, R: ByteSource<'a>> {
    source: R,
    fields: FieldNameDecoder,
    enums: EnumStringDecoder,
    depth: DepthStack,
    frames: Vec<OpenFrame>,
    top_level_done: bool,
    errored: bool,
    _lifetime: std::marker::PhantomData<&'a ()>,
}

impl<'a, R: ByteSource<'a>> Decoder<'a, R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            fields: FieldNameDecoder::new(),
            enums: EnumStringDecoder::new(),
            depth: DepthStack::new(),
            frames: Vec::new(),
            top_level_done: false,
            errored: false,
            _lifetime: std::marker::PhantomData,
        }
    }

    fn fail<T>(&mut self, e: Error) -> Result<T> {
        self.errored = true;
        Err(e)
    }

    fn peek_is_end(&self) -> bool {
        self.source.peek_u8() == Some(tag::TAG_END)
    }

    fn close_frame(&mut self, kind: FrameKind, event: Event) -> Result<Event> {
        if let Err(e) = self.depth.pop(kind) {
            return self.fail(e);
        }
        self.frames.pop();
        if self.frames.is_empty() {
            self.top_level_done = true;
        }
        Ok(event)
    }

    /// Read the next tag, transparently consuming any enum-config records
    /// in front of it, then charge the current container one slot.
    fn next_value_tag(&mut self) -> Result<Tag> {
        loop {
            let tag = match tag::read_tag(&mut self.source) {
                Ok(t) => t,
                Err(e) => return self.fail(e),
            };
            if let Tag::EnumConfig = tag {
                let b1 = self.source.read_u8().map_err(|e| {
                    self.errored = true;
                    e
                })?;
                let b2 = self.source.read_u8().map_err(|e| {
                    self.errored = true;
                    e
                })?;
                if let Err(e) = self.enums.parse_config(b1, b2) {
                    return self.fail(e);
                }
                continue;
            }
            if let Err(e) = self.depth.consume_slot() {
                return self.fail(e);
            }
            return Ok(tag);
        }
    }

    fn decode_value(&mut self) -> Result<Event> {
        let tag = self.next_value_tag()?;
        match tag {
            Tag::Null => Ok(Event::Null),
            Tag::False => Ok(Event::Bool(false)),
            Tag::True => Ok(Event::Bool(true)),
            Tag::F32 => {
                let bytes = self.source.read_bytes(4).map_err(|e| {
                    self.errored = true;
                    e
                })?;
                Ok(Event::Float32(f32::from_le_bytes(bytes.try_into().unwrap())))
            }
            Tag::F64 => {
                let bytes = self.source.read_bytes(8).map_err(|e| {
                    self.errored = true;
                    e
                })?;
                Ok(Event::Float64(f64::from_le_bytes(bytes.try_into().unwrap())))
            }
            Tag::BigDecimal => match read_decimal(&mut self.source) {
                Ok(d) if d.scale == 0 && d.precision == 0 => Ok(Event::BigInteger(d.unscaled)),
                Ok(d) => Ok(Event::BigDecimal {
                    unscaled: d.unscaled,
                    scale: d.scale,
                    precision: d.precision,
                }),
                Err(e) => self.fail(e),
            },
            Tag::EnumRef8 => {
                let idx = self.source.read_u8().map_err(|e| {
                    self.errored = true;
                    e
                })? as usize;
                let s = match self.enums.resolve(idx) {
                    Ok(s) => s.to_vec(),
                    Err(e) => return self.fail(e),
                };
                Ok(Event::String(s))
            }
            Tag::EnumRef16 => {
                let idx = self.source.read_uint_le(2).map_err(|e| {
                    self.errored = true;
                    e
                })? as usize;
                let s = match self.enums.resolve(idx) {
                    Ok(s) => s.to_vec(),
                    Err(e) => return self.fail(e),
                };
                Ok(Event::String(s))
            }
            Tag::Reserved(b) => self.fail(Error::Unsupported(format!("reserved tag 0x{:02x}", b))),
            Tag::Unmapped(b) => self.fail(Error::Malformed(format!("unmapped tag 0x{:02x}", b))),
            Tag::PosIntInline(_) | Tag::PosIntWide(_) | Tag::NegIntInline(_) | Tag::NegIntWide(_) => {
                match read_int(tag, &mut self.source) {
                    Ok(v) => Ok(Event::Int(v)),
                    Err(e) => self.fail(e),
                }
            }
            Tag::Bytes(low) => {
                let len = match tag::read_extended(&mut self.source, low, 59) {
                    Ok(l) => l,
                    Err(e) => return self.fail(e),
                };
                let data = self.source.read_bytes(len).map_err(|e| {
                    self.errored = true;
                    e
                })?;
                Ok(Event::Bytes(data.to_vec()))
            }
            Tag::Str(low) => {
                let len = match tag::read_extended(&mut self.source, low, 59) {
                    Ok(l) => l,
                    Err(e) => return self.fail(e),
                };
                let data = self.source.read_bytes(len).map_err(|e| {
                    self.errored = true;
                    e
                })?;
                self.enums.observe_plain_string(data);
                Ok(Event::String(data.to_vec()))
            }
            Tag::Array(low) => {
                let count = match read_container_len(&mut self.source, low) {
                    Ok(c) => c,
                    Err(e) => return self.fail(e),
                };
                if let Err(e) = self.depth.push(FrameKind::Array, count) {
                    return self.fail(e);
                }
                self.frames.push(OpenFrame::Array);
                Ok(Event::ArrayStart(count))
            }
            Tag::Object(low) => {
                let count = match read_container_len(&mut self.source, low) {
                    Ok(c) => c,
                    Err(e) => return self.fail(e),
                };
                if let Err(e) = self.depth.push(FrameKind::Object, count) {
                    return self.fail(e);
                }
                self.frames.push(OpenFrame::Object(ObjectSlot::Key));
                Ok(Event::ObjectStart(count))
            }
            Tag::End | Tag::EnumConfig => {
                self.fail(Error::Malformed("unexpected end-of-container marker here".into()))
            }
        }
    }

    fn decode_field_name(&mut self) -> Result<Event> {
        let tag_byte = self.source.read_u8().map_err(|e| {
            self.errored = true;
            e
        })?;
        if let Err(e) = self.depth.consume_slot() {
            return self.fail(e);
        }
        match self.fields.decode(&mut self.source, tag_byte) {
            Ok(name) => Ok(Event::FieldName(name)),
            Err(e) => self.fail(e),
        }
    }

    /// Pull the next event from the document.
    pub fn next_event(&mut self) -> Result<Event> {
        if self.errored {
            return Err(Error::Malformed("decoder already failed; document is unusable".into()));
        }

        match self.frames.last() {
            None => {
                if self.top_level_done {
                    return Ok(Event::DocumentEnd);
                }
                let ev = self.decode_value()?;
                if self.frames.is_empty() {
                    self.top_level_done = true;
                }
                Ok(ev)
            }
            Some(OpenFrame::Array) => {
                if self.depth.at_eof_container() {
                    if self.peek_is_end() {
                        self.source.read_u8().ok();
                        return self.close_frame(FrameKind::Array, Event::ArrayEnd);
                    }
                } else if self.depth.remaining_is_zero() {
                    return self.close_frame(FrameKind::Array, Event::ArrayEnd);
                }
                self.decode_value()
            }
            Some(OpenFrame::Object(ObjectSlot::Key)) => {
                if self.depth.at_eof_container() {
                    if self.peek_is_end() {
                        self.source.read_u8().ok();
                        return self.close_frame(FrameKind::Object, Event::ObjectEnd);
                    }
                } else if self.depth.remaining_is_zero() {
                    return self.close_frame(FrameKind::Object, Event::ObjectEnd);
                }
                let ev = self.decode_field_name()?;
                if let Some(OpenFrame::Object(slot)) = self.frames.last_mut() {
                    *slot = ObjectSlot::Value;
                }
                Ok(ev)
            }
            Some(OpenFrame::Object(ObjectSlot::Value)) => {
                let ev = self.decode_value()?;
                if let Some(OpenFrame::Object(slot)) = self.frames.last_mut() {
                    *slot = ObjectSlot::Key;
                }
                Ok(ev)
            }
        }
    }

    fn typed<T>(&mut self, expected: &'static str, f: impl FnOnce(Event) -> Option<T>) -> Result<T> {
        let ev = self.next_event()?;
        let found = ev.category();
        f(ev).ok_or(Error::TypeMismatch { expected, found })
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.typed("int", |ev| match ev {
            Event::Int(v) => Some(v),
            _ => None,
        })
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        self.typed("bool", |ev| match ev {
            Event::Bool(v) => Some(v),
            _ => None,
        })
    }

    pub fn read_string(&mut self) -> Result<Vec<u8>> {
        self.typed("string", |ev| match ev {
            Event::String(v) => Some(v),
            _ => None,
        })
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        self.typed("bytes", |ev| match ev {
            Event::Bytes(v) => Some(v),
            _ => None,
        })
    }
}

fn read_container_len<'a>(src: &mut impl ByteSource<'a>, low: u8) -> Result<Option<u32>> {
    if low == 0x0F {
        return Ok(None);
    }
    let len = tag::read_extended(src, low, 10)?;
    u32::try_from(len)
        .map(Some)
        .map_err(|_| Error::Malformed("container length overflows u32".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;
    use crate::source::SliceSource;

    #[test]
    fn scalar_document_then_document_end() {
        let mut enc = Encoder::new(Vec::new());
        enc.write_i64(42).unwrap();
        let buf = enc.finish().unwrap();

        let mut dec = Decoder::new(SliceSource::new(&buf));
        assert_eq!(dec.next_event().unwrap(), Event::Int(42));
        assert_eq!(dec.next_event().unwrap(), Event::DocumentEnd);
        assert_eq!(dec.next_event().unwrap(), Event::DocumentEnd);
    }

    #[test]
    fn sized_array_round_trips() {
        let mut enc = Encoder::new(Vec::new());
        enc.begin_array(Some(2)).unwrap();
        enc.write_i64(1).unwrap();
        enc.write_i64(2).unwrap();
        enc.end_array().unwrap();
        let buf = enc.finish().unwrap();

        let mut dec = Decoder::new(SliceSource::new(&buf));
        assert_eq!(dec.next_event().unwrap(), Event::ArrayStart(Some(2)));
        assert_eq!(dec.next_event().unwrap(), Event::Int(1));
        assert_eq!(dec.next_event().unwrap(), Event::Int(2));
        assert_eq!(dec.next_event().unwrap(), Event::ArrayEnd);
        assert_eq!(dec.next_event().unwrap(), Event::DocumentEnd);
    }

    #[test]
    fn eof_array_round_trips() {
        let mut enc = Encoder::new(Vec::new());
        enc.begin_array(None).unwrap();
        enc.write_i64(1).unwrap();
        enc.write_i64(2).unwrap();
        enc.end_array().unwrap();
        let buf = enc.finish().unwrap();

        let mut dec = Decoder::new(SliceSource::new(&buf));
        assert_eq!(dec.next_event().unwrap(), Event::ArrayStart(None));
        assert_eq!(dec.next_event().unwrap(), Event::Int(1));
        assert_eq!(dec.next_event().unwrap(), Event::Int(2));
        assert_eq!(dec.next_event().unwrap(), Event::ArrayEnd);
    }

    #[test]
    fn object_round_trips_field_names() {
        let mut enc = Encoder::new(Vec::new());
        enc.begin_object(Some(2)).unwrap();
        enc.write_field_name(b"a").unwrap();
        enc.write_i64(1).unwrap();
        enc.write_field_name(b"b").unwrap();
        enc.write_bool(true).unwrap();
        enc.end_object().unwrap();
        let buf = enc.finish().unwrap();

        let mut dec = Decoder::new(SliceSource::new(&buf));
        assert_eq!(dec.next_event().unwrap(), Event::ObjectStart(Some(2)));
        assert_eq!(dec.next_event().unwrap(), Event::FieldName(b"a".to_vec()));
        assert_eq!(dec.next_event().unwrap(), Event::Int(1));
        assert_eq!(dec.next_event().unwrap(), Event::FieldName(b"b".to_vec()));
        assert_eq!(dec.next_event().unwrap(), Event::Bool(true));
        assert_eq!(dec.next_event().unwrap(), Event::ObjectEnd);
    }

    #[test]
    fn enum_strings_round_trip_through_the_wire() {
        use crate::encoder::EncoderOptions;
        let mut enc = Encoder::with_options(
            Vec::new(),
            EncoderOptions {
                enum_strings: Some((0, 32)),
            },
        );
        enc.begin_array(Some(3)).unwrap();
        enc.write_string(b"repeat").unwrap();
        enc.write_string(b"repeat").unwrap();
        enc.write_string(b"repeat").unwrap();
        enc.end_array().unwrap();
        let buf = enc.finish().unwrap();

        let mut dec = Decoder::new(SliceSource::new(&buf));
        assert_eq!(dec.next_event().unwrap(), Event::ArrayStart(Some(3)));
        for _ in 0..3 {
            assert_eq!(dec.next_event().unwrap(), Event::String(b"repeat".to_vec()));
        }
        assert_eq!(dec.next_event().unwrap(), Event::ArrayEnd);
    }

    #[test]
    fn unmapped_tag_is_malformed() {
        let mut dec = Decoder::new(SliceSource::new(&[0x10]));
        assert!(matches!(dec.next_event(), Err(Error::Malformed(_))));
    }

    #[test]
    fn reserved_tag_is_unsupported() {
        let mut dec = Decoder::new(SliceSource::new(&[0x04]));
        assert!(matches!(dec.next_event(), Err(Error::Unsupported(_))));
    }
}
