//! An owned, in-memory document tree.
//!
//! Object member order is preserved as written — a plain `Vec<(Vec<u8>,
//! Value)>`, not a sorted map. The wire format has no concept of canonical
//! key ordering, so sorting keys here would silently reorder what a caller
//! wrote.

use num_bigint::BigInt;

use crate::decoder::{Decoder, Event};
use crate::encoder::{Encoder, EncoderOptions};
use crate::error::{Error, Result};
use crate::sink::ByteSink;
use crate::source::ByteSource;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
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
    /// Not necessarily UTF-8: a string is a length-prefixed byte
    /// sequence, not a guaranteed-valid one.
    String(Vec<u8>),
    Array(Vec<Value>),
    Object(Vec<(Vec<u8>, Value)>),
}

impl Value {
    fn write(&self, enc: &mut Encoder<impl ByteSink>) -> Result<()> {
        match self {
            Value::Null => enc.write_null(),
            Value::Bool(b) => enc.write_bool(*b),
            Value::Int(v) => enc.write_i64(*v),
            Value::Float32(v) => enc.write_f32(*v),
            Value::Float64(v) => enc.write_f64(*v),
            Value::BigInteger(v) => enc.write_biginteger(v),
            Value::BigDecimal {
                unscaled,
                scale,
                precision,
            } => enc.write_bigdecimal(unscaled, *scale, *precision),
            Value::Bytes(b) => enc.write_bytes(b),
            Value::String(s) => enc.write_string(s),
            Value::Array(items) => {
                enc.begin_array(Some(items.len() as u32))?;
                for item in items {
                    item.write(enc)?;
                }
                enc.end_array()
            }
            Value::Object(entries) => {
                enc.begin_object(Some(entries.len() as u32))?;
                for (key, val) in entries {
                    enc.write_field_name(key)?;
                    val.write(enc)?;
                }
                enc.end_object()
            }
        }
    }

    fn read<'a>(dec: &mut Decoder<'a, impl ByteSource<'a>>, event: Event) -> Result<Value> {
        match event {
            Event::Null => Ok(Value::Null),
            Event::Bool(b) => Ok(Value::Bool(b)),
            Event::Int(v) => Ok(Value::Int(v)),
            Event::Float32(v) => Ok(Value::Float32(v)),
            Event::Float64(v) => Ok(Value::Float64(v)),
            Event::BigInteger(v) => Ok(Value::BigInteger(v)),
            Event::BigDecimal {
                unscaled,
                scale,
                precision,
            } => Ok(Value::BigDecimal {
                unscaled,
                scale,
                precision,
            }),
            Event::Bytes(b) => Ok(Value::Bytes(b)),
            Event::String(s) => Ok(Value::String(s)),
            Event::ArrayStart(_) => {
                let mut items = Vec::new();
                loop {
                    match dec.next_event()? {
                        Event::ArrayEnd => break,
                        ev => items.push(Value::read(dec, ev)?),
                    }
                }
                Ok(Value::Array(items))
            }
            Event::ObjectStart(_) => {
                let mut entries = Vec::new();
                loop {
                    let key = match dec.next_event()? {
                        Event::ObjectEnd => break,
                        Event::FieldName(k) => k,
                        other => {
                            return Err(Error::Malformed(format!(
                                "expected a field name, found {}",
                                describe_unexpected(&other)
                            )))
                        }
                    };
                    let val_event = dec.next_event()?;
                    entries.push((key, Value::read(dec, val_event)?));
                }
                Ok(Value::Object(entries))
            }
            other => Err(Error::Malformed(format!(
                "unexpected event while reading a value: {}",
                describe_unexpected(&other)
            ))),
        }
    }
}

fn describe_unexpected(event: &Event) -> &'static str {
    match event {
        Event::ArrayEnd => "array end",
        Event::ObjectEnd => "object end",
        Event::DocumentEnd => "document end",
        _ => "unexpected event",
    }
}

/// Encode a whole [`Value`] tree into a fresh byte buffer.
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    encode_value_with(value, EncoderOptions::default())
}

/// Same as [`encode_value`], with explicit encoder options (e.g. enum-string
/// compression).
pub fn encode_value_with(value: &Value, options: EncoderOptions) -> Result<Vec<u8>> {
    let mut enc = Encoder::with_options(Vec::new(), options);
    value.write(&mut enc)?;
    enc.finish()
}

/// Decode one complete [`Value`] tree from `data`, ignoring any trailing
/// bytes after it.
pub fn decode_value(data: &[u8]) -> Result<Value> {
    let mut dec = Decoder::new(crate::source::SliceSource::new(data));
    let first = dec.next_event()?;
    Value::read(&mut dec, first)
}
