//! Compact, self-describing binary encoding that preserves the JSON data
//! model (null, bool, signed integers, floats, arbitrary-precision decimals,
//! bytes, strings, arrays, objects) without normalizing key order or number
//! representation.
//!
//! The crate is split the way a tag-dispatched binary format naturally
//! wants: a pure byte classifier ([`tag`]), leaf-value codecs ([`integer`],
//! [`bigdecimal`]), the two stateful per-document dictionaries
//! ([`fieldname`], [`enumstring`]), container bookkeeping ([`depth`]), and
//! the push/pull document-level APIs ([`encoder`], [`decoder`]) built on
//! top of all of it. [`value::Value`] and [`value::encode_value`] /
//! [`value::decode_value`] are the convenience whole-tree API for callers
//! who don't need streaming.

mod bigdecimal;
mod depth;
mod decoder;
mod encoder;
mod enumstring;
mod error;
mod fieldname;
mod integer;
mod sink;
mod source;
mod tag;
mod value;

pub use bigdecimal::Decimal;
pub use decoder::{Decoder, Event};
pub use depth::MAX_DEPTH;
pub use encoder::{Encoder, EncoderOptions};
pub use error::{Error, Result};
pub use fieldname::MAX_FIELD_DICT;
pub use sink::{ByteSink, SliceSink};
pub use source::{ByteSource, SliceSource};
pub use value::{decode_value, encode_value, encode_value_with, Value};
