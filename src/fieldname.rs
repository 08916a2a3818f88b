//! Field-name compression.
//!
//! Encoder and decoder each own a per-document dictionary: a growing
//! `indexed` list of field names seen so far, and the `last_key` bytes used
//! for prefix/suffix sharing against the next key. Both pieces of state are
//! owned directly by the encoder/decoder and reset per document, not global.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::sink::ByteSink;
use crate::source::ByteSource;

/// Cap on the indexed dictionary and on the length field used by all four
/// forms.
pub const MAX_FIELD_DICT: usize = 65_819;

const FORM_FULL: u8 = 0b100;
const FORM_INDEXED: u8 = 0b101;
const FORM_PREFIX: u8 = 0b110;
const FORM_PREFIX_SUFFIX: u8 = 0b111;

enum LenExtra {
    None,
    One(u8),
    Two(u8, u8),
}

fn length_field(value: usize) -> Result<(u8, LenExtra)> {
    if value <= 29 {
        Ok((value as u8, LenExtra::None))
    } else if value <= 284 {
        Ok((30, LenExtra::One((value - 29) as u8)))
    } else if value <= MAX_FIELD_DICT {
        let v = (value - 284) as u16;
        let b = v.to_le_bytes();
        Ok((31, LenExtra::Two(b[0], b[1])))
    } else {
        Err(Error::InvalidArgument(format!(
            "field name length/index {} exceeds the {} dictionary cap",
            value, MAX_FIELD_DICT
        )))
    }
}

fn write_len_extra(sink: &mut impl ByteSink, extra: LenExtra) -> Result<()> {
    match extra {
        LenExtra::None => Ok(()),
        LenExtra::One(b) => sink.write_u8(b),
        LenExtra::Two(a, b) => {
            sink.write_u8(a)?;
            sink.write_u8(b)
        }
    }
}

fn read_length_field<'a>(src: &mut impl ByteSource<'a>, low5: u8) -> Result<usize> {
    match low5 {
        0..=29 => Ok(low5 as usize),
        30 => {
            let extra = src.read_u8()?;
            Ok(29 + extra as usize)
        }
        31 => {
            let lo = src.read_u8()?;
            let hi = src.read_u8()?;
            Ok(284 + u16::from_le_bytes([lo, hi]) as usize)
        }
        _ => unreachable!("low5 is masked to 5 bits"),
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    let n = a.len().min(b.len());
    let mut p = 0;
    while p < n && a[p] == b[p] {
        p += 1;
    }
    p.min(255)
}

/// Longest common suffix of `a` and `b`, stopping one byte short of fully
/// consuming both when they're the same length — otherwise an
/// exact-length match would mean `a == b`, which the caller never sees here
/// since an equal key is always resolved by the indexed-reference branch
/// first.
fn common_suffix_len(a: &[u8], b: &[u8]) -> usize {
    let mut limit = a.len().min(b.len());
    if a.len() == b.len() {
        limit = limit.saturating_sub(1);
    }
    let mut s = 0;
    while s < limit && a[a.len() - 1 - s] == b[b.len() - 1 - s] {
        s += 1;
    }
    s.min(255)
}

/// Owns the encoder-side field-name dictionary for one document.
#[derive(Default)]
pub struct FieldNameEncoder {
    indexed: Vec<Vec<u8>>,
    index_of: HashMap<Vec<u8>, usize>,
    last_key: Vec<u8>,
}

impl FieldNameEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a field name, choosing the cheapest applicable form.
    pub fn encode(&mut self, sink: &mut impl ByteSink, key: &[u8]) -> Result<()> {
        if let Some(&idx) = self.index_of.get(key) {
            let (low5, extra) = length_field(idx)?;
            sink.write_u8((FORM_INDEXED << 5) | low5)?;
            write_len_extra(sink, extra)?;
            self.last_key = key.to_vec();
            return Ok(());
        }

        let (prefix, suffix) = if !self.last_key.is_empty() && self.last_key.len() > 4 {
            let p = common_prefix_len(&self.last_key, key);
            let s = common_suffix_len(&self.last_key[p..], &key[p..]);
            (p, s)
        } else {
            (0, 0)
        };

        if suffix > 2 {
            let payload = &key[prefix..key.len() - suffix];
            let (low5, extra) = length_field(payload.len())?;
            sink.write_u8((FORM_PREFIX_SUFFIX << 5) | low5)?;
            sink.write_u8(prefix as u8)?;
            sink.write_u8(suffix as u8)?;
            write_len_extra(sink, extra)?;
            sink.write_bytes(payload)?;
        } else if prefix > 2 {
            let payload = &key[prefix..];
            let (low5, extra) = length_field(payload.len())?;
            sink.write_u8((FORM_PREFIX << 5) | low5)?;
            sink.write_u8(prefix as u8)?;
            write_len_extra(sink, extra)?;
            sink.write_bytes(payload)?;
        } else {
            let (low5, extra) = length_field(key.len())?;
            sink.write_u8((FORM_FULL << 5) | low5)?;
            write_len_extra(sink, extra)?;
            sink.write_bytes(key)?;
        }

        if self.indexed.len() < MAX_FIELD_DICT {
            self.index_of.insert(key.to_vec(), self.indexed.len());
            self.indexed.push(key.to_vec());
        }
        self.last_key = key.to_vec();
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn dict_len(&self) -> usize {
        self.indexed.len()
    }
}

/// Owns the decoder-side field-name dictionary for one document.
#[derive(Default)]
pub struct FieldNameDecoder {
    indexed: Vec<Vec<u8>>,
    last_key: Vec<u8>,
}

impl FieldNameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next field name. `tag_byte` is the already-read first
    /// byte (the caller peeked it while deciding this was a key position).
    pub fn decode<'a>(&mut self, src: &mut impl ByteSource<'a>, tag_byte: u8) -> Result<Vec<u8>> {
        if !(0x80..=0xFF).contains(&tag_byte) {
            return Err(Error::Malformed(format!(
                "expected a field name tag, found 0x{:02x}",
                tag_byte
            )));
        }
        let form = tag_byte >> 5;
        let low5 = tag_byte & 0x1F;
        let length = read_length_field(src, low5)?;

        let key = match form {
            f if f == FORM_FULL => src.read_bytes(length)?.to_vec(),
            f if f == FORM_INDEXED => self
                .indexed
                .get(length)
                .cloned()
                .ok_or_else(|| Error::Malformed(format!("field name index {} out of range", length)))?,
            f if f == FORM_PREFIX => {
                let p = src.read_u8()? as usize;
                let payload = src.read_bytes(length)?;
                if p > self.last_key.len() {
                    return Err(Error::Malformed("field name prefix longer than last key".into()));
                }
                let mut key = self.last_key[..p].to_vec();
                key.extend_from_slice(payload);
                key
            }
            f if f == FORM_PREFIX_SUFFIX => {
                let p = src.read_u8()? as usize;
                let s = src.read_u8()? as usize;
                let payload = src.read_bytes(length)?;
                if p + s > self.last_key.len() {
                    return Err(Error::Malformed(
                        "field name prefix+suffix longer than last key".into(),
                    ));
                }
                let mut key = self.last_key[..p].to_vec();
                key.extend_from_slice(payload);
                key.extend_from_slice(&self.last_key[self.last_key.len() - s..]);
                key
            }
            _ => unreachable!("form is masked to 3 bits of a byte already checked >= 0x80"),
        };

        if form != FORM_INDEXED && self.indexed.len() < MAX_FIELD_DICT {
            self.indexed.push(key.clone());
        }
        self.last_key = key.clone();
        Ok(key)
    }

    #[cfg(test)]
    pub(crate) fn dict_len(&self) -> usize {
        self.indexed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SliceSource;

    fn encode_all(keys: &[&str]) -> Vec<u8> {
        let mut enc = FieldNameEncoder::new();
        let mut buf = Vec::new();
        for k in keys {
            enc.encode(&mut buf, k.as_bytes()).unwrap();
        }
        buf
    }

    #[test]
    fn scenario_indexed_and_prefix() {
        let buf = encode_all(&["aaaaa", "bbbbb", "aaaaa", "aaabb", "aaacc"]);
        let expected = [
            0x85, 0x61, 0x61, 0x61, 0x61, 0x61, // "aaaaa" full
            0x85, 0x62, 0x62, 0x62, 0x62, 0x62, // "bbbbb" full
            0xa0, // indexed ref to "aaaaa"
            0xc2, 0x03, 0x62, 0x62, // prefix-shared "aaabb"
            0xc2, 0x03, 0x63, 0x63, // prefix-shared "aaacc"
        ];
        assert_eq!(buf, expected);
    }

    #[test]
    fn scenario_prefix_and_suffix() {
        let buf = encode_all(&[
            "aaaaa", "aaabbb", "aaaccc", "ddd", "dddeee", "dddffeee",
        ]);
        assert_eq!(&buf[buf.len() - 5..], &[0xe2, 0x03, 0x03, 0x66, 0x66]);
    }

    #[test]
    fn decoder_mirrors_encoder_dictionary() {
        let keys = ["aaaaa", "bbbbb", "aaaaa", "aaabb", "aaacc"];
        let mut enc = FieldNameEncoder::new();
        let mut buf = Vec::new();
        for k in &keys {
            enc.encode(&mut buf, k.as_bytes()).unwrap();
        }

        let mut dec = FieldNameDecoder::new();
        let mut src = SliceSource::new(&buf);
        let mut got = Vec::new();
        while src.remaining() > 0 {
            let tag_byte = src.read_u8().unwrap();
            got.push(String::from_utf8(dec.decode(&mut src, tag_byte).unwrap()).unwrap());
        }
        assert_eq!(got, keys);
        assert_eq!(enc.dict_len(), dec.dict_len());
    }

    #[test]
    fn short_key_guard_forces_full_literal() {
        // last_key length <= 4 must always force a full literal, never
        // prefix/suffix sharing, even with a long overlap available.
        let buf = encode_all(&["abcd", "abcde"]);
        assert_eq!(buf[0], 0x84); // "abcd" full
        assert_eq!(buf[5], 0x85); // "abcde" full too: guard on |lastKey| > 4
    }
}
