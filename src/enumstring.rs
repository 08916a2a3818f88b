//! Enum-string LRU indexer.
//!
//! Frequent strings get promoted to a 1- or 2-byte index reference. The
//! frequency/eviction structure is an intrusive hash+LRU-chain cache from
//! the `lru` crate rather than a hand-rolled one.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use lru::LruCache;

use crate::error::{Error, Result};
use crate::sink::ByteSink;
use crate::tag::{TAG_ENUM_CONFIG, TAG_ENUM_REF16, TAG_ENUM_REF8};

/// Minimum byte length of a string eligible for enum-string promotion.
const MIN_ELIGIBLE_LEN: usize = 3;
/// Cap on the promoted-string index space.
const MAX_INDEXED: usize = 65_536;
/// Only one algorithm is defined on the wire today.
const ALGORITHM_LRU: u8 = 0;

fn capacity_to_n(capacity: usize) -> Result<u8> {
    if !capacity.is_power_of_two() || capacity < 32 {
        return Err(Error::InvalidArgument(format!(
            "enum-string LRU capacity must be a power of two >= 32, got {}",
            capacity
        )));
    }
    let n = capacity.trailing_zeros() as i32 - 5;
    if !(0..=15).contains(&n) {
        return Err(Error::InvalidArgument(format!(
            "enum-string LRU capacity {} is out of the representable range",
            capacity
        )));
    }
    Ok(n as u8)
}

fn n_to_capacity(n: u8) -> usize {
    1usize << (5 + n as usize)
}

/// Encoder-side state for the optional enum-string subsystem.
pub struct EnumStringEncoder {
    enabled: bool,
    config_sent: bool,
    min_frequency: u32,
    indexed: Vec<Vec<u8>>,
    index_of: HashMap<Vec<u8>, usize>,
    counts: LruCache<Vec<u8>, u32>,
}

impl EnumStringEncoder {
    /// Disable enum-string compression for this document; every call to
    /// [`Self::try_encode`] then returns `Ok(false)` without touching the
    /// sink.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            config_sent: false,
            min_frequency: 1,
            indexed: Vec::new(),
            index_of: HashMap::new(),
            counts: LruCache::new(NonZeroUsize::new(1).unwrap()),
        }
    }

    /// Enable enum-string compression. `capacity` must be a power of two in
    /// `32..=1_048_576` (the `2^(5+n)` family the wire format negotiates);
    /// `min_frequency` is the occurrence count (>= 1) at which a string is
    /// promoted.
    pub fn new(min_frequency: u8, capacity: usize) -> Result<Self> {
        capacity_to_n(capacity)?;
        Ok(Self {
            enabled: true,
            config_sent: false,
            min_frequency: min_frequency as u32 + 1,
            indexed: Vec::new(),
            index_of: HashMap::new(),
            counts: LruCache::new(NonZeroUsize::new(capacity).unwrap()),
        })
    }

    fn capacity(&self) -> usize {
        self.counts.cap().get()
    }

    fn emit_config(&self, sink: &mut impl ByteSink) -> Result<()> {
        let n = capacity_to_n(self.capacity())?;
        sink.write_u8(TAG_ENUM_CONFIG)?;
        sink.write_u8((ALGORITHM_LRU << 4) | n)?;
        sink.write_u8((self.min_frequency - 1) as u8)
    }

    /// Offer `s` to the enum-string subsystem. Returns `Ok(true)` if an enum
    /// ref was written and the caller must *not* also emit a literal string;
    /// `Ok(false)` means the caller should emit `s` as an ordinary string.
    pub fn try_encode(&mut self, sink: &mut impl ByteSink, s: &[u8]) -> Result<bool> {
        if !self.enabled {
            return Ok(false);
        }
        if !self.config_sent {
            self.emit_config(sink)?;
            self.config_sent = true;
        }
        if s.len() < MIN_ELIGIBLE_LEN {
            return Ok(false);
        }

        if let Some(&idx) = self.index_of.get(s) {
            if idx <= u8::MAX as usize {
                sink.write_u8(TAG_ENUM_REF8)?;
                sink.write_u8(idx as u8)?;
            } else {
                sink.write_u8(TAG_ENUM_REF16)?;
                sink.write_uint_le(idx as u64, 2)?;
            }
            return Ok(true);
        }

        let freq = match self.counts.get_mut(s) {
            Some(f) => {
                *f += 1;
                *f
            }
            None => {
                self.counts.put(s.to_vec(), 1);
                1
            }
        };

        if freq >= self.min_frequency && self.indexed.len() < MAX_INDEXED {
            let idx = self.indexed.len();
            self.indexed.push(s.to_vec());
            self.index_of.insert(s.to_vec(), idx);
            self.counts.pop(s);
            tracing::trace!(index = idx, "promoted string to enum-string reference");
        }

        Ok(false)
    }
}

/// Decoder-side state, mirroring the encoder's promotion rules by observing
/// the same string occurrences as plain strings.
pub struct EnumStringDecoder {
    enabled: bool,
    min_frequency: u32,
    indexed: Vec<Vec<u8>>,
    index_of: HashMap<Vec<u8>, usize>,
    counts: LruCache<Vec<u8>, u32>,
}

impl Default for EnumStringDecoder {
    fn default() -> Self {
        Self {
            enabled: false,
            min_frequency: 1,
            indexed: Vec::new(),
            index_of: HashMap::new(),
            counts: LruCache::new(NonZeroUsize::new(1).unwrap()),
        }
    }
}

impl EnumStringDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `0x08` enum-config record's two payload bytes.
    pub fn parse_config(&mut self, algo_and_n: u8, min_frequency_minus_one: u8) -> Result<()> {
        let algo = algo_and_n >> 4;
        if algo != ALGORITHM_LRU {
            return Err(Error::Unsupported(format!(
                "unknown enum-string algorithm id {}",
                algo
            )));
        }
        let capacity = n_to_capacity(algo_and_n & 0x0F);
        self.enabled = true;
        self.min_frequency = min_frequency_minus_one as u32 + 1;
        self.indexed.clear();
        self.index_of.clear();
        self.counts = LruCache::new(NonZeroUsize::new(capacity).unwrap());
        Ok(())
    }

    /// Resolve a decoded enum-ref index to its string bytes.
    pub fn resolve(&self, idx: usize) -> Result<&[u8]> {
        self.indexed
            .get(idx)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::Malformed(format!("enum-string index {} out of range", idx)))
    }

    /// Feed a plain string the dispatcher just decoded through the same
    /// frequency/promotion state machine the encoder used.
    pub fn observe_plain_string(&mut self, s: &[u8]) {
        if !self.enabled || s.len() < MIN_ELIGIBLE_LEN || self.index_of.contains_key(s) {
            return;
        }
        let freq = match self.counts.get_mut(s) {
            Some(f) => {
                *f += 1;
                *f
            }
            None => {
                self.counts.put(s.to_vec(), 1);
                1
            }
        };
        if freq >= self.min_frequency && self.indexed.len() < MAX_INDEXED {
            let idx = self.indexed.len();
            self.indexed.push(s.to_vec());
            self.index_of.insert(s.to_vec(), idx);
            self.counts.pop(s);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotes_after_min_frequency_occurrences() {
        let mut enc = EnumStringEncoder::new(1, 32).unwrap(); // min_frequency = 2
        let mut buf = Vec::new();
        assert!(!enc.try_encode(&mut buf, b"hello").unwrap()); // config + 1st occurrence
        assert!(!enc.try_encode(&mut buf, b"hello").unwrap()); // 2nd occurrence promotes
        assert!(enc.try_encode(&mut buf, b"hello").unwrap()); // 3rd is a ref
    }

    #[test]
    fn short_strings_are_never_eligible() {
        let mut enc = EnumStringEncoder::new(0, 32).unwrap();
        let mut buf = Vec::new();
        for _ in 0..5 {
            assert!(!enc.try_encode(&mut buf, b"ab").unwrap());
        }
    }

    #[test]
    fn encoder_decoder_promotion_stays_in_sync() {
        let mut enc = EnumStringEncoder::new(0, 32).unwrap();
        let mut dec = EnumStringDecoder::new();
        let mut buf = Vec::new();
        enc.try_encode(&mut buf, b"repeat").unwrap();
        dec.parse_config(buf[1], buf[2]).unwrap();
        dec.observe_plain_string(b"repeat");

        let was_ref = enc.try_encode(&mut buf, b"repeat").unwrap();
        assert!(was_ref);
        assert_eq!(dec.resolve(0).unwrap(), b"repeat");
    }

    #[test]
    fn capacity_must_be_power_of_two() {
        assert!(EnumStringEncoder::new(0, 30).is_err());
        assert!(EnumStringEncoder::new(0, 64).is_ok());
    }
}
