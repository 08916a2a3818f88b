//! Container nesting and remaining-element tracking.
//!
//! Some containers declare their length up front and some don't
//! (EOF-terminated, low nibble `15`), so each frame's remaining count is
//! `Option<u32>` rather than a bare `u32` — `None` means "stop on the
//! `0x01` end marker instead".

use crate::error::{Error, Result};

/// Hard nesting-depth ceiling: at least 1024 frames deep.
pub const MAX_DEPTH: usize = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    Array,
    Object,
}

#[derive(Clone, Debug)]
struct Frame {
    kind: FrameKind,
    /// Remaining value slots. For an object this counts key+value slots
    /// separately, two per entry.
    remaining: Option<u32>,
}

/// Tracks the stack of open containers for one document, shared by both the
/// encoder and the decoder since the bookkeeping rules are identical on
/// either side of the wire.
#[derive(Clone, Debug, Default)]
pub struct DepthStack {
    frames: Vec<Frame>,
}

impl DepthStack {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Current nesting depth (0 at the top level).
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// True if the innermost open container is EOF-terminated rather than
    /// sized.
    pub fn at_eof_container(&self) -> bool {
        matches!(self.frames.last(), Some(Frame { remaining: None, .. }))
    }

    /// True if the innermost sized container has no slots left. Always
    /// `false` for an EOF-terminated container or at the top level.
    pub fn remaining_is_zero(&self) -> bool {
        matches!(self.frames.last(), Some(Frame { remaining: Some(0), .. }))
    }

    /// Mark that one value slot in the current innermost container was just
    /// consumed (by writing or reading a value, a key, or a whole nested
    /// container). No-op at the top level.
    pub fn consume_slot(&mut self) -> Result<()> {
        if let Some(frame) = self.frames.last_mut() {
            if let Some(remaining) = frame.remaining.as_mut() {
                if *remaining == 0 {
                    return Err(Error::Malformed(
                        "more elements than the container's declared length".into(),
                    ));
                }
                *remaining -= 1;
            }
        }
        Ok(())
    }

    /// Open a new container frame. Must be called after [`Self::consume_slot`]
    /// has already accounted for the container itself occupying a slot in
    /// its parent.
    pub fn push(&mut self, kind: FrameKind, count: Option<u32>) -> Result<()> {
        let remaining = count.map(|c| if kind == FrameKind::Object { c * 2 } else { c });
        self.frames.push(Frame { kind, remaining });
        if self.frames.len() > MAX_DEPTH {
            return Err(Error::Malformed(format!(
                "nesting depth exceeds the {} frame limit",
                MAX_DEPTH
            )));
        }
        Ok(())
    }

    /// Close the innermost container, checking it matches `kind` and (for a
    /// sized container) that every declared slot was consumed.
    pub fn pop(&mut self, kind: FrameKind) -> Result<()> {
        let frame = self.frames.pop().ok_or_else(|| {
            Error::Malformed("end of container with no container open".into())
        })?;
        if frame.kind != kind {
            return Err(Error::Malformed("container end tag does not match its start".into()));
        }
        if let Some(remaining) = frame.remaining {
            if remaining != 0 {
                return Err(Error::Malformed(
                    "container closed before its declared length was reached".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sized_array_tracks_remaining() {
        let mut stack = DepthStack::new();
        stack.consume_slot().unwrap();
        stack.push(FrameKind::Array, Some(2)).unwrap();
        stack.consume_slot().unwrap();
        stack.consume_slot().unwrap();
        stack.pop(FrameKind::Array).unwrap();
    }

    #[test]
    fn object_counts_two_slots_per_entry() {
        let mut stack = DepthStack::new();
        stack.push(FrameKind::Object, Some(1)).unwrap();
        stack.consume_slot().unwrap(); // key
        stack.consume_slot().unwrap(); // value
        stack.pop(FrameKind::Object).unwrap();
    }

    #[test]
    fn closing_early_is_an_error() {
        let mut stack = DepthStack::new();
        stack.push(FrameKind::Array, Some(2)).unwrap();
        stack.consume_slot().unwrap();
        assert!(stack.pop(FrameKind::Array).is_err());
    }

    #[test]
    fn eof_container_has_no_remaining_count() {
        let mut stack = DepthStack::new();
        stack.push(FrameKind::Array, None).unwrap();
        assert!(stack.at_eof_container());
        stack.consume_slot().unwrap();
        stack.consume_slot().unwrap();
        stack.pop(FrameKind::Array).unwrap();
    }

    #[test]
    fn depth_limit_is_enforced() {
        let mut stack = DepthStack::new();
        for _ in 0..MAX_DEPTH {
            stack.push(FrameKind::Array, None).unwrap();
        }
        assert!(stack.push(FrameKind::Array, None).is_err());
    }
}
