#![forbid(unsafe_code)]
//! Offset arithmetic and flush thresholds shared by both backends.

use crate::types::{BridgeError, Result};

/// Lower clamp for the flush fill ratio.
pub const MIN_FLUSH_FACTOR: f32 = 0.5;
/// Upper clamp for the flush fill ratio.
pub const MAX_FLUSH_FACTOR: f32 = 0.99;
/// Fill ratio used when none is configured.
pub const DEFAULT_FLUSH_FACTOR: f32 = 0.8;

/// Clamps a fill ratio into `[MIN_FLUSH_FACTOR, MAX_FLUSH_FACTOR]`.
pub fn clamp_flush_factor(factor: f32) -> f32 {
    if factor.is_nan() {
        return DEFAULT_FLUSH_FACTOR;
    }
    factor.clamp(MIN_FLUSH_FACTOR, MAX_FLUSH_FACTOR)
}

/// Number of pages a session can close given its table sizes.
///
/// `offset_slots` is the length of the offset table (`pages + 1` entries);
/// `key_slots` is the length of the key-length table when the edge is keyed.
pub fn page_capacity(offset_slots: usize, key_slots: Option<usize>) -> usize {
    let pages = offset_slots.saturating_sub(1);
    match key_slots {
        Some(keys) => pages.min(keys),
        None => pages,
    }
}

/// Converts a content position into a table offset.
#[inline]
pub fn to_offset(position: usize, base: u64) -> u64 {
    base.wrapping_add(position as u64)
}

/// Converts a table offset back into a content position.
#[inline]
pub fn to_position(offset: u64, base: u64) -> usize {
    offset.wrapping_sub(base) as usize
}

/// Decides when a write session has to be flushed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FlushPolicy {
    capacity: usize,
    threshold: usize,
    max_pages: usize,
}

impl FlushPolicy {
    /// Builds a policy for a content region of `capacity` bytes holding at
    /// most `max_pages` pages.
    pub fn new(capacity: usize, factor: f32, max_pages: usize) -> Self {
        let factor = clamp_flush_factor(factor);
        let threshold = (capacity as f64 * f64::from(factor)) as usize;
        Self {
            capacity,
            threshold,
            max_pages,
        }
    }

    /// Declared content capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Position past which the session must flush.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Maximum number of pages per session.
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    /// Returns whether a session at `position` with `pages` closed pages must flush.
    #[inline]
    pub fn should_flush(&self, position: usize, pages: usize) -> bool {
        pages >= self.max_pages || position > self.threshold
    }

    /// Fails when the write position ran past the declared capacity.
    pub fn check_overflow(&self, position: usize, last_page: usize) -> Result<()> {
        if position > self.capacity {
            return Err(BridgeError::BufferOverflow {
                capacity: self.capacity,
                exceeded: position - self.capacity,
                last_page,
            });
        }
        Ok(())
    }
}
