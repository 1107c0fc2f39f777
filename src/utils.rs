//! Utility helpers for alignment, page size, and safe range calculations.

use std::sync::OnceLock;

use crate::errors::{MmapError, Result};
use crate::platform;

/// Granularity a mapping's file offset must be a multiple of, in bytes.
///
/// This is the page size on Unix and the allocation granularity (usually
/// 64 KiB) on Windows. The value is queried once and cached.
#[must_use]
pub fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(platform::allocation_granularity)
}

/// Align a value down to the nearest multiple of `alignment`.
#[must_use]
pub fn align_down(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return value;
    }
    if alignment.is_power_of_two() {
        value & !(alignment - 1)
    } else {
        (value / alignment) * alignment
    }
}

/// Align a value up to the nearest multiple of `alignment`.
#[must_use]
pub fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        return value;
    }
    // Fast path for power-of-2 alignments (common case for page sizes)
    if alignment.is_power_of_two() {
        let mask = alignment - 1;
        (value + mask) & !mask
    } else {
        value.div_ceil(alignment) * alignment
    }
}

/// Round `offset` down to the mapping granularity.
#[must_use]
pub fn make_offset_page_aligned(offset: u64) -> u64 {
    align_down(offset, page_size() as u64)
}

/// Ensure the requested [offset, offset+len) range is within [0, total).
/// Returns `Ok(())` if valid; otherwise an `OutOfBounds` error.
///
/// # Errors
///
/// Returns `MmapError::OutOfBounds` if the range exceeds bounds.
pub fn ensure_in_bounds(offset: u64, len: u64, total: u64) -> Result<()> {
    if offset > total {
        return Err(MmapError::OutOfBounds { offset, len, total });
    }
    let end = offset.saturating_add(len);
    if end > total {
        return Err(MmapError::OutOfBounds { offset, len, total });
    }
    Ok(())
}

/// Compute a safe byte slice range for a given total length, returning start..end as usize tuple.
///
/// # Errors
///
/// Returns `MmapError::OutOfBounds` if the requested range exceeds the total length.
#[allow(clippy::cast_possible_truncation)]
pub fn slice_range(offset: u64, len: u64, total: u64) -> Result<(usize, usize)> {
    ensure_in_bounds(offset, len, total)?;
    // total is the length of an in-memory window, so both ends fit in usize
    let start = offset as usize;
    let end = (offset + len) as usize;
    Ok((start, end))
}
