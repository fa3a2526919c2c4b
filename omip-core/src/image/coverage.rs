//! Per-byte coverage bitmap for out-of-order chunks
//!
//! One bit per image byte, stored in the tail of the reassembly buffer so a
//! transfer still needs a single allocation however its chunks arrive.

/// Bitmap bytes needed to track `len` image bytes
pub fn bitmap_len(len: usize) -> usize {
    len.div_ceil(8)
}

/// Mark `[start, end)` as written
///
/// Returns how many of those bytes were not covered before, so overlapping
/// chunks are only counted once.
pub fn mark(bitmap: &mut [u8], start: usize, end: usize) -> usize {
    let mut fresh = 0;
    let mut i = start;
    while i < end {
        // Whole bitmap byte at once when aligned
        if i % 8 == 0 && i + 8 <= end {
            let byte = &mut bitmap[i / 8];
            fresh += byte.count_zeros() as usize;
            *byte = 0xFF;
            i += 8;
            continue;
        }
        let bit = 1u8 << (i % 8);
        let byte = &mut bitmap[i / 8];
        if *byte & bit == 0 {
            *byte |= bit;
            fresh += 1;
        }
        i += 1;
    }
    fresh
}
