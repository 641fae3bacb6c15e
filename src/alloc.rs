//! Module for fallible allocation of dense buffers

use std::mem::size_of;

use crate::error::{AllocError, ArrayError};

/// Granularity dense buffers are allocated in.
pub const CHUNK_SIZE: usize = 32;

/// Rounds `size` up to the next multiple of [`CHUNK_SIZE`].
#[must_use]
pub const fn align_up(size: usize) -> usize {
    (size + CHUNK_SIZE - 1) & !(CHUNK_SIZE - 1)
}

/// The capacity a buffer grows to so that it can hold at least `size + 1`
/// elements. Growth is geometric so repeated appends are amortized O(1).
#[must_use]
pub const fn next_size(size: usize) -> usize {
    align_up(size + 1) * 2
}

/// Converts a logical element count to a buffer length, failing if the count
/// can never be addressed by a buffer of `T`.
pub(crate) fn checked_len<T>(requested: u64) -> Result<usize, ArrayError> {
    let overflow = ArrayError::CapacityOverflow { requested };
    let len = usize::try_from(requested).map_err(|_| overflow.clone())?;
    let bytes = len.checked_mul(size_of::<T>().max(1)).ok_or(overflow.clone())?;
    if bytes > isize::MAX as usize {
        return Err(overflow);
    }
    Ok(len)
}

/// Grows `buffer` to exactly `new_len` elements, filling new slots with
/// `filler`. Overflowing sizes and allocator failures are reported separately.
pub(crate) fn try_grow<T: Clone>(
    buffer: &mut Vec<T>,
    new_len: usize,
    filler: T,
) -> Result<(), ArrayError> {
    if new_len <= buffer.len() {
        return Ok(());
    }
    checked_len::<T>(new_len as u64)?;
    buffer
        .try_reserve_exact(new_len - buffer.len())
        .map_err(|_| ArrayError::Alloc(AllocError))?;
    buffer.resize(new_len, filler);
    Ok(())
}

/// Grows `buffer` geometrically so that `index` becomes addressable.
pub(crate) fn grow_for_index<T: Clone>(
    buffer: &mut Vec<T>,
    index: usize,
    filler: T,
) -> Result<(), ArrayError> {
    if index < buffer.len() {
        return Ok(());
    }
    // next_size doubles, keep headroom for it
    if index >= usize::MAX >> 2 {
        return Err(ArrayError::CapacityOverflow {
            requested: index as u64,
        });
    }
    try_grow(buffer, next_size(index), filler)
}
