//! Tile sizing for cache-blocked traversal.
//!
//! The tile edge is chosen from the dtypes alone: the combined
//! bytes-per-element of every participating array, times the tile volume,
//! must fit in [`BLOCK_MEMORY_SIZE`]. Whether a traversal is blocked at all
//! is decided from its memory footprint.

use log::trace;

use crate::dtype::DType;
use crate::{Blocking, BLOCK_MEMORY_SIZE, CACHE_LINE_SIZE, DEFAULT_ELEMENT_BYTES};

/// Bytes per element, with a fallback for dtypes that have no fixed width.
#[inline]
pub(crate) fn element_bytes(dtype: DType) -> usize {
    dtype.bytes_per_element().unwrap_or(DEFAULT_ELEMENT_BYTES)
}

/// Tile edge length for a blocked traversal over arrays of `dtypes`.
///
/// Tiles are squares when at most two arrays participate and cubes
/// otherwise. The result is at least 1 and never grows when the combined
/// element width grows.
pub fn block_size(dtypes: &[DType]) -> usize {
    let bytes: usize = dtypes.iter().map(|&dt| element_bytes(dt)).sum::<usize>().max(1);
    let exponent = if dtypes.len() <= 2 { 2 } else { 3 };
    let budget = BLOCK_MEMORY_SIZE / bytes;

    let mut edge = 1usize;
    while (edge + 1).checked_pow(exponent).map_or(false, |v| v <= budget) {
        edge += 1;
    }
    edge
}

/// Estimated bytes touched by a traversal, rounded to cache lines.
///
/// Small strides share cache lines; strides of a cache line or more each
/// multiply the number of distinct line blocks.
pub(crate) fn total_memory_region(dims: &[usize], byte_strides: &[Vec<isize>]) -> usize {
    let mut region = 0usize;
    for strides in byte_strides {
        let mut contiguous = 0usize;
        let mut line_blocks = 1usize;
        for (&d, &s) in dims.iter().zip(strides) {
            let s = s.unsigned_abs();
            if s < CACHE_LINE_SIZE {
                contiguous = contiguous.saturating_add(d.saturating_sub(1) * s);
            } else {
                line_blocks = line_blocks.saturating_mul(d);
            }
        }
        let lines = contiguous / CACHE_LINE_SIZE + 1;
        region = region.saturating_add(CACHE_LINE_SIZE.saturating_mul(lines).saturating_mul(line_blocks));
    }
    region
}

/// Per-dimension tile lengths for a traversal, in loop order.
///
/// Rank 0 and rank 1 traversals are never tiled; their single run already
/// streams through memory.
pub(crate) fn block_plan(
    dims: &[usize],
    strides: &[Vec<isize>],
    dtypes: &[DType],
    blocking: Blocking,
) -> Vec<usize> {
    let untiled = dims.to_vec();
    if dims.len() < 2 {
        return untiled;
    }
    let tiled = match blocking {
        Blocking::Never => false,
        Blocking::Always => true,
        Blocking::Auto => {
            let byte_strides: Vec<Vec<isize>> = strides
                .iter()
                .zip(dtypes)
                .map(|(s, &dt)| s.iter().map(|&x| x * element_bytes(dt) as isize).collect())
                .collect();
            total_memory_region(dims, &byte_strides) > BLOCK_MEMORY_SIZE
        }
    };
    if !tiled {
        return untiled;
    }

    let edge = block_size(dtypes);
    trace!("tiling {:?} with edge {}", dims, edge);
    dims.iter().map(|&d| d.min(edge).max(1)).collect()
}
