//! Traversal engine.
//!
//! A [`KernelPlan`] fixes the loop order, fused dimensions, and tile sizes
//! for one lock-step traversal. [`for_each_run`] then walks the plan with a
//! rank-specialized loop nest and hands each innermost run to a callback as
//! `(offsets, len, inner_strides)`: the buffer position of the run's first
//! element in every array, the run length, and the per-array step along it.
//! Every logical index is covered by exactly one run element.

use log::debug;

use crate::block::block_plan;
use crate::dtype::DType;
use crate::fuse::{compress_dims, fuse_dims};
use crate::order::{loop_interchange_order, LoopPlan};
use crate::shape::{is_column_major_contiguous, is_row_major_contiguous};
use crate::{Result, StridedError, TraversalOptions};

/// Loop nest selected for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KernelRank {
    D0,
    D1,
    D2,
    D3,
    D4,
    Nd,
}

impl KernelRank {
    fn of(rank: usize) -> Self {
        match rank {
            0 => KernelRank::D0,
            1 => KernelRank::D1,
            2 => KernelRank::D2,
            3 => KernelRank::D3,
            4 => KernelRank::D4,
            _ => KernelRank::Nd,
        }
    }
}

/// Element access mechanism used for one traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    /// Every buffer exposes a slice.
    Slice,
    /// At least one buffer needs `get`/`set`.
    Accessor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KernelPlan {
    /// Loop extents, index 0 innermost.
    pub(crate) dims: Vec<usize>,
    /// One stride array per participating array, in loop order.
    pub(crate) strides: Vec<Vec<isize>>,
    /// Tile length per loop level.
    pub(crate) block: Vec<usize>,
    pub(crate) rank: KernelRank,
}

impl KernelPlan {
    /// Single unit-stride run over `len` elements.
    fn linear(len: usize, arrays: usize) -> Self {
        Self {
            dims: vec![len],
            strides: vec![vec![1]; arrays],
            block: vec![len],
            rank: KernelRank::D1,
        }
    }
}

/// Whether every array has the same dense layout, so buffer order can be
/// walked directly.
fn dense_lockstep(shape: &[usize], strides_list: &[&[isize]], any_order: bool) -> bool {
    let Some(first) = strides_list.first() else {
        return false;
    };
    strides_list.iter().all(|s| s == first)
        && (is_row_major_contiguous(shape, first)
            || (any_order && is_column_major_contiguous(shape, first)))
}

/// Plan a traversal of arrays sharing `shape`.
///
/// The pipeline is: loop interchange (or row-major order when disabled),
/// fusion of contiguous dimensions, removal of size-1 dimensions, tiling.
pub(crate) fn build_plan(
    shape: &[usize],
    strides_list: &[&[isize]],
    dtypes: &[DType],
    options: &TraversalOptions,
) -> KernelPlan {
    if dense_lockstep(shape, strides_list, options.loop_interchange) {
        return KernelPlan::linear(total_len(shape), strides_list.len());
    }

    let loop_plan = if options.loop_interchange {
        loop_interchange_order(shape, strides_list)
    } else {
        LoopPlan::from_permutation((0..shape.len()).rev().collect(), shape, strides_list)
    };

    let ordered: Vec<&[isize]> = loop_plan.strides.iter().map(Vec::as_slice).collect();
    let fused = fuse_dims(&loop_plan.shape, &ordered);
    let (dims, strides) = compress_dims(&fused, &ordered);
    let block = block_plan(&dims, &strides, dtypes, options.blocking);

    debug!(
        "kernel plan: shape={:?} permutation={:?} dims={:?} block={:?}",
        shape, loop_plan.permutation, dims, block
    );
    KernelPlan {
        rank: KernelRank::of(dims.len()),
        dims,
        strides,
        block,
    }
}

/// Walk `plan`, starting each array at its base offset in `bases`.
///
/// The caller must have rejected zero-element shapes.
pub(crate) fn for_each_run<F>(plan: &KernelPlan, bases: &[isize], mut f: F)
where
    F: FnMut(&[isize], usize, &[isize]),
{
    let mut offsets = bases.to_vec();
    let strides = &plan.strides;
    let inner: Vec<isize> = strides.iter().map(|s| s.first().copied().unwrap_or(0)).collect();

    match plan.rank {
        KernelRank::D0 => f(&offsets, 1, &inner),
        KernelRank::D1 => kernel_1d(&plan.dims, &plan.block, strides, &inner, &mut offsets, &mut f),
        KernelRank::D2 => kernel_2d(&plan.dims, &plan.block, strides, &inner, &mut offsets, &mut f),
        KernelRank::D3 => kernel_3d(&plan.dims, &plan.block, strides, &inner, &mut offsets, &mut f),
        KernelRank::D4 => kernel_4d(&plan.dims, &plan.block, strides, &inner, &mut offsets, &mut f),
        KernelRank::Nd => kernel_nd(&plan.dims, &plan.block, strides, &inner, &mut offsets, &mut f),
    }
}

// ============================================================================
// Loop nests
// ============================================================================

/// Move every array `n` steps along loop level `dim`.
#[inline(always)]
fn step(offsets: &mut [isize], strides: &[Vec<isize>], dim: usize, n: isize) {
    for (offset, s) in offsets.iter_mut().zip(strides) {
        *offset += n * s[dim];
    }
}

/// Lengths of consecutive tiles covering `0..d`.
#[inline(always)]
fn tiles(d: usize, b: usize) -> impl Iterator<Item = usize> {
    let b = b.max(1);
    (0..d).step_by(b).map(move |j| b.min(d - j))
}

#[inline]
fn kernel_1d<F>(
    dims: &[usize],
    blocks: &[usize],
    strides: &[Vec<isize>],
    inner: &[isize],
    offsets: &mut [isize],
    f: &mut F,
) where
    F: FnMut(&[isize], usize, &[isize]),
{
    let d0 = dims[0];
    for len0 in tiles(d0, blocks[0]) {
        f(offsets, len0, inner);
        step(offsets, strides, 0, len0 as isize);
    }
    step(offsets, strides, 0, -(d0 as isize));
}

/// Tile loops run outermost-first; within one tile, level 1 steps while
/// level 0 is handed to the callback as a run.
#[inline]
fn kernel_2d<F>(
    dims: &[usize],
    blocks: &[usize],
    strides: &[Vec<isize>],
    inner: &[isize],
    offsets: &mut [isize],
    f: &mut F,
) where
    F: FnMut(&[isize], usize, &[isize]),
{
    let (d0, d1) = (dims[0], dims[1]);
    for len1 in tiles(d1, blocks[1]) {
        for len0 in tiles(d0, blocks[0]) {
            for _ in 0..len1 {
                f(offsets, len0, inner);
                step(offsets, strides, 1, 1);
            }
            step(offsets, strides, 1, -(len1 as isize));
            step(offsets, strides, 0, len0 as isize);
        }
        step(offsets, strides, 0, -(d0 as isize));
        step(offsets, strides, 1, len1 as isize);
    }
    step(offsets, strides, 1, -(d1 as isize));
}

#[inline]
fn kernel_3d<F>(
    dims: &[usize],
    blocks: &[usize],
    strides: &[Vec<isize>],
    inner: &[isize],
    offsets: &mut [isize],
    f: &mut F,
) where
    F: FnMut(&[isize], usize, &[isize]),
{
    let (d0, d1, d2) = (dims[0], dims[1], dims[2]);
    for len2 in tiles(d2, blocks[2]) {
        for len1 in tiles(d1, blocks[1]) {
            for len0 in tiles(d0, blocks[0]) {
                for _ in 0..len2 {
                    for _ in 0..len1 {
                        f(offsets, len0, inner);
                        step(offsets, strides, 1, 1);
                    }
                    step(offsets, strides, 1, -(len1 as isize));
                    step(offsets, strides, 2, 1);
                }
                step(offsets, strides, 2, -(len2 as isize));
                step(offsets, strides, 0, len0 as isize);
            }
            step(offsets, strides, 0, -(d0 as isize));
            step(offsets, strides, 1, len1 as isize);
        }
        step(offsets, strides, 1, -(d1 as isize));
        step(offsets, strides, 2, len2 as isize);
    }
    step(offsets, strides, 2, -(d2 as isize));
}

#[inline]
fn kernel_4d<F>(
    dims: &[usize],
    blocks: &[usize],
    strides: &[Vec<isize>],
    inner: &[isize],
    offsets: &mut [isize],
    f: &mut F,
) where
    F: FnMut(&[isize], usize, &[isize]),
{
    let (d0, d1, d2, d3) = (dims[0], dims[1], dims[2], dims[3]);
    for len3 in tiles(d3, blocks[3]) {
        for len2 in tiles(d2, blocks[2]) {
            for len1 in tiles(d1, blocks[1]) {
                for len0 in tiles(d0, blocks[0]) {
                    for _ in 0..len3 {
                        for _ in 0..len2 {
                            for _ in 0..len1 {
                                f(offsets, len0, inner);
                                step(offsets, strides, 1, 1);
                            }
                            step(offsets, strides, 1, -(len1 as isize));
                            step(offsets, strides, 2, 1);
                        }
                        step(offsets, strides, 2, -(len2 as isize));
                        step(offsets, strides, 3, 1);
                    }
                    step(offsets, strides, 3, -(len3 as isize));
                    step(offsets, strides, 0, len0 as isize);
                }
                step(offsets, strides, 0, -(d0 as isize));
                step(offsets, strides, 1, len1 as isize);
            }
            step(offsets, strides, 1, -(d1 as isize));
            step(offsets, strides, 2, len2 as isize);
        }
        step(offsets, strides, 2, -(d2 as isize));
        step(offsets, strides, 3, len3 as isize);
    }
    step(offsets, strides, 3, -(d3 as isize));
}

/// Generic fallback: recurse over tile origins, then over the elements of
/// each tile.
fn kernel_nd<F>(
    dims: &[usize],
    blocks: &[usize],
    strides: &[Vec<isize>],
    inner: &[isize],
    offsets: &mut [isize],
    f: &mut F,
) where
    F: FnMut(&[isize], usize, &[isize]),
{
    let mut extents = vec![0usize; dims.len()];
    tile_level(dims.len() - 1, dims, blocks, strides, inner, &mut extents, offsets, f);
}

#[allow(clippy::too_many_arguments)]
fn tile_level<F>(
    level: usize,
    dims: &[usize],
    blocks: &[usize],
    strides: &[Vec<isize>],
    inner: &[isize],
    extents: &mut [usize],
    offsets: &mut [isize],
    f: &mut F,
) where
    F: FnMut(&[isize], usize, &[isize]),
{
    let d = dims[level];
    for len in tiles(d, blocks[level]) {
        extents[level] = len;
        if level == 0 {
            element_level(dims.len() - 1, extents, strides, inner, offsets, f);
        } else {
            tile_level(level - 1, dims, blocks, strides, inner, extents, offsets, f);
        }
        step(offsets, strides, level, len as isize);
    }
    step(offsets, strides, level, -(d as isize));
}

fn element_level<F>(
    level: usize,
    extents: &[usize],
    strides: &[Vec<isize>],
    inner: &[isize],
    offsets: &mut [isize],
    f: &mut F,
) where
    F: FnMut(&[isize], usize, &[isize]),
{
    if level == 0 {
        f(offsets, extents[0], inner);
        return;
    }
    let n = extents[level];
    for _ in 0..n {
        element_level(level - 1, extents, strides, inner, offsets, f);
        step(offsets, strides, level, 1);
    }
    step(offsets, strides, level, -(n as isize));
}

// ============================================================================
// Utility functions
// ============================================================================

pub(crate) fn ensure_same_shape(a: &[usize], b: &[usize]) -> Result<()> {
    if a.len() != b.len() {
        return Err(StridedError::RankMismatch(a.len(), b.len()));
    }
    if a != b {
        return Err(StridedError::ShapeMismatch(a.to_vec(), b.to_vec()));
    }
    Ok(())
}

#[inline]
pub(crate) fn total_len(dims: &[usize]) -> usize {
    dims.iter().product()
}
