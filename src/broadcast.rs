//! Broadcasting.
//!
//! Shapes are right-aligned, missing leading dimensions count as size 1,
//! and size-1 dimensions stretch to match. Stretched and added dimensions
//! get stride 0, so a broadcast view reads one buffer position many times.

use crate::array::NdArray;
use crate::dtype::Element;
use crate::shape::Order;
use crate::{Result, StridedError};

/// Common shape of `shapes`, or `None` if two sizes other than 1 disagree
/// at some position.
///
/// A size-1 entry defers to the other sizes, including 0. A 0 only matches
/// 0 or 1: `[0]` with `[3]` is `None`, as in NumPy.
pub fn broadcast_shapes(shapes: &[&[usize]]) -> Option<Vec<usize>> {
    let rank = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut out = vec![1usize; rank];
    for shape in shapes {
        let pad = rank - shape.len();
        for (i, &n) in shape.iter().enumerate() {
            let target = &mut out[pad + i];
            if n == 1 || n == *target {
                continue;
            }
            if *target != 1 {
                return None;
            }
            *target = n;
        }
    }
    Some(out)
}

/// Strides that read an array of `src_shape`/`src_strides` as `target`.
///
/// Fails if `src_shape` has more dimensions than `target` or a size other
/// than 1 differs from the target.
pub fn broadcast_strides(target: &[usize], src_shape: &[usize], src_strides: &[isize]) -> Result<Vec<isize>> {
    if src_shape.len() > target.len() {
        return Err(StridedError::RankMismatch(src_shape.len(), target.len()));
    }
    if src_strides.len() != src_shape.len() {
        return Err(StridedError::StrideLengthMismatch);
    }
    let pad = target.len() - src_shape.len();
    let mut out = vec![0isize; target.len()];
    for (i, (&n, &s)) in src_shape.iter().zip(src_strides).enumerate() {
        let t = target[pad + i];
        if n == t {
            out[pad + i] = s;
        } else if n != 1 {
            return Err(StridedError::Broadcast(vec![src_shape.to_vec(), target.to_vec()]));
        }
    }
    Ok(out)
}

/// Read-only view of `array` stretched to `shape`.
///
/// The view borrows the buffer. Every position of the result that came from
/// a stretched or added dimension aliases the same element.
pub fn broadcast_array<'a, B>(array: &'a NdArray<B>, shape: &[usize]) -> Result<NdArray<&'a B>> {
    let strides = broadcast_strides(shape, array.shape(), array.strides())?;
    let offset = array.offset();
    Ok(array.view().with_layout(shape, &strides, offset))
}

/// [`broadcast_array`] that skips the work when the shape already matches.
pub fn maybe_broadcast_array<'a, B>(array: &'a NdArray<B>, shape: &[usize]) -> Result<NdArray<&'a B>> {
    if array.shape() == shape {
        return Ok(array.view());
    }
    broadcast_array(array, shape)
}

/// Broadcast several arrays to their common shape.
pub fn broadcast_arrays<'a, B>(arrays: &[&'a NdArray<B>]) -> Result<Vec<NdArray<&'a B>>> {
    let shapes: Vec<&[usize]> = arrays.iter().map(|a| a.shape()).collect();
    let shape = broadcast_shapes(&shapes)
        .ok_or_else(|| StridedError::Broadcast(shapes.iter().map(|s| s.to_vec()).collect()))?;
    arrays.iter().map(|&a| maybe_broadcast_array(a, &shape)).collect()
}

/// Array of `shape` whose every element reads `value`.
///
/// Backed by a single-element buffer with all strides 0.
pub fn broadcast_scalar<T: Element>(value: T, shape: &[usize], order: Order) -> NdArray<Vec<T>> {
    let strides = vec![0isize; shape.len()];
    NdArray::from_parts_unchecked(T::DTYPE, vec![value], shape, &strides, 0, order)
}
