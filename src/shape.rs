//! Shape and stride arithmetic.
//!
//! Everything in this module is a pure function over shape/stride slices.
//! Out-of-range dimension indices are treated as "no match" rather than
//! errors so that bulk callers can pass heterogeneous index lists; the view
//! layer in [`crate::array`] is where range errors are raised.

use std::fmt;
use std::str::FromStr;

/// Memory layout convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Order {
    /// Last dimension varies fastest (C order).
    #[default]
    RowMajor,
    /// First dimension varies fastest (Fortran/Julia order).
    ColumnMajor,
}

impl Order {
    pub const fn as_str(self) -> &'static str {
        match self {
            Order::RowMajor => "row-major",
            Order::ColumnMajor => "column-major",
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Order {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "row-major" => Ok(Order::RowMajor),
            "column-major" => Ok(Order::ColumnMajor),
            _ => Err(()),
        }
    }
}

/// Compute strides for a freshly allocated array.
///
/// The fastest dimension always gets stride 1, even when its size is 0;
/// every other stride is the product of the sizes of the faster dimensions.
pub fn strides_from_shape(shape: &[usize], order: Order) -> Vec<isize> {
    let rank = shape.len();
    let mut strides = vec![1isize; rank];
    let mut s = 1isize;
    match order {
        Order::RowMajor => {
            for i in (0..rank).rev() {
                strides[i] = s;
                s = s.saturating_mul(shape[i] as isize);
            }
        }
        Order::ColumnMajor => {
            for i in 0..rank {
                strides[i] = s;
                s = s.saturating_mul(shape[i] as isize);
            }
        }
    }
    strides
}

/// Number of elements described by `shape` (1 for a zero-dimensional shape).
#[inline]
pub fn num_elements(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Minimum buffer offset so that every index of a view with `strides`
/// addresses a non-negative position.
pub fn offset_from_strides(shape: &[usize], strides: &[isize]) -> usize {
    shape
        .iter()
        .zip(strides)
        .filter(|(_, &s)| s < 0)
        .map(|(&d, &s)| d.saturating_sub(1) * s.unsigned_abs())
        .sum()
}

/// Shape with the listed dimensions removed.
///
/// Each entry of `dims` may be non-negative or counted from the end
/// (`-1` is the last dimension). Entries that match no dimension are
/// ignored, as are duplicates.
pub fn complement_shape(shape: &[usize], dims: &[isize]) -> Vec<usize> {
    let rank = shape.len() as isize;
    shape
        .iter()
        .enumerate()
        .filter(|&(i, _)| {
            let i = i as isize;
            !dims.contains(&i) && !dims.contains(&(i - rank))
        })
        .map(|(_, &d)| d)
        .collect()
}

/// Collapse dimensions `0..=depth` into one leading dimension.
///
/// `depth` is clamped to `ndims - 1`.
pub fn flatten_shape(shape: &[usize], depth: usize) -> Vec<usize> {
    if shape.is_empty() {
        return Vec::new();
    }
    let depth = depth.min(shape.len() - 1);
    let mut out = Vec::with_capacity(shape.len() - depth);
    out.push(shape[..=depth].iter().product());
    out.extend_from_slice(&shape[depth + 1..]);
    out
}

/// Resolve a possibly negative index against a dimension of length `len`.
///
/// Valid inputs lie in `[-len, len)`.
#[inline]
pub fn normalize_index(index: isize, len: usize) -> Option<usize> {
    let len = len as isize;
    let idx = if index < 0 { index + len } else { index };
    if (0..len).contains(&idx) {
        Some(idx as usize)
    } else {
        None
    }
}

/// Resolve every index in `indices`, returning a new vector.
///
/// Returns `None` as soon as one index is out of range.
pub fn normalize_indices(indices: &[isize], len: usize) -> Option<Vec<usize>> {
    indices.iter().map(|&i| normalize_index(i, len)).collect()
}

/// In-place variant of [`normalize_indices`].
///
/// On success every entry is rewritten to its non-negative form. On failure
/// the slice is left partially rewritten and `false` is returned.
pub fn normalize_indices_in_place(indices: &mut [isize], len: usize) -> bool {
    for idx in indices.iter_mut() {
        match normalize_index(*idx, len) {
            Some(i) => *idx = i as isize,
            None => return false,
        }
    }
    true
}

/// Smallest and largest buffer positions touched by a view.
///
/// A view with a zero-sized dimension touches nothing; `(offset, offset)` is
/// returned in that case.
pub fn min_max_view_buffer_index(shape: &[usize], strides: &[isize], offset: isize) -> (isize, isize) {
    let mut min = offset;
    let mut max = offset;
    if shape.contains(&0) {
        return (min, max);
    }
    for (&d, &s) in shape.iter().zip(strides) {
        let end = s.saturating_mul(d as isize - 1);
        if end >= 0 {
            max = max.saturating_add(end);
        } else {
            min = min.saturating_add(end);
        }
    }
    (min, max)
}

/// Buffer position of a multi-index, or `None` if a subscript is out of range.
pub fn sub2ind(shape: &[usize], strides: &[isize], offset: usize, subs: &[usize]) -> Option<usize> {
    if subs.len() != shape.len() {
        return None;
    }
    let mut idx = offset as isize;
    for ((&sub, &d), &s) in subs.iter().zip(shape).zip(strides) {
        if sub >= d {
            return None;
        }
        idx += sub as isize * s;
    }
    usize::try_from(idx).ok()
}

/// Multi-index of the `index`-th element when the logical elements of `shape`
/// are enumerated in `order`.
pub fn ind2sub(shape: &[usize], order: Order, index: usize) -> Option<Vec<usize>> {
    if index >= num_elements(shape) {
        return None;
    }
    let mut subs = vec![0usize; shape.len()];
    let mut rem = index;
    let mut place = |i: usize| {
        subs[i] = rem % shape[i];
        rem /= shape[i];
    };
    match order {
        Order::RowMajor => (0..shape.len()).rev().for_each(&mut place),
        Order::ColumnMajor => (0..shape.len()).for_each(&mut place),
    }
    Some(subs)
}

/// Whether `strides` describe a dense row-major layout of `shape`.
///
/// Size-1 dimensions are ignored.
pub fn is_row_major_contiguous(shape: &[usize], strides: &[isize]) -> bool {
    dense_in(shape.iter().rev().zip(strides.iter().rev()))
}

/// Whether `strides` describe a dense column-major layout of `shape`.
pub fn is_column_major_contiguous(shape: &[usize], strides: &[isize]) -> bool {
    dense_in(shape.iter().zip(strides.iter()))
}

/// Dense in either row-major or column-major order.
pub fn is_contiguous(shape: &[usize], strides: &[isize]) -> bool {
    shape.len() == strides.len()
        && (is_row_major_contiguous(shape, strides) || is_column_major_contiguous(shape, strides))
}

fn dense_in<'a>(dims: impl Iterator<Item = (&'a usize, &'a isize)>) -> bool {
    let mut expected = 1isize;
    for (&dim, &stride) in dims {
        if dim <= 1 {
            continue;
        }
        if stride != expected {
            return false;
        }
        expected = expected.saturating_mul(dim as isize);
    }
    true
}

/// Number of dimensions of size 1.
pub fn singleton_dimensions(shape: &[usize]) -> usize {
    shape.iter().filter(|&&d| d == 1).count()
}

/// Number of dimensions whose size is not 1.
pub fn nonsingleton_dimensions(shape: &[usize]) -> usize {
    shape.len() - singleton_dimensions(shape)
}
