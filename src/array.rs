//! Array descriptor.
//!
//! [`NdArray`] is the `{dtype, buffer, shape, strides, offset, order}` tuple
//! every traversal consumes. Addressing is validated once, when a descriptor
//! is built from caller-supplied parts; the layout transforms in this module
//! (reversal, permutation, slicing) preserve validity and only rewrite
//! shape, strides and offset. The buffer is never copied.

use std::sync::Arc;

use crate::buffer::{Buffer, BufferMut};
use crate::dtype::{DType, Element};
use crate::shape::{
    ind2sub, min_max_view_buffer_index, normalize_index, num_elements, strides_from_shape, sub2ind,
    Order,
};
use crate::{Result, StridedError};

/// Check that every index of a view addresses a position inside a buffer
/// of `len` elements.
fn validate_bounds(len: usize, dims: &[usize], strides: &[isize], offset: usize) -> Result<()> {
    if dims.len() != strides.len() {
        return Err(StridedError::StrideLengthMismatch);
    }
    if dims.contains(&0) {
        return Ok(());
    }
    let base = isize::try_from(offset).map_err(|_| StridedError::OffsetOverflow)?;
    for (&d, &s) in dims.iter().zip(strides) {
        if d > 1 {
            s.checked_mul(d as isize - 1).ok_or(StridedError::OffsetOverflow)?;
        }
    }
    let (min, max) = min_max_view_buffer_index(dims, strides, base);
    if min < 0 || max < 0 || max as usize >= len {
        return Err(StridedError::OutOfBounds { min, max, len });
    }
    Ok(())
}

/// Resolve a possibly negative axis against `rank`.
fn resolve_axis(axis: isize, rank: usize) -> Result<usize> {
    normalize_index(axis, rank).ok_or(StridedError::InvalidAxis { axis, rank })
}

/// Half-open range with a step, as in `start:stop:step`.
///
/// Bounds may be negative (counted from the end) and are clamped to the
/// dimension; omitted bounds cover the whole dimension in the step's
/// direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: isize,
}

impl Slice {
    pub fn new(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        Self { start, stop, step }
    }

    /// Every element, in order.
    pub fn full() -> Self {
        Self::new(None, None, 1)
    }

    /// `start..stop` with unit step.
    pub fn range(start: isize, stop: isize) -> Self {
        Self::new(Some(start), Some(stop), 1)
    }

    /// Resolve against a dimension of length `len` into `(first, count)`.
    fn resolve(&self, len: usize) -> Result<(usize, usize)> {
        if self.step == 0 {
            return Err(StridedError::ZeroSliceStep);
        }
        let n = len as isize;
        let clamp = |v: isize, lo: isize, hi: isize| {
            let v = if v < 0 { v + n } else { v };
            v.clamp(lo, hi)
        };
        let (start, stop) = if self.step > 0 {
            (
                self.start.map_or(0, |v| clamp(v, 0, n)),
                self.stop.map_or(n, |v| clamp(v, 0, n)),
            )
        } else {
            (
                self.start.map_or(n - 1, |v| clamp(v, -1, n - 1)),
                self.stop.map_or(-1, |v| clamp(v, -1, n - 1)),
            )
        };
        let span = if self.step > 0 { stop - start } else { start - stop };
        let count = if span <= 0 {
            0
        } else {
            (span + self.step.abs() - 1) / self.step.abs()
        };
        Ok((start.max(0) as usize, count as usize))
    }
}

/// Strided n-dimensional array over a [`Buffer`].
///
/// The element at multi-index `(i0, ..., ik)` lives at buffer position
/// `offset + sum(ij * strides[j])`. Strides may be negative (reversed
/// dimensions) or zero (broadcast dimensions). A zero-dimensional array
/// holds exactly one element at `offset`.
///
/// Writes through a view with zero strides reach every aliased position.
pub struct NdArray<B> {
    dtype: DType,
    buffer: B,
    shape: Arc<[usize]>,
    strides: Arc<[isize]>,
    offset: usize,
    order: Order,
}

impl<B: Clone> Clone for NdArray<B> {
    fn clone(&self) -> Self {
        Self {
            dtype: self.dtype,
            buffer: self.buffer.clone(),
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
            order: self.order,
        }
    }
}

impl<B> std::fmt::Debug for NdArray<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NdArray")
            .field("dtype", &self.dtype)
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .field("order", &self.order)
            .finish()
    }
}

impl<B: Buffer> NdArray<B> {
    /// Build a descriptor from caller-supplied parts.
    ///
    /// Fails if `strides` does not match `shape` in length or if any index
    /// would address a position outside `buffer`.
    pub fn new(
        dtype: DType,
        buffer: B,
        shape: &[usize],
        strides: &[isize],
        offset: usize,
        order: Order,
    ) -> Result<Self> {
        validate_bounds(buffer.len(), shape, strides, offset)?;
        Ok(Self::from_parts_unchecked(dtype, buffer, shape, strides, offset, order))
    }

    /// Read the element at a multi-index.
    pub fn get(&self, index: &[usize]) -> Result<B::Elem> {
        let pos = self.position(index)?;
        Ok(self.buffer.get(pos))
    }

    /// Elements in row-major logical order.
    pub fn to_vec(&self) -> Vec<B::Elem> {
        let n = self.len();
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            if let Some(pos) = ind2sub(&self.shape, Order::RowMajor, i)
                .and_then(|subs| sub2ind(&self.shape, &self.strides, self.offset, &subs))
            {
                out.push(self.buffer.get(pos));
            }
        }
        out
    }
}

impl<B: BufferMut> NdArray<B> {
    /// Write the element at a multi-index.
    pub fn set(&mut self, index: &[usize], value: B::Elem) -> Result<()> {
        let pos = self.position(index)?;
        self.buffer.set(pos, value);
        Ok(())
    }
}

impl<T: Element> NdArray<Vec<T>> {
    /// Take ownership of `data` laid out densely in `order`.
    pub fn from_vec(data: Vec<T>, shape: &[usize], order: Order) -> Result<Self> {
        if data.len() != num_elements(shape) {
            return Err(StridedError::ShapeMismatch(vec![data.len()], shape.to_vec()));
        }
        let strides = strides_from_shape(shape, order);
        Ok(Self::from_parts_unchecked(T::DTYPE, data, shape, &strides, 0, order))
    }

    /// Dense array with every element set to `value`.
    pub fn filled(value: T, shape: &[usize], order: Order) -> Self {
        let strides = strides_from_shape(shape, order);
        let data = vec![value; num_elements(shape)];
        Self::from_parts_unchecked(T::DTYPE, data, shape, &strides, 0, order)
    }

    /// Zero-dimensional array holding `value`.
    pub fn scalar(value: T) -> Self {
        Self::from_parts_unchecked(T::DTYPE, vec![value], &[], &[], 0, Order::RowMajor)
    }
}

impl<B> NdArray<B> {
    pub(crate) fn from_parts_unchecked(
        dtype: DType,
        buffer: B,
        shape: &[usize],
        strides: &[isize],
        offset: usize,
        order: Order,
    ) -> Self {
        Self {
            dtype,
            buffer,
            shape: Arc::from(shape),
            strides: Arc::from(strides),
            offset,
            order,
        }
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[inline]
    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    #[inline]
    pub fn buffer_mut(&mut self) -> &mut B {
        &mut self.buffer
    }

    pub fn into_buffer(self) -> B {
        self.buffer
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn order(&self) -> Order {
        self.order
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of logical elements.
    #[inline]
    pub fn len(&self) -> usize {
        num_elements(&self.shape)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrowing view with the same layout.
    pub fn view(&self) -> NdArray<&B> {
        NdArray {
            dtype: self.dtype,
            buffer: &self.buffer,
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
            order: self.order,
        }
    }

    /// Mutably borrowing view with the same layout.
    pub fn view_mut(&mut self) -> NdArray<&mut B> {
        NdArray {
            dtype: self.dtype,
            buffer: &mut self.buffer,
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
            order: self.order,
        }
    }

    /// Same buffer and dtype, new layout.
    pub(crate) fn with_layout(self, shape: &[usize], strides: &[isize], offset: usize) -> Self {
        Self {
            shape: Arc::from(shape),
            strides: Arc::from(strides),
            offset,
            ..self
        }
    }

    /// Flip the traversal direction of one dimension.
    ///
    /// `dim` may count from the end.
    pub fn reverse_dimension(self, dim: isize) -> Result<Self> {
        let d = resolve_axis(dim, self.ndim())?;
        let mut strides = self.strides.to_vec();
        let mut offset = self.offset;
        if self.shape[d] > 0 {
            offset = shift(offset, strides[d], self.shape[d] - 1)?;
        }
        strides[d] = -strides[d];
        let shape = self.shape.clone();
        Ok(self.with_layout(&shape, &strides, offset))
    }

    /// Flip every dimension.
    pub fn reverse(self) -> Result<Self> {
        (0..self.ndim() as isize).try_fold(self, |a, d| a.reverse_dimension(d))
    }

    /// Reorder dimensions: dimension `k` of the result is `perm[k]` of `self`.
    pub fn permute(self, perm: &[usize]) -> Result<Self> {
        let rank = self.ndim();
        if perm.len() != rank {
            return Err(StridedError::RankMismatch(perm.len(), rank));
        }
        let mut seen = vec![false; rank];
        for &p in perm {
            if p >= rank || std::mem::replace(&mut seen[p], true) {
                return Err(StridedError::InvalidPermutation(perm.to_vec()));
            }
        }
        let shape: Vec<usize> = perm.iter().map(|&p| self.shape[p]).collect();
        let strides: Vec<isize> = perm.iter().map(|&p| self.strides[p]).collect();
        let offset = self.offset;
        Ok(self.with_layout(&shape, &strides, offset))
    }

    /// Reverse the order of all dimensions.
    pub fn transpose(self) -> Self {
        let mut shape = self.shape.to_vec();
        let mut strides = self.strides.to_vec();
        shape.reverse();
        strides.reverse();
        let offset = self.offset;
        self.with_layout(&shape, &strides, offset)
    }

    /// Restrict one dimension to a [`Slice`].
    ///
    /// A negative step reverses the dimension; an empty selection yields a
    /// zero-length dimension.
    pub fn slice_dimension(self, dim: isize, slice: Slice) -> Result<Self> {
        let d = resolve_axis(dim, self.ndim())?;
        let (first, count) = slice.resolve(self.shape[d])?;
        let mut shape = self.shape.to_vec();
        let mut strides = self.strides.to_vec();
        let offset = if count > 0 {
            shift(self.offset, strides[d], first)?
        } else {
            self.offset
        };
        shape[d] = count;
        strides[d] = strides[d]
            .checked_mul(slice.step)
            .ok_or(StridedError::OffsetOverflow)?;
        Ok(self.with_layout(&shape, &strides, offset))
    }

    /// Buffer position of a multi-index, bounds-checked against the shape.
    pub fn position(&self, index: &[usize]) -> Result<usize> {
        sub2ind(&self.shape, &self.strides, self.offset, index).ok_or_else(|| {
            StridedError::IndexOutOfBounds {
                index: index.to_vec(),
                shape: self.shape.to_vec(),
            }
        })
    }
}

/// `offset + stride * n`, which must stay non-negative.
fn shift(offset: usize, stride: isize, n: usize) -> Result<usize> {
    let delta = stride
        .checked_mul(n as isize)
        .ok_or(StridedError::OffsetOverflow)?;
    (offset as isize)
        .checked_add(delta)
        .and_then(|v| usize::try_from(v).ok())
        .ok_or(StridedError::OffsetOverflow)
}
