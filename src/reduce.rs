//! Reductions.
//!
//! A reduction is a traversal whose output is a view with zero strides
//! along the reduced dimensions: every input element is folded into the
//! output position it broadcasts from.

use std::ops::{Add, Mul};

use log::debug;
use num_traits::Zero;

use crate::array::NdArray;
use crate::buffer::Buffer;
use crate::dtype::{DType, Element};
use crate::map::{for_each2, zip_in_place};
use crate::shape::{complement_shape, normalize_index, strides_from_shape};
use crate::{Result, StridedError};

/// Fold every element of `x` into `init` with `f`.
///
/// Visitation order is unspecified, so `f` should be associative and
/// commutative for deterministic results.
pub fn reduce<B, U, F>(x: &NdArray<B>, init: U, f: F) -> Result<U>
where
    B: Buffer,
    U: Clone,
    F: FnMut(U, B::Elem) -> U,
{
    let strides = vec![0isize; x.ndim()];
    let mut acc = NdArray::from_parts_unchecked(DType::Generic, vec![init], x.shape(), &strides, 0, x.order());
    zip_in_place(&mut acc, x, f)?;
    Ok(Buffer::get(acc.buffer(), 0))
}

/// Sum of all elements; zero for an empty array.
pub fn sum<B>(x: &NdArray<B>) -> Result<B::Elem>
where
    B: Buffer,
    B::Elem: Zero + Add<Output = B::Elem>,
{
    reduce(x, B::Elem::zero(), |acc, v| acc + v)
}

/// Sum of element-wise products of two arrays of the same shape.
pub fn dot<BA, BB, T>(a: &NdArray<BA>, b: &NdArray<BB>) -> Result<T>
where
    BA: Buffer<Elem = T>,
    BB: Buffer<Elem = T>,
    T: Zero + Clone + Mul<Output = T>,
{
    let mut total = T::zero();
    for_each2(a, b, |x, y| total = total.clone() + x * y)?;
    Ok(total)
}

/// Fold along one axis, producing an array without that axis.
///
/// The result is dense in `x`'s order, with every element starting at
/// `init`. `axis` may count from the end.
pub fn reduce_axis<B, U, F>(x: &NdArray<B>, axis: isize, init: U, f: F) -> Result<NdArray<Vec<U>>>
where
    B: Buffer,
    U: Element,
    F: FnMut(U, B::Elem) -> U,
{
    let rank = x.ndim();
    let ax = normalize_index(axis, rank).ok_or(StridedError::InvalidAxis { axis, rank })?;
    let out_shape = complement_shape(x.shape(), &[ax as isize]);
    debug!("reduce axis {} of {:?} into {:?}", ax, x.shape(), out_shape);

    let mut out = NdArray::filled(init, &out_shape, x.order());
    let mut strides = strides_from_shape(&out_shape, x.order());
    strides.insert(ax, 0);
    {
        let mut acc = out.view_mut().with_layout(x.shape(), &strides, 0);
        zip_in_place(&mut acc, x, f)?;
    }
    Ok(out)
}
