//! Element-wise operations built on the traversal entry points.
//!
//! These functions validate their arguments (shape, broadcasting, casting
//! policy) up front and only then touch the destination, so a rejected call
//! leaves every buffer unchanged.

use std::ops::{Add, Mul};

use log::debug;

use crate::array::NdArray;
use crate::broadcast::maybe_broadcast_array;
use crate::buffer::{Buffer, BufferMut};
use crate::casting::{is_cast_allowed, is_scalar_safe_cast, CastInto, CastingPolicy, FromScalar, Scalar};
use crate::dtype::Element;
use crate::map::{binary_into, for_each_with_options, nullary_into, ternary_into, unary_into};
use crate::shape::Order;
use crate::{Result, StridedError, TraversalOptions};

/// Set every element of `array` to `value`.
///
/// The value must be storable in the array's dtype under `mostly-safe`
/// casting: `fill` on an `int32` array with `2.75` fails instead of
/// truncating.
pub fn fill<B>(array: &mut NdArray<B>, value: impl Into<Scalar>) -> Result<()>
where
    B: BufferMut,
    B::Elem: FromScalar,
{
    fill_with_policy(array, value, CastingPolicy::MostlySafe)
}

pub fn fill_with_policy<B>(array: &mut NdArray<B>, value: impl Into<Scalar>, policy: CastingPolicy) -> Result<()>
where
    B: BufferMut,
    B::Elem: FromScalar,
{
    let value = value.into();
    let dtype = array.dtype();
    let rejected = || StridedError::ScalarCast { value, dtype, policy };
    if !is_scalar_safe_cast(value, dtype, policy) {
        return Err(rejected());
    }
    let elem = B::Elem::from_scalar(value).ok_or_else(rejected)?;
    nullary_into(array, || elem.clone())
}

/// Set every element of `array` to successive results of `f`.
pub fn fill_by<B, F>(array: &mut NdArray<B>, f: F) -> Result<()>
where
    B: BufferMut,
    F: FnMut() -> B::Elem,
{
    nullary_into(array, f)
}

/// New dense array of `f(x[i])`, laid out in `x`'s order.
pub fn map<B, U, F>(x: &NdArray<B>, mut f: F) -> Result<NdArray<Vec<U>>>
where
    B: Buffer,
    U: Element,
    F: FnMut(B::Elem) -> U,
{
    let mut data = Vec::with_capacity(x.len());
    let src = match x.order() {
        Order::RowMajor => x.view(),
        Order::ColumnMajor => x.view().transpose(),
    };
    // Lexicographic visit of `src` is `x`'s own memory order.
    for_each_with_options(&src, |v| data.push(f(v)), &TraversalOptions::sequential())?;
    NdArray::from_vec(data, x.shape(), x.order())
}

/// Copy `src` into `dest`, broadcasting `src` to `dest`'s shape and
/// converting elements under `same-kind` casting.
pub fn assign<BO, BX>(dest: &mut NdArray<BO>, src: &NdArray<BX>) -> Result<()>
where
    BO: BufferMut,
    BX: Buffer,
    BX::Elem: CastInto<BO::Elem>,
{
    assign_with_policy(dest, src, CastingPolicy::SameKind)
}

pub fn assign_with_policy<BO, BX>(dest: &mut NdArray<BO>, src: &NdArray<BX>, policy: CastingPolicy) -> Result<()>
where
    BO: BufferMut,
    BX: Buffer,
    BX::Elem: CastInto<BO::Elem>,
{
    let (from, to) = (src.dtype(), dest.dtype());
    if !is_cast_allowed(from, to, policy) {
        return Err(StridedError::UnsafeCast { from, to, policy });
    }
    let src = maybe_broadcast_array(src, dest.shape())?;
    debug!("assign {} -> {} over {:?}", from, to, dest.shape());
    unary_into(dest, &src, |v| v.cast_into())
}

/// Copy `src` into `dest` element by element; shapes must match.
pub fn copy_into<BO, BX>(dest: &mut NdArray<BO>, src: &NdArray<BX>) -> Result<()>
where
    BO: BufferMut,
    BX: Buffer<Elem = BO::Elem>,
{
    unary_into(dest, src, |v| v)
}

/// `dest = alpha * src`.
pub fn copy_scale<BO, BX, T>(dest: &mut NdArray<BO>, src: &NdArray<BX>, alpha: T) -> Result<()>
where
    BO: BufferMut<Elem = T>,
    BX: Buffer<Elem = T>,
    T: Clone + Mul<Output = T>,
{
    unary_into(dest, src, |v| alpha.clone() * v)
}

/// `dest = a + b`, broadcasting both inputs to `dest`'s shape.
pub fn add<BO, BA, BB, T>(dest: &mut NdArray<BO>, a: &NdArray<BA>, b: &NdArray<BB>) -> Result<()>
where
    BO: BufferMut<Elem = T>,
    BA: Buffer<Elem = T>,
    BB: Buffer<Elem = T>,
    T: Clone + Add<Output = T>,
{
    let a = maybe_broadcast_array(a, dest.shape())?;
    let b = maybe_broadcast_array(b, dest.shape())?;
    binary_into(dest, &a, &b, |x, y| x + y)
}

/// `dest = a * b`, broadcasting both inputs to `dest`'s shape.
pub fn mul<BO, BA, BB, T>(dest: &mut NdArray<BO>, a: &NdArray<BA>, b: &NdArray<BB>) -> Result<()>
where
    BO: BufferMut<Elem = T>,
    BA: Buffer<Elem = T>,
    BB: Buffer<Elem = T>,
    T: Clone + Mul<Output = T>,
{
    let a = maybe_broadcast_array(a, dest.shape())?;
    let b = maybe_broadcast_array(b, dest.shape())?;
    binary_into(dest, &a, &b, |x, y| x * y)
}

/// `dest = alpha * a + b`.
pub fn axpy<BO, BA, BB, T>(dest: &mut NdArray<BO>, a: &NdArray<BA>, b: &NdArray<BB>, alpha: T) -> Result<()>
where
    BO: BufferMut<Elem = T>,
    BA: Buffer<Elem = T>,
    BB: Buffer<Elem = T>,
    T: Clone + Add<Output = T> + Mul<Output = T>,
{
    let a = maybe_broadcast_array(a, dest.shape())?;
    let b = maybe_broadcast_array(b, dest.shape())?;
    binary_into(dest, &a, &b, |x, y| alpha.clone() * x + y)
}

/// `dest = a * b + c`.
pub fn fma<BO, BA, BB, BC, T>(
    dest: &mut NdArray<BO>,
    a: &NdArray<BA>,
    b: &NdArray<BB>,
    c: &NdArray<BC>,
) -> Result<()>
where
    BO: BufferMut<Elem = T>,
    BA: Buffer<Elem = T>,
    BB: Buffer<Elem = T>,
    BC: Buffer<Elem = T>,
    T: Clone + Add<Output = T> + Mul<Output = T>,
{
    let a = maybe_broadcast_array(a, dest.shape())?;
    let b = maybe_broadcast_array(b, dest.shape())?;
    let c = maybe_broadcast_array(c, dest.shape())?;
    ternary_into(dest, &a, &b, &c, |x, y, z| x * y + z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ComplexBuffer;
    use crate::dtype::DType;
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    #[test]
    fn test_fill_int32_rejects_fraction() {
        let mut a = NdArray::from_vec(vec![1i32, 2, 3], &[3], Order::RowMajor).unwrap();
        let err = fill(&mut a, 2.75).unwrap_err();
        assert!(matches!(
            err,
            StridedError::ScalarCast {
                dtype: DType::Int32,
                policy: CastingPolicy::MostlySafe,
                ..
            }
        ));
        assert_eq!(a.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_fill_accepts_fitting_values() {
        let mut a = NdArray::filled(0i32, &[2, 2], Order::ColumnMajor);
        fill(&mut a, 7u8).unwrap();
        assert_eq!(a.to_vec(), vec![7; 4]);
        fill(&mut a, -3i64).unwrap();
        assert_eq!(a.to_vec(), vec![-3; 4]);

        let mut f = NdArray::filled(0.0f32, &[3], Order::RowMajor);
        fill(&mut f, 2.5f64).unwrap();
        assert_eq!(f.to_vec(), vec![2.5; 3]);
    }

    #[test]
    fn test_fill_exact_values_into_narrow_targets() {
        let mut a = NdArray::filled(0i8, &[3], Order::RowMajor);
        fill(&mut a, 5i8).unwrap();
        assert_eq!(a.to_vec(), vec![5; 3]);
        assert!(fill(&mut a, 200i32).is_err());
        assert_eq!(a.to_vec(), vec![5; 3]);

        let mut b = NdArray::filled(0i16, &[2, 2], Order::ColumnMajor);
        fill(&mut b, 300).unwrap();
        assert_eq!(b.to_vec(), vec![300; 4]);

        let mut f = NdArray::filled(0.0f32, &[2], Order::RowMajor);
        fill(&mut f, 100_000.0).unwrap();
        assert_eq!(f.to_vec(), vec![100_000.0; 2]);
    }

    #[test]
    fn test_fill_negative_into_unsigned() {
        let mut a = NdArray::filled(0u8, &[2], Order::RowMajor);
        assert!(fill(&mut a, -1i32).is_err());
        // Unsafe skips the table but the value still has to fit.
        assert!(fill_with_policy(&mut a, -1i32, CastingPolicy::Unsafe).is_err());
        fill_with_policy(&mut a, 200i64, CastingPolicy::Unsafe).unwrap();
        assert_eq!(a.to_vec(), vec![200, 200]);
    }

    #[test]
    fn test_fill_strided_view() {
        let mut a = NdArray::filled(0.0f64, &[4], Order::RowMajor);
        {
            let mut v = a.view_mut().slice_dimension(0, crate::Slice::new(None, None, 2)).unwrap();
            fill(&mut v, 1.0).unwrap();
        }
        assert_eq!(a.to_vec(), vec![1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_fill_complex_accessor() {
        let mut a = NdArray::new(
            DType::Complex128,
            ComplexBuffer::<f64>::zeros(3),
            &[3],
            &[1],
            0,
            Order::RowMajor,
        )
        .unwrap();
        fill(&mut a, Complex64::new(1.0, -1.0)).unwrap();
        assert_eq!(a.buffer().parts(), &[1.0, -1.0, 1.0, -1.0, 1.0, -1.0]);
    }

    #[test]
    fn test_fill_by_counter() {
        let mut a = NdArray::filled(0u32, &[5], Order::RowMajor);
        let mut k = 0u32;
        fill_by(&mut a, || {
            k += 2;
            k
        })
        .unwrap();
        let mut seen = a.to_vec();
        seen.sort_unstable();
        assert_eq!(seen, vec![2, 4, 6, 8, 10]);
    }

    #[test]
    fn test_map_keeps_order() {
        let x = NdArray::from_vec(vec![1, 2, 3, 4, 5, 6], &[2, 3], Order::ColumnMajor).unwrap();
        let y = map(&x, |v| v as f64 * 0.5).unwrap();
        assert_eq!(y.dtype(), DType::Float64);
        assert_eq!(y.order(), Order::ColumnMajor);
        assert_eq!(y.strides(), x.strides());
        assert_eq!(y.into_buffer(), vec![0.5, 1.0, 1.5, 2.0, 2.5, 3.0]);
    }

    #[test]
    fn test_map_reversed_view() {
        let x = NdArray::from_vec(vec![1u8, 2, 3], &[3], Order::RowMajor).unwrap();
        let y = map(&x.view().reverse().unwrap(), |v| v == 2 || v == 3).unwrap();
        assert_eq!(y.to_vec(), vec![true, true, false]);
    }

    #[test]
    fn test_assign_broadcast_and_cast() {
        let row = NdArray::from_vec(vec![1i16, 2, 3], &[3], Order::RowMajor).unwrap();
        let mut dest = NdArray::filled(0i64, &[2, 3], Order::RowMajor);
        assign(&mut dest, &row).unwrap();
        assert_eq!(dest.to_vec(), vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_assign_rejects_policy() {
        let src = NdArray::from_vec(vec![1.5f64, 2.5], &[2], Order::RowMajor).unwrap();
        let mut dest = NdArray::filled(0i32, &[2], Order::RowMajor);
        assert!(matches!(
            assign(&mut dest, &src),
            Err(StridedError::UnsafeCast {
                from: DType::Float64,
                to: DType::Int32,
                ..
            })
        ));
        assert_eq!(dest.to_vec(), vec![0, 0]);

        assign_with_policy(&mut dest, &src, CastingPolicy::Unsafe).unwrap();
        assert_eq!(dest.to_vec(), vec![1, 2]);
    }

    #[test]
    fn test_assign_incompatible_shape() {
        let src = NdArray::filled(1.0f64, &[4], Order::RowMajor);
        let mut dest = NdArray::filled(0.0f64, &[2, 3], Order::RowMajor);
        assert!(matches!(assign(&mut dest, &src), Err(StridedError::Broadcast(_))));
    }

    #[test]
    fn test_binary_ops_broadcast() {
        let col = NdArray::from_vec(vec![10.0, 20.0], &[2, 1], Order::RowMajor).unwrap();
        let row = NdArray::from_vec(vec![1.0, 2.0, 3.0], &[3], Order::RowMajor).unwrap();
        let mut out = NdArray::filled(0.0, &[2, 3], Order::RowMajor);

        add(&mut out, &col, &row).unwrap();
        assert_eq!(out.to_vec(), vec![11.0, 12.0, 13.0, 21.0, 22.0, 23.0]);

        mul(&mut out, &col, &row).unwrap();
        assert_eq!(out.to_vec(), vec![10.0, 20.0, 30.0, 20.0, 40.0, 60.0]);

        axpy(&mut out, &row, &col, 2.0).unwrap();
        assert_eq!(out.to_vec(), vec![12.0, 14.0, 16.0, 22.0, 24.0, 26.0]);

        let c = NdArray::scalar(0.5);
        fma(&mut out, &col, &row, &c).unwrap();
        assert_relative_eq!(out.get(&[1, 2]).unwrap(), 60.5);
    }

    #[test]
    fn test_copy_into_and_scale() {
        let src = NdArray::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2], Order::RowMajor).unwrap();
        let mut dest = NdArray::filled(0.0f32, &[2, 2], Order::ColumnMajor);
        copy_into(&mut dest, &src).unwrap();
        assert_eq!(dest.to_vec(), src.to_vec());
        copy_scale(&mut dest, &src.view().transpose(), 3.0).unwrap();
        assert_eq!(dest.to_vec(), vec![3.0, 9.0, 6.0, 12.0]);
    }
}
