//! Casting-safety rules.
//!
//! Each policy accepts a superset of the casts accepted by the stricter
//! policies before it:
//! `none` ⊂ `equiv` ⊂ `safe` ⊂ `mostly-safe` ⊂ `same-kind` ⊂ `unsafe`.
//!
//! The decision functions are total and never fail; an unrecognized dtype
//! yields `false`. Raising a descriptive error is left to the caller.

use std::fmt;
use std::str::FromStr;

use num_complex::Complex;
use num_traits::NumCast;

use crate::dtype::{DType, DTypeKind, ResolveDType};
use crate::StridedError;

use DType::*;

/// Strictness level for dtype conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CastingPolicy {
    /// Only identical dtypes.
    None,
    /// Identical dtypes or byte-reinterpretable equivalents.
    Equiv,
    /// Casts that cannot lose precision or range.
    Safe,
    /// `Safe` plus floating-point downcasts (precision loss, no range loss).
    MostlySafe,
    /// `MostlySafe` plus any cast within the same kind.
    SameKind,
    /// Anything.
    Unsafe,
}

impl CastingPolicy {
    pub const ALL: [CastingPolicy; 6] = [
        CastingPolicy::None,
        CastingPolicy::Equiv,
        CastingPolicy::Safe,
        CastingPolicy::MostlySafe,
        CastingPolicy::SameKind,
        CastingPolicy::Unsafe,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            CastingPolicy::None => "none",
            CastingPolicy::Equiv => "equiv",
            CastingPolicy::Safe => "safe",
            CastingPolicy::MostlySafe => "mostly-safe",
            CastingPolicy::SameKind => "same-kind",
            CastingPolicy::Unsafe => "unsafe",
        }
    }
}

impl fmt::Display for CastingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CastingPolicy {
    type Err = StridedError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        CastingPolicy::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| StridedError::UnknownCastingPolicy(s.to_string()))
    }
}

// ============================================================================
// DType-level rules
// ============================================================================

/// Identical dtypes, or dtypes sharing one byte representation.
pub fn is_equivalent_cast(from: DType, to: DType) -> bool {
    from == to || matches!((from, to), (Uint8, Uint8c) | (Uint8c, Uint8))
}

/// Casts that preserve every value of `from`.
pub fn is_safe_cast(from: DType, to: DType) -> bool {
    if from == to || to == Generic {
        return true;
    }
    match from {
        Int8 => matches!(
            to,
            Int16 | Int32 | Int64 | Float32 | Float64 | Complex64 | Complex128
        ),
        Int16 => matches!(to, Int32 | Int64 | Float32 | Float64 | Complex64 | Complex128),
        Int32 => matches!(to, Int64 | Float64 | Complex128),
        Int64 => matches!(to, Float64 | Complex128),
        Uint8 | Uint8c => matches!(
            to,
            Int16
                | Int32
                | Int64
                | Uint8
                | Uint8c
                | Uint16
                | Uint32
                | Uint64
                | Float32
                | Float64
                | Complex64
                | Complex128
        ),
        Uint16 => matches!(
            to,
            Int32 | Int64 | Uint32 | Uint64 | Float32 | Float64 | Complex64 | Complex128
        ),
        Uint32 => matches!(to, Int64 | Uint64 | Float64 | Complex128),
        Uint64 => matches!(to, Float64 | Complex128),
        Float32 => matches!(to, Float64 | Complex64 | Complex128),
        Float64 => matches!(to, Complex128),
        Complex64 => matches!(to, Complex128),
        Complex128 | Bool | Binary | Generic => false,
    }
}

/// `safe` casts plus floating-point downcasts.
pub fn is_mostly_safe_cast(from: DType, to: DType) -> bool {
    is_safe_cast(from, to)
        || matches!(
            (from, to),
            (Float64, Float32) | (Float64, Complex64) | (Complex128, Complex64)
        )
}

/// `mostly-safe` casts plus any cast between dtypes of the same kind family.
///
/// Signed and unsigned integers form one family.
pub fn is_same_kind_cast(from: DType, to: DType) -> bool {
    if is_mostly_safe_cast(from, to) {
        return true;
    }
    match (from.kind(), to.kind()) {
        (
            DTypeKind::SignedInteger | DTypeKind::UnsignedInteger,
            DTypeKind::SignedInteger | DTypeKind::UnsignedInteger,
        ) => true,
        (DTypeKind::RealFloatingPoint, DTypeKind::RealFloatingPoint)
        | (DTypeKind::ComplexFloatingPoint, DTypeKind::ComplexFloatingPoint) => true,
        _ => false,
    }
}

/// Whether `from` may be assigned to `to` under `policy`.
pub fn is_cast_allowed(from: DType, to: DType, policy: CastingPolicy) -> bool {
    match policy {
        CastingPolicy::None => from == to,
        CastingPolicy::Equiv => is_equivalent_cast(from, to),
        CastingPolicy::Safe => is_safe_cast(from, to),
        CastingPolicy::MostlySafe => is_mostly_safe_cast(from, to),
        CastingPolicy::SameKind => is_same_kind_cast(from, to),
        CastingPolicy::Unsafe => true,
    }
}

/// Policy check over anything naming a dtype (strings, [`DataType`](crate::DataType)s).
///
/// Unrecognized dtypes yield `false`.
pub fn can_cast<A, B>(from: &A, to: &B, policy: CastingPolicy) -> bool
where
    A: ResolveDType + ?Sized,
    B: ResolveDType + ?Sized,
{
    match (from.resolve_dtype(), to.resolve_dtype()) {
        (Some(f), Some(t)) => is_cast_allowed(f, t, policy),
        _ => false,
    }
}

// ============================================================================
// Scalars
// ============================================================================

/// A dynamically typed scalar value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Complex(Complex<f64>),
}

impl Scalar {
    /// Whether the value is below zero (real part for complex values).
    pub fn is_negative(&self) -> bool {
        match *self {
            Scalar::Int(v) => v < 0,
            Scalar::Float(v) => v < 0.0,
            Scalar::Complex(c) => c.re < 0.0,
            Scalar::Bool(_) | Scalar::Uint(_) => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Uint(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Complex(c) => write!(f, "{c}"),
        }
    }
}

macro_rules! impl_scalar_from {
    ($variant:ident as $wide:ty: $($ty:ty),*) => {
        $(impl From<$ty> for Scalar {
            fn from(v: $ty) -> Self {
                Scalar::$variant(v as $wide)
            }
        })*
    };
}

impl_scalar_from!(Int as i64: i8, i16, i32, i64);
impl_scalar_from!(Uint as u64: u8, u16, u32, u64);
impl_scalar_from!(Float as f64: f32, f64);

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<Complex<f64>> for Scalar {
    fn from(v: Complex<f64>) -> Self {
        Scalar::Complex(v)
    }
}

impl From<Complex<f32>> for Scalar {
    fn from(v: Complex<f32>) -> Self {
        Scalar::Complex(Complex::new(v.re as f64, v.im as f64))
    }
}

fn min_unsigned(v: u64) -> DType {
    if v <= u8::MAX as u64 {
        Uint8
    } else if v <= u16::MAX as u64 {
        Uint16
    } else if v <= u32::MAX as u64 {
        Uint32
    } else {
        Uint64
    }
}

fn signed_width(v: i64) -> DType {
    if i8::try_from(v).is_ok() {
        Int8
    } else if i16::try_from(v).is_ok() {
        Int16
    } else if i32::try_from(v).is_ok() {
        Int32
    } else {
        Int64
    }
}

fn min_signed(v: i64) -> DType {
    if v >= 0 {
        min_unsigned(v as u64)
    } else {
        signed_width(v)
    }
}

fn fits_f32(v: f64) -> bool {
    !v.is_finite() || (v as f32) as f64 == v
}

/// Integer magnitudes up to these are exact in f32 and f64.
const F32_EXACT_INT: u64 = 1 << f32::MANTISSA_DIGITS;
const F64_EXACT_INT: u64 = 1 << f64::MANTISSA_DIGITS;

fn integral_i64(value: Scalar) -> Option<i64> {
    match value {
        Scalar::Int(v) => Some(v),
        Scalar::Uint(v) => i64::try_from(v).ok(),
        Scalar::Float(v) if v.is_finite() && v.fract() == 0.0 => {
            (v >= i64::MIN as f64 && v < i64::MAX as f64).then_some(v as i64)
        }
        _ => None,
    }
}

/// Smallest dtype of `to`'s kind holding `value` exactly, or [`min_dtype`]
/// when no such dtype exists.
fn min_dtype_for(value: Scalar, to: DType) -> DType {
    match to.kind() {
        DTypeKind::SignedInteger => integral_i64(value).map_or_else(|| min_dtype(value), signed_width),
        DTypeKind::RealFloatingPoint | DTypeKind::ComplexFloatingPoint => {
            let magnitude = match value {
                Scalar::Int(v) => v.unsigned_abs(),
                Scalar::Uint(v) => v,
                Scalar::Float(v) => return if fits_f32(v) { Float32 } else { Float64 },
                Scalar::Bool(_) | Scalar::Complex(_) => return min_dtype(value),
            };
            if magnitude <= F32_EXACT_INT {
                Float32
            } else if magnitude <= F64_EXACT_INT {
                Float64
            } else {
                min_dtype(value)
            }
        }
        _ => min_dtype(value),
    }
}

/// Smallest dtype able to hold `value` exactly.
///
/// Integral floats are treated as integers; other floats pick `float32` when
/// the value survives a round trip through `f32`.
pub fn min_dtype(value: Scalar) -> DType {
    match value {
        Scalar::Bool(_) => Bool,
        Scalar::Int(v) => min_signed(v),
        Scalar::Uint(v) => min_unsigned(v),
        Scalar::Float(v) => {
            if v.is_finite() && v.fract() == 0.0 {
                if v >= 0.0 && v <= u64::MAX as f64 {
                    return min_unsigned(v as u64);
                }
                if v < 0.0 && v >= i64::MIN as f64 {
                    return min_signed(v as i64);
                }
            }
            if fits_f32(v) {
                Float32
            } else {
                Float64
            }
        }
        Scalar::Complex(c) => {
            if fits_f32(c.re) && fits_f32(c.im) {
                Complex64
            } else {
                Complex128
            }
        }
    }
}

/// Whether `value` may be written into an array of dtype `to` under `policy`.
///
/// The value is judged by the smallest dtype of the target's kind that holds
/// it exactly: `5` is an `int8` for a signed target, and `100000.0` a
/// `float32` for a floating-point one. A negative value is never accepted
/// for an unsigned target unless the policy is `unsafe`.
pub fn is_scalar_safe_cast(value: Scalar, to: DType, policy: CastingPolicy) -> bool {
    if policy == CastingPolicy::Unsafe {
        return true;
    }
    if to.is_unsigned() && value.is_negative() {
        return false;
    }
    is_cast_allowed(min_dtype_for(value, to), to, policy)
}

// ============================================================================
// Value conversion
// ============================================================================

/// Element-wise value conversion between element types, with `as` semantics.
pub trait CastInto<U> {
    fn cast_into(self) -> U;
}

macro_rules! impl_cast_as {
    (@to $src:ty; $($dst:ty),*) => {
        $(impl CastInto<$dst> for $src {
            #[inline]
            fn cast_into(self) -> $dst {
                self as $dst
            }
        }
        impl CastInto<Complex<$dst>> for $src {
            #[inline]
            fn cast_into(self) -> Complex<$dst> {
                Complex::new(self as $dst, 0 as $dst)
            }
        })*
    };
    ($($src:ty),*) => {
        $(impl_cast_as!(@to $src; i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);)*
    };
}

impl_cast_as!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

macro_rules! impl_cast_complex {
    ($($src:ty => $dst:ty),*) => {
        $(impl CastInto<Complex<$dst>> for Complex<$src> {
            #[inline]
            fn cast_into(self) -> Complex<$dst> {
                Complex::new(self.re as $dst, self.im as $dst)
            }
        })*
    };
}

impl_cast_complex!(f32 => f32, f32 => f64, f64 => f32, f64 => f64);

macro_rules! impl_cast_bool {
    ($($dst:ty),*) => {
        $(impl CastInto<$dst> for bool {
            #[inline]
            fn cast_into(self) -> $dst {
                self as u8 as $dst
            }
        })*
    };
}

impl_cast_bool!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl CastInto<bool> for bool {
    #[inline]
    fn cast_into(self) -> bool {
        self
    }
}

/// Conversion of a [`Scalar`] into a concrete element type.
///
/// Returns `None` when the scalar's category has no meaning for the target
/// (e.g. a complex value into a real element).
pub trait FromScalar: Sized {
    fn from_scalar(value: Scalar) -> Option<Self>;
}

macro_rules! impl_from_scalar_real {
    ($($ty:ty),*) => {
        $(impl FromScalar for $ty {
            fn from_scalar(value: Scalar) -> Option<Self> {
                match value {
                    Scalar::Bool(b) => <$ty as NumCast>::from(b as u8),
                    Scalar::Int(v) => <$ty as NumCast>::from(v),
                    Scalar::Uint(v) => <$ty as NumCast>::from(v),
                    Scalar::Float(v) => <$ty as NumCast>::from(v),
                    Scalar::Complex(_) => None,
                }
            }
        })*
    };
}

impl_from_scalar_real!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

macro_rules! impl_from_scalar_complex {
    ($($ty:ty),*) => {
        $(impl FromScalar for Complex<$ty> {
            fn from_scalar(value: Scalar) -> Option<Self> {
                match value {
                    Scalar::Complex(c) => Some(Complex::new(c.re as $ty, c.im as $ty)),
                    Scalar::Bool(_) => None,
                    other => <$ty as FromScalar>::from_scalar(other).map(|re| Complex::new(re, 0.0)),
                }
            }
        })*
    };
}

impl_from_scalar_complex!(f32, f64);

impl FromScalar for bool {
    fn from_scalar(value: Scalar) -> Option<Self> {
        match value {
            Scalar::Bool(b) => Some(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::ALL_DTYPES;

    #[test]
    fn test_float64_to_int32_rejected_when_safe() {
        assert!(!is_cast_allowed(Float64, Int32, CastingPolicy::Safe));
        assert!(!can_cast("float64", "int32", CastingPolicy::Safe));
        assert!(can_cast("float64", "int32", CastingPolicy::Unsafe));
    }

    #[test]
    fn test_none_and_equiv() {
        assert!(is_cast_allowed(Int8, Int8, CastingPolicy::None));
        assert!(!is_cast_allowed(Uint8, Uint8c, CastingPolicy::None));
        assert!(is_cast_allowed(Uint8, Uint8c, CastingPolicy::Equiv));
        assert!(!is_cast_allowed(Int8, Int16, CastingPolicy::Equiv));
    }

    #[test]
    fn test_mostly_safe_allows_float_downcast_only() {
        assert!(is_mostly_safe_cast(Float64, Float32));
        assert!(is_mostly_safe_cast(Complex128, Complex64));
        assert!(!is_mostly_safe_cast(Float32, Int32));
        assert!(!is_mostly_safe_cast(Int64, Int32));
    }

    #[test]
    fn test_same_kind() {
        assert!(is_same_kind_cast(Int64, Int8));
        assert!(is_same_kind_cast(Int16, Uint8));
        assert!(!is_same_kind_cast(Float64, Int64));
        assert!(!is_same_kind_cast(Complex64, Float64));
        assert!(!is_same_kind_cast(Bool, Int8));
    }

    #[test]
    fn test_unknown_dtype_is_false() {
        assert!(!can_cast("float", "float64", CastingPolicy::Unsafe));
        assert!(!can_cast("float64", "beep", CastingPolicy::SameKind));
    }

    #[test]
    fn test_policies_are_nested() {
        for &from in ALL_DTYPES {
            for &to in ALL_DTYPES {
                for pair in CastingPolicy::ALL.windows(2) {
                    if is_cast_allowed(from, to, pair[0]) {
                        assert!(
                            is_cast_allowed(from, to, pair[1]),
                            "{from} -> {to} allowed by {} but not {}",
                            pair[0],
                            pair[1]
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_everything_casts_to_generic_safely() {
        for &dt in ALL_DTYPES {
            assert!(is_safe_cast(dt, Generic));
        }
        assert!(!is_safe_cast(Generic, Float64));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("mostly-safe".parse::<CastingPolicy>().unwrap(), CastingPolicy::MostlySafe);
        assert!("mostly_safe".parse::<CastingPolicy>().is_err());
        assert_eq!(CastingPolicy::SameKind.to_string(), "same-kind");
    }

    #[test]
    fn test_min_dtype() {
        assert_eq!(min_dtype(Scalar::from(3.0f64)), Uint8);
        assert_eq!(min_dtype(Scalar::from(-3i32)), Int8);
        assert_eq!(min_dtype(Scalar::from(300u32)), Uint16);
        assert_eq!(min_dtype(Scalar::from(-40_000i64)), Int32);
        assert_eq!(min_dtype(Scalar::from(0.5f64)), Float32);
        assert_eq!(min_dtype(Scalar::from(3.14f64)), Float64);
        assert_eq!(min_dtype(Scalar::from(f64::NAN)), Float32);
        assert_eq!(min_dtype(Scalar::from(Complex::new(0.5f64, 1.0))), Complex64);
        assert_eq!(min_dtype(Scalar::from(true)), Bool);
    }

    #[test]
    fn test_scalar_safe_cast() {
        assert!(!is_scalar_safe_cast(Scalar::from(3.14f64), Int32, CastingPolicy::MostlySafe));
        assert!(is_scalar_safe_cast(Scalar::from(3.0f64), Int32, CastingPolicy::Safe));
        assert!(is_scalar_safe_cast(Scalar::from(3.14f64), Float32, CastingPolicy::MostlySafe));
        assert!(!is_scalar_safe_cast(Scalar::from(3.14f64), Float32, CastingPolicy::Safe));
    }

    #[test]
    fn test_positive_scalar_fits_signed_target() {
        assert!(is_scalar_safe_cast(Scalar::from(5i8), Int8, CastingPolicy::Safe));
        assert!(is_scalar_safe_cast(Scalar::from(127u8), Int8, CastingPolicy::Safe));
        assert!(!is_scalar_safe_cast(Scalar::from(128u8), Int8, CastingPolicy::MostlySafe));
        assert!(is_scalar_safe_cast(Scalar::from(300i32), Int16, CastingPolicy::MostlySafe));
        assert!(is_scalar_safe_cast(Scalar::from(300.0f64), Int16, CastingPolicy::Safe));
        assert!(!is_scalar_safe_cast(Scalar::from(40_000i32), Int16, CastingPolicy::MostlySafe));
        assert!(!is_scalar_safe_cast(Scalar::from(u64::MAX), Int64, CastingPolicy::MostlySafe));
        assert!(is_scalar_safe_cast(Scalar::from(40_000i32), Int16, CastingPolicy::SameKind));
    }

    #[test]
    fn test_exact_value_fits_float_target() {
        assert!(is_scalar_safe_cast(Scalar::from(100_000.0f64), Float32, CastingPolicy::Safe));
        assert!(is_scalar_safe_cast(Scalar::from(100_000u32), Float32, CastingPolicy::Safe));
        assert!(is_scalar_safe_cast(Scalar::from(-16_777_216i64), Float32, CastingPolicy::Safe));
        assert!(!is_scalar_safe_cast(Scalar::from(16_777_217i64), Float32, CastingPolicy::Safe));
        assert!(is_scalar_safe_cast(Scalar::from(16_777_217i64), Float64, CastingPolicy::Safe));
        assert!(is_scalar_safe_cast(Scalar::from(7u8), Complex64, CastingPolicy::Safe));
        assert!(!is_scalar_safe_cast(Scalar::from(Complex::new(0.5f64, 1.0)), Float64, CastingPolicy::MostlySafe));
    }

    #[test]
    fn test_negative_scalar_never_fits_unsigned() {
        let v = Scalar::from(-1i8);
        assert!(!is_scalar_safe_cast(v, Uint8, CastingPolicy::SameKind));
        assert!(!is_scalar_safe_cast(v, Uint64, CastingPolicy::MostlySafe));
        assert!(is_scalar_safe_cast(v, Uint8, CastingPolicy::Unsafe));
        assert!(is_scalar_safe_cast(v, Int8, CastingPolicy::Safe));
    }

    #[test]
    fn test_cast_into() {
        let x: f32 = 3i32.cast_into();
        assert_eq!(x, 3.0);
        let z: Complex<f64> = 2.5f32.cast_into();
        assert_eq!(z, Complex::new(2.5, 0.0));
        let w: Complex<f32> = Complex::new(1.0f64, -2.0).cast_into();
        assert_eq!(w, Complex::new(1.0f32, -2.0));
        let b: u8 = true.cast_into();
        assert_eq!(b, 1);
    }

    #[test]
    fn test_from_scalar() {
        assert_eq!(i32::from_scalar(Scalar::from(3.0f64)), Some(3));
        assert_eq!(u8::from_scalar(Scalar::from(-1i32)), None);
        assert_eq!(f32::from_scalar(Scalar::from(Complex::new(1.0f64, 0.0))), None);
        assert_eq!(
            Complex::<f64>::from_scalar(Scalar::from(2u8)),
            Some(Complex::new(2.0, 0.0))
        );
        assert_eq!(bool::from_scalar(Scalar::from(true)), Some(true));
        assert_eq!(bool::from_scalar(Scalar::from(1u8)), None);
    }
}
