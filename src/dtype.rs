//! Data-type registry.
//!
//! A closed set of element types together with their byte widths, kinds and
//! the fixed promotion table used when two arrays meet in one operation. All
//! tables are `static` and never mutated.

use std::fmt;
use std::str::FromStr;

use num_complex::Complex;

use crate::StridedError;

/// Element data type of an ndarray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DType {
    /// Raw byte buffer.
    Binary,
    Bool,
    /// Single-precision complex (two `f32`).
    Complex64,
    /// Double-precision complex (two `f64`).
    Complex128,
    Float32,
    Float64,
    /// Arbitrary values with no fixed byte layout.
    Generic,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    /// Clamped unsigned 8-bit integer.
    Uint8c,
    Uint16,
    Uint32,
    Uint64,
}

/// Kind tag of a [`DType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DTypeKind {
    Binary,
    Boolean,
    SignedInteger,
    UnsignedInteger,
    RealFloatingPoint,
    ComplexFloatingPoint,
    Generic,
}

use DType::*;

/// Every dtype, in canonical order.
pub const ALL_DTYPES: &[DType] = &[
    Binary, Bool, Complex64, Complex128, Float32, Float64, Generic, Int8, Int16, Int32, Int64,
    Uint8, Uint8c, Uint16, Uint32, Uint64,
];

impl DType {
    /// Canonical string identifier.
    pub const fn as_str(self) -> &'static str {
        match self {
            Binary => "binary",
            Bool => "bool",
            Complex64 => "complex64",
            Complex128 => "complex128",
            Float32 => "float32",
            Float64 => "float64",
            Generic => "generic",
            Int8 => "int8",
            Int16 => "int16",
            Int32 => "int32",
            Int64 => "int64",
            Uint8 => "uint8",
            Uint8c => "uint8c",
            Uint16 => "uint16",
            Uint32 => "uint32",
            Uint64 => "uint64",
        }
    }

    /// Single-character code.
    pub const fn char_code(self) -> char {
        match self {
            Binary => 'r',
            Bool => 'x',
            Complex64 => 'c',
            Complex128 => 'z',
            Float32 => 'f',
            Float64 => 'd',
            Generic => 'o',
            Int8 => 's',
            Int16 => 'k',
            Int32 => 'i',
            Int64 => 'l',
            Uint8 => 'b',
            Uint8c => 'a',
            Uint16 => 'm',
            Uint32 => 'u',
            Uint64 => 'v',
        }
    }

    /// Size of one element in bytes; `None` for `generic`.
    pub const fn bytes_per_element(self) -> Option<usize> {
        match self {
            Generic => None,
            Binary | Bool | Int8 | Uint8 | Uint8c => Some(1),
            Int16 | Uint16 => Some(2),
            Int32 | Uint32 | Float32 => Some(4),
            Int64 | Uint64 | Float64 | Complex64 => Some(8),
            Complex128 => Some(16),
        }
    }

    /// Required alignment in bytes; complex types align to their component.
    pub const fn alignment(self) -> Option<usize> {
        match self {
            Complex64 => Some(4),
            Complex128 => Some(8),
            _ => self.bytes_per_element(),
        }
    }

    pub const fn kind(self) -> DTypeKind {
        match self {
            Binary => DTypeKind::Binary,
            Bool => DTypeKind::Boolean,
            Int8 | Int16 | Int32 | Int64 => DTypeKind::SignedInteger,
            Uint8 | Uint8c | Uint16 | Uint32 | Uint64 => DTypeKind::UnsignedInteger,
            Float32 | Float64 => DTypeKind::RealFloatingPoint,
            Complex64 | Complex128 => DTypeKind::ComplexFloatingPoint,
            Generic => DTypeKind::Generic,
        }
    }

    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(
            self.kind(),
            DTypeKind::SignedInteger | DTypeKind::UnsignedInteger
        )
    }

    #[inline]
    pub const fn is_floating_point(self) -> bool {
        matches!(
            self.kind(),
            DTypeKind::RealFloatingPoint | DTypeKind::ComplexFloatingPoint
        )
    }

    #[inline]
    pub const fn is_numeric(self) -> bool {
        self.is_integer() || self.is_floating_point()
    }

    #[inline]
    pub const fn is_real(self) -> bool {
        self.is_integer() || matches!(self.kind(), DTypeKind::RealFloatingPoint)
    }

    #[inline]
    pub const fn is_complex(self) -> bool {
        matches!(self.kind(), DTypeKind::ComplexFloatingPoint)
    }

    #[inline]
    pub const fn is_unsigned(self) -> bool {
        matches!(self.kind(), DTypeKind::UnsignedInteger)
    }

    /// Real component type of a complex dtype.
    pub const fn real_component(self) -> Option<DType> {
        match self {
            Complex64 => Some(Float32),
            Complex128 => Some(Float64),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DType {
    type Err = StridedError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ALL_DTYPES
            .iter()
            .copied()
            .find(|dt| dt.as_str() == s)
            .ok_or_else(|| StridedError::UnknownDType(s.to_string()))
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// A data type object: a dtype plus optional descriptive metadata.
///
/// Accepted anywhere a dtype identifier is, and resolves to its inner dtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataType {
    dtype: DType,
    description: Option<String>,
}

impl DataType {
    pub fn new(dtype: DType) -> Self {
        Self {
            dtype,
            description: None,
        }
    }

    pub fn with_description(dtype: DType, description: impl Into<String>) -> Self {
        Self {
            dtype,
            description: Some(description.into()),
        }
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl From<DType> for DataType {
    fn from(dtype: DType) -> Self {
        DataType::new(dtype)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dtype.fmt(f)
    }
}

/// Values that can name a dtype.
pub trait ResolveDType {
    fn resolve_dtype(&self) -> Option<DType>;
}

impl ResolveDType for DType {
    fn resolve_dtype(&self) -> Option<DType> {
        Some(*self)
    }
}

impl ResolveDType for DataType {
    fn resolve_dtype(&self) -> Option<DType> {
        Some(self.dtype)
    }
}

impl ResolveDType for str {
    fn resolve_dtype(&self) -> Option<DType> {
        self.parse().ok()
    }
}

impl ResolveDType for String {
    fn resolve_dtype(&self) -> Option<DType> {
        self.as_str().resolve_dtype()
    }
}

impl<T: ResolveDType + ?Sized> ResolveDType for &T {
    fn resolve_dtype(&self) -> Option<DType> {
        (**self).resolve_dtype()
    }
}

/// Normalize a dtype identifier or data type object to a [`DType`].
///
/// Returns `None` for unrecognized input; callers decide how to report it.
pub fn resolve<T: ResolveDType + ?Sized>(value: &T) -> Option<DType> {
    value.resolve_dtype()
}

// ============================================================================
// Kind groupings
// ============================================================================

const SIGNED_INTEGER: &[DType] = &[Int8, Int16, Int32, Int64];
const UNSIGNED_INTEGER: &[DType] = &[Uint8, Uint8c, Uint16, Uint32, Uint64];
const INTEGER: &[DType] = &[Int8, Int16, Int32, Int64, Uint8, Uint8c, Uint16, Uint32, Uint64];
const REAL_FLOATING_POINT: &[DType] = &[Float32, Float64];
const COMPLEX_FLOATING_POINT: &[DType] = &[Complex64, Complex128];
const FLOATING_POINT: &[DType] = &[Float32, Float64, Complex64, Complex128];
const REAL: &[DType] = &[
    Float32, Float64, Int8, Int16, Int32, Int64, Uint8, Uint8c, Uint16, Uint32, Uint64,
];
const NUMERIC: &[DType] = &[
    Complex64, Complex128, Float32, Float64, Int8, Int16, Int32, Int64, Uint8, Uint8c, Uint16,
    Uint32, Uint64,
];
const TYPED: &[DType] = &[
    Binary, Bool, Complex64, Complex128, Float32, Float64, Int8, Int16, Int32, Int64, Uint8,
    Uint8c, Uint16, Uint32, Uint64,
];
const BOOLEAN: &[DType] = &[Bool];
const GENERIC: &[DType] = &[Generic];

const SIGNED_INTEGER_AND_GENERIC: &[DType] = &[Int8, Int16, Int32, Int64, Generic];
const UNSIGNED_INTEGER_AND_GENERIC: &[DType] = &[Uint8, Uint8c, Uint16, Uint32, Uint64, Generic];
const INTEGER_AND_GENERIC: &[DType] = &[
    Int8, Int16, Int32, Int64, Uint8, Uint8c, Uint16, Uint32, Uint64, Generic,
];
const REAL_FLOATING_POINT_AND_GENERIC: &[DType] = &[Float32, Float64, Generic];
const COMPLEX_FLOATING_POINT_AND_GENERIC: &[DType] = &[Complex64, Complex128, Generic];
const FLOATING_POINT_AND_GENERIC: &[DType] = &[Float32, Float64, Complex64, Complex128, Generic];
const REAL_AND_GENERIC: &[DType] = &[
    Float32, Float64, Int8, Int16, Int32, Int64, Uint8, Uint8c, Uint16, Uint32, Uint64, Generic,
];
const NUMERIC_AND_GENERIC: &[DType] = &[
    Complex64, Complex128, Float32, Float64, Int8, Int16, Int32, Int64, Uint8, Uint8c, Uint16,
    Uint32, Uint64, Generic,
];
const BOOLEAN_AND_GENERIC: &[DType] = &[Bool, Generic];

static KIND_TABLE: &[(&str, &[DType])] = &[
    ("all", ALL_DTYPES),
    ("typed", TYPED),
    ("numeric", NUMERIC),
    ("real", REAL),
    ("floating_point", FLOATING_POINT),
    ("real_floating_point", REAL_FLOATING_POINT),
    ("complex_floating_point", COMPLEX_FLOATING_POINT),
    ("integer", INTEGER),
    ("signed_integer", SIGNED_INTEGER),
    ("unsigned_integer", UNSIGNED_INTEGER),
    ("boolean", BOOLEAN),
    ("generic", GENERIC),
    ("numeric_and_generic", NUMERIC_AND_GENERIC),
    ("real_and_generic", REAL_AND_GENERIC),
    ("floating_point_and_generic", FLOATING_POINT_AND_GENERIC),
    ("real_floating_point_and_generic", REAL_FLOATING_POINT_AND_GENERIC),
    ("complex_floating_point_and_generic", COMPLEX_FLOATING_POINT_AND_GENERIC),
    ("integer_and_generic", INTEGER_AND_GENERIC),
    ("signed_integer_and_generic", SIGNED_INTEGER_AND_GENERIC),
    ("unsigned_integer_and_generic", UNSIGNED_INTEGER_AND_GENERIC),
    ("boolean_and_generic", BOOLEAN_AND_GENERIC),
];

/// Fixed membership list of a named kind grouping, or `None` if the name is
/// not a known grouping.
pub fn dtypes_of_kind(kind: &str) -> Option<&'static [DType]> {
    KIND_TABLE
        .iter()
        .find(|(name, _)| *name == kind)
        .map(|(_, dtypes)| *dtypes)
}

/// Names of every known kind grouping.
pub fn kind_names() -> impl Iterator<Item = &'static str> {
    KIND_TABLE.iter().map(|(name, _)| *name)
}

// ============================================================================
// Promotion
// ============================================================================

/// Common dtype of two operands, or `None` when they cannot be combined.
///
/// Table summary: equal dtypes are unchanged; `generic` absorbs every dtype
/// except `binary`; `binary` and `bool` only combine with themselves (and
/// `bool` with `generic`); integers of mixed signedness widen to the next
/// signed type that holds both, falling back to `float64`; integers wider
/// than 16 bits pair with `float32`/`complex64` to give `float64`/`complex128`.
pub fn promote(a: DType, b: DType) -> Option<DType> {
    if a == b {
        return Some(a);
    }
    let out = match (a, b) {
        (Binary, _) | (_, Binary) => return None,
        (Generic, _) | (_, Generic) => Generic,
        (Bool, _) | (_, Bool) => return None,

        // signed x signed
        (Int8 | Int16 | Int32 | Int64, Int8 | Int16 | Int32 | Int64) => wider(a, b),
        // unsigned x unsigned
        (Uint8, Uint8c) | (Uint8c, Uint8) => Uint16,
        (Uint8 | Uint8c | Uint16 | Uint32 | Uint64, Uint8 | Uint8c | Uint16 | Uint32 | Uint64) => {
            wider(a, b)
        }
        // signed x unsigned
        (Int8 | Int16 | Int32 | Int64, Uint8 | Uint8c | Uint16 | Uint32 | Uint64) => {
            mixed_sign(a, b)
        }
        (Uint8 | Uint8c | Uint16 | Uint32 | Uint64, Int8 | Int16 | Int32 | Int64) => {
            mixed_sign(b, a)
        }

        // integer x float/complex
        (Int8 | Int16 | Uint8 | Uint8c | Uint16, Float32)
        | (Float32, Int8 | Int16 | Uint8 | Uint8c | Uint16) => Float32,
        (Int32 | Int64 | Uint32 | Uint64, Float32) | (Float32, Int32 | Int64 | Uint32 | Uint64) => {
            Float64
        }
        (Int8 | Int16 | Int32 | Int64 | Uint8 | Uint8c | Uint16 | Uint32 | Uint64, Float64)
        | (Float64, Int8 | Int16 | Int32 | Int64 | Uint8 | Uint8c | Uint16 | Uint32 | Uint64) => {
            Float64
        }
        (Int8 | Int16 | Uint8 | Uint8c | Uint16, Complex64)
        | (Complex64, Int8 | Int16 | Uint8 | Uint8c | Uint16) => Complex64,
        (Int32 | Int64 | Uint32 | Uint64, Complex64)
        | (Complex64, Int32 | Int64 | Uint32 | Uint64) => Complex128,
        (_, Complex128) | (Complex128, _) => Complex128,

        // float x float/complex
        (Float32, Float64) | (Float64, Float32) => Float64,
        (Float32, Complex64) | (Complex64, Float32) => Complex64,
        (Float64, Complex64) | (Complex64, Float64) => Complex128,

        _ => return None,
    };
    Some(out)
}

/// Promote a list of dtypes left to right. An empty list has no common dtype.
pub fn promote_all(dtypes: &[DType]) -> Option<DType> {
    let (&first, rest) = dtypes.split_first()?;
    rest.iter().try_fold(first, |acc, &dt| promote(acc, dt))
}

fn wider(a: DType, b: DType) -> DType {
    if b.bytes_per_element() > a.bytes_per_element() {
        b
    } else {
        a
    }
}

fn mixed_sign(signed: DType, unsigned: DType) -> DType {
    match (signed, unsigned) {
        (Int8, Uint8 | Uint8c) => Int16,
        (Int16, Uint8 | Uint8c) => Int16,
        (Int8 | Int16, Uint16) => Int32,
        (Int32, Uint8 | Uint8c | Uint16) => Int32,
        (Int64, Uint8 | Uint8c | Uint16 | Uint32) => Int64,
        (Int8 | Int16 | Int32, Uint32) => Int64,
        _ => Float64,
    }
}

// ============================================================================
// Rust element types
// ============================================================================

/// Rust element types with a fixed dtype.
pub trait Element: Copy + 'static {
    const DTYPE: DType;
}

macro_rules! impl_element {
    ($($ty:ty => $dt:expr),* $(,)?) => {
        $(impl Element for $ty {
            const DTYPE: DType = $dt;
        })*
    };
}

impl_element! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    f32 => Float32,
    f64 => Float64,
    Complex<f32> => Complex64,
    Complex<f64> => Complex128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_strings_and_objects() {
        assert_eq!(resolve("float64"), Some(Float64));
        assert_eq!(resolve(&"uint8c".to_string()), Some(Uint8c));
        assert_eq!(resolve(&DataType::with_description(Int32, "indices")), Some(Int32));
        assert_eq!(resolve(&Complex64), Some(Complex64));
        assert_eq!(resolve("float"), None);
        assert_eq!(resolve(""), None);
    }

    #[test]
    fn test_from_str_error_carries_input() {
        let err = "beep".parse::<DType>().unwrap_err();
        assert!(matches!(err, StridedError::UnknownDType(ref s) if s == "beep"));
    }

    #[test]
    fn test_display_round_trip() {
        for &dt in ALL_DTYPES {
            assert_eq!(dt.to_string().parse::<DType>().unwrap(), dt);
        }
    }

    #[test]
    fn test_bytes_and_alignment() {
        assert_eq!(Float64.bytes_per_element(), Some(8));
        assert_eq!(Complex128.bytes_per_element(), Some(16));
        assert_eq!(Complex64.alignment(), Some(4));
        assert_eq!(Uint8c.bytes_per_element(), Some(1));
        assert_eq!(Generic.bytes_per_element(), None);
        assert_eq!(Generic.alignment(), None);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Uint8c.kind(), DTypeKind::UnsignedInteger);
        assert!(Complex64.is_complex());
        assert!(Int32.is_real());
        assert!(!Bool.is_numeric());
        assert_eq!(Complex128.real_component(), Some(Float64));
    }

    #[test]
    fn test_dtypes_of_kind() {
        assert_eq!(
            dtypes_of_kind("integer_and_generic").unwrap(),
            &[Int8, Int16, Int32, Int64, Uint8, Uint8c, Uint16, Uint32, Uint64, Generic]
        );
        assert_eq!(dtypes_of_kind("boolean").unwrap(), &[Bool]);
        assert_eq!(dtypes_of_kind("all").unwrap().len(), ALL_DTYPES.len());
        assert!(dtypes_of_kind("typed").unwrap().iter().all(|&d| d != Generic));
        assert!(dtypes_of_kind("floats").is_none());
        assert_eq!(kind_names().count(), 21);
    }

    #[test]
    fn test_kind_groups_agree_with_predicates() {
        for &dt in ALL_DTYPES {
            assert_eq!(dtypes_of_kind("integer").unwrap().contains(&dt), dt.is_integer());
            assert_eq!(dtypes_of_kind("numeric").unwrap().contains(&dt), dt.is_numeric());
            assert_eq!(dtypes_of_kind("real").unwrap().contains(&dt), dt.is_real());
        }
    }

    #[test]
    fn test_promote_basic() {
        assert_eq!(promote(Float32, Float64), Some(Float64));
        assert_eq!(promote(Int8, Uint8), Some(Int16));
        assert_eq!(promote(Int32, Uint32), Some(Int64));
        assert_eq!(promote(Int64, Uint64), Some(Float64));
        assert_eq!(promote(Uint8, Uint8c), Some(Uint16));
        assert_eq!(promote(Int16, Float32), Some(Float32));
        assert_eq!(promote(Int32, Float32), Some(Float64));
        assert_eq!(promote(Float64, Complex64), Some(Complex128));
        assert_eq!(promote(Int8, Complex64), Some(Complex64));
        assert_eq!(promote(Generic, Float32), Some(Generic));
    }

    #[test]
    fn test_promote_incompatible() {
        assert_eq!(promote(Bool, Int8), None);
        assert_eq!(promote(Binary, Float64), None);
        assert_eq!(promote(Binary, Generic), None);
        assert_eq!(promote(Bool, Generic), Some(Generic));
    }

    #[test]
    fn test_promote_is_symmetric_and_total_over_pairs() {
        for &a in ALL_DTYPES {
            for &b in ALL_DTYPES {
                assert_eq!(promote(a, b), promote(b, a), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_promote_all() {
        assert_eq!(promote_all(&[Int8, Uint8, Float32]), Some(Float32));
        assert_eq!(promote_all(&[Int8, Bool]), None);
        assert_eq!(promote_all(&[]), None);
    }

    #[test]
    fn test_element_dtypes() {
        assert_eq!(<f64 as Element>::DTYPE, Float64);
        assert_eq!(<Complex<f32> as Element>::DTYPE, Complex64);
        assert_eq!(<bool as Element>::DTYPE, Bool);
    }
}
