//! Strided ndarray base layer.
//!
//! This crate provides the building blocks of an n-dimensional array
//! abstraction over flat buffers: shape/stride arithmetic, a closed dtype
//! registry with promotion and casting-safety rules, broadcasting, and a
//! cache-aware n-ary traversal engine that every element-wise operation is
//! built on.
//!
//! # Core Types
//!
//! - [`NdArray`]: descriptor `{dtype, buffer, shape, strides, offset, order}` over any [`Buffer`]
//! - [`Buffer`] / [`BufferMut`]: indexed element access; slices take the fast path,
//!   [`ComplexBuffer`] the accessor path
//! - [`DType`], [`CastingPolicy`], [`Scalar`]: dtype metadata and casting decisions
//!
//! # Traversal
//!
//! - [`nullary_into`], [`unary_into`], [`binary_into`], [`ternary_into`], [`quaternary_into`]:
//!   write `f(inputs...)` into an output array
//! - [`for_each`], [`for_each2`]: side-effecting visits
//! - [`map_in_place`], [`zip_in_place`]: in-place transforms
//! - [`fill`], [`assign`], [`map`], [`sum`], [`reduce_axis`]: casting-checked and
//!   broadcasting conveniences on top
//!
//! # Example
//!
//! ```rust
//! use strided_ndarray::{binary_into, NdArray, Order};
//!
//! let x = NdArray::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[4], Order::RowMajor).unwrap();
//! let mut y = NdArray::from_vec(vec![0.0; 4], &[4], Order::RowMajor).unwrap();
//!
//! binary_into(&mut y.view_mut(), &x.view(), &x.view(), |a: f64, b: f64| a + b).unwrap();
//! assert_eq!(y.to_vec(), vec![2.0, 4.0, 6.0, 8.0]);
//! ```
//!
//! # Cache Optimization
//!
//! - Dimensions are reordered so the smallest stride of the reference array is innermost
//! - Large traversals are tiled so the working set fits in L1 ([`BLOCK_MEMORY_SIZE`] = 32KB)
//! - Dense arrays bypass the planner entirely

pub mod array;
mod block;
pub mod broadcast;
pub mod buffer;
pub mod casting;
pub mod dtype;
mod fuse;
mod kernel;
mod map;
pub mod ops;
pub mod order;
mod reduce;
pub mod shape;

// ============================================================================
// Descriptor and buffers
// ============================================================================
pub use array::{NdArray, Slice};
pub use buffer::{Buffer, BufferMut, ComplexBuffer};

// ============================================================================
// Shape arithmetic
// ============================================================================
pub use shape::{
    complement_shape, flatten_shape, num_elements, offset_from_strides, strides_from_shape, Order,
};

// ============================================================================
// Data types and casting
// ============================================================================
pub use casting::{
    can_cast, is_cast_allowed, is_scalar_safe_cast, min_dtype, CastInto, CastingPolicy, FromScalar,
    Scalar,
};
pub use dtype::{dtypes_of_kind, promote, resolve, DType, DTypeKind, DataType, Element};

// ============================================================================
// Planning
// ============================================================================
pub use block::block_size;
pub use broadcast::{
    broadcast_array, broadcast_arrays, broadcast_scalar, broadcast_shapes, broadcast_strides,
    maybe_broadcast_array,
};
pub use order::{
    invert_permutation, iteration_order, loop_interchange_order, IterationOrder, LoopPlan,
};

// ============================================================================
// Traversal and operations
// ============================================================================
pub use map::{
    binary_into, binary_into_with_options, for_each, for_each2, for_each2_with_options,
    for_each_with_options, map_in_place, map_in_place_with_options, nullary_into,
    nullary_into_with_options, quaternary_into, quaternary_into_with_options, ternary_into,
    ternary_into_with_options, unary_into, unary_into_with_options, zip_in_place,
    zip_in_place_with_options,
};
pub use ops::{
    add, assign, assign_with_policy, axpy, copy_into, copy_scale, fill, fill_by, fill_with_policy,
    fma, map, mul,
};
pub use reduce::{dot, reduce, reduce_axis, sum};

// ============================================================================
// Configuration
// ============================================================================

/// Block memory size for cache-optimized iteration (L1 cache target).
///
/// Tiles are sized so that the combined working set of every participating
/// array fits within this many bytes.
pub const BLOCK_MEMORY_SIZE: usize = 32 * 1024;

/// Cache line size in bytes.
pub const CACHE_LINE_SIZE: usize = 64;

/// Bytes assumed per element for dtypes without a fixed width (`generic`).
pub const DEFAULT_ELEMENT_BYTES: usize = 8;

/// When tiling is applied to a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Blocking {
    /// Tile only when the working set exceeds [`BLOCK_MEMORY_SIZE`].
    #[default]
    Auto,
    Always,
    Never,
}

/// Per-call traversal configuration.
///
/// Visitation order is an internal choice; disable both loop interchange and
/// blocking to get plain lexicographic order over the array's own layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraversalOptions {
    pub loop_interchange: bool,
    pub blocking: Blocking,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            loop_interchange: true,
            blocking: Blocking::Auto,
        }
    }
}

impl TraversalOptions {
    /// Row-major lexicographic order with no reordering or tiling.
    pub fn sequential() -> Self {
        Self {
            loop_interchange: false,
            blocking: Blocking::Never,
        }
    }
}

// ============================================================================
// Error types
// ============================================================================

/// Errors raised by the descriptor and operation layers.
///
/// The pure base layer (shape arithmetic, dtype registry, casting and
/// broadcasting resolvers) reports failure through `Option`/`bool`; these
/// errors are what the calling layer turns them into.
#[derive(Debug, thiserror::Error)]
pub enum StridedError {
    /// Array ranks do not match.
    #[error("rank mismatch: {0} vs {1}")]
    RankMismatch(usize, usize),

    /// Array shapes are incompatible for the operation.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// Invalid axis index for the given array rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: isize, rank: usize },

    /// Stride array length doesn't match dimensions.
    #[error("stride and dims length mismatch")]
    StrideLengthMismatch,

    /// Integer overflow while computing an offset.
    #[error("offset overflow while computing buffer position")]
    OffsetOverflow,

    /// A view addresses positions outside its buffer.
    #[error("view spans buffer positions [{min}, {max}] but buffer has {len} elements")]
    OutOfBounds { min: isize, max: isize, len: usize },

    /// A multi-index lies outside the array shape.
    #[error("index {index:?} out of bounds for shape {shape:?}")]
    IndexOutOfBounds { index: Vec<usize>, shape: Vec<usize> },

    /// Shapes cannot be broadcast together.
    #[error("cannot broadcast shapes {0:?}")]
    Broadcast(Vec<Vec<usize>>),

    /// Unrecognized dtype identifier.
    #[error("unknown data type: {0:?}")]
    UnknownDType(String),

    /// Unrecognized casting policy name.
    #[error("unknown casting policy: {0:?}")]
    UnknownCastingPolicy(String),

    /// Array-to-array cast rejected by the casting policy.
    #[error("cannot cast {from} to {to} under '{policy}' casting")]
    UnsafeCast {
        from: DType,
        to: DType,
        policy: CastingPolicy,
    },

    /// Scalar value cannot be stored in the target dtype.
    #[error("cannot store {value} in a {dtype} array under '{policy}' casting")]
    ScalarCast {
        value: Scalar,
        dtype: DType,
        policy: CastingPolicy,
    },

    /// Slice step of zero.
    #[error("slice step cannot be zero")]
    ZeroSliceStep,

    /// Not a permutation of `0..rank`.
    #[error("invalid permutation {0:?}")]
    InvalidPermutation(Vec<usize>),
}

/// Result type for strided array operations.
pub type Result<T> = std::result::Result<T, StridedError>;
