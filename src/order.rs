//! Iteration-order planning (loop interchange).
//!
//! Arrays traversed in lock-step over one logical shape are classified by
//! their stride layout, a reference array is chosen, and dimensions are
//! reordered so the reference array's smallest stride is innermost.
//! Permuted dimensions are listed innermost first.

use log::trace;

/// Layout class of a stride array.
///
/// Discriminants are the tie-break priority when two classes have the same
/// number of members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IterationOrder {
    /// Stride magnitudes are neither non-increasing nor non-decreasing.
    Disorganized = 0,
    /// Stride magnitudes are non-increasing (last dimension fastest).
    RowMajor = 1,
    /// Stride magnitudes are non-decreasing (first dimension fastest).
    ColumnMajor = 2,
    /// Both at once, e.g. one-dimensional or uniformly strided arrays.
    Both = 3,
}

impl IterationOrder {
    #[inline]
    pub fn is_organized(self) -> bool {
        self != IterationOrder::Disorganized
    }
}

/// Classify a stride array by the monotonicity of its magnitudes.
pub fn iteration_order(strides: &[isize]) -> IterationOrder {
    let mut row_major = true;
    let mut column_major = true;
    for w in strides.windows(2) {
        let (a, b) = (w[0].unsigned_abs(), w[1].unsigned_abs());
        if a < b {
            row_major = false;
        }
        if a > b {
            column_major = false;
        }
    }
    match (row_major, column_major) {
        (true, true) => IterationOrder::Both,
        (true, false) => IterationOrder::RowMajor,
        (false, true) => IterationOrder::ColumnMajor,
        (false, false) => IterationOrder::Disorganized,
    }
}

/// Loop order for a lock-step traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopPlan {
    /// `permutation[k]` is the original dimension visited at loop level `k`
    /// (level 0 innermost).
    pub permutation: Vec<usize>,
    /// Shape in loop order.
    pub shape: Vec<usize>,
    /// One stride array per input, in loop order and input order.
    pub strides: Vec<Vec<isize>>,
}

impl LoopPlan {
    /// Plan that applies `permutation` to `shape` and every stride array.
    pub fn from_permutation(permutation: Vec<usize>, shape: &[usize], strides_list: &[&[isize]]) -> Self {
        let shape = permutation.iter().map(|&d| shape[d]).collect();
        let strides = strides_list
            .iter()
            .map(|s| permutation.iter().map(|&d| s[d]).collect())
            .collect();
        Self {
            permutation,
            shape,
            strides,
        }
    }

    /// Shape and stride arrays restored to the original dimension order.
    pub fn restore(&self) -> (Vec<usize>, Vec<Vec<isize>>) {
        let inv = invert_permutation(&self.permutation);
        let shape = inv.iter().map(|&k| self.shape[k]).collect();
        let strides = self
            .strides
            .iter()
            .map(|s| inv.iter().map(|&k| s[k]).collect())
            .collect();
        (shape, strides)
    }
}

/// Index of the array whose strides drive the loop order.
///
/// - every array disorganized: the first array
/// - exactly one disorganized: the first organized array
/// - otherwise: the first member of the most populated organized class, ties
///   going to the class encountered first in `classes`
pub fn reference_array(classes: &[IterationOrder]) -> usize {
    let disorganized = classes.iter().filter(|c| !c.is_organized()).count();
    if disorganized == classes.len() {
        return 0;
    }
    if disorganized == 1 {
        return classes.iter().position(|c| c.is_organized()).unwrap_or(0);
    }

    let mut counts = [0usize; 4];
    for &c in classes {
        counts[c as usize] += 1;
    }
    let mut best: Option<usize> = None;
    for (i, &c) in classes.iter().enumerate() {
        if !c.is_organized() {
            continue;
        }
        match best {
            Some(b) if counts[c as usize] <= counts[classes[b] as usize] => {}
            _ => best = Some(i),
        }
    }
    best.unwrap_or(0)
}

/// Stable permutation sorting dimensions by ascending stride magnitude.
pub fn ascending_stride_permutation(strides: &[isize]) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..strides.len()).collect();
    // `sort_by_key` is stable, so equal magnitudes keep their original order.
    perm.sort_by_key(|&d| strides[d].unsigned_abs());
    perm
}

/// Plan a lock-step traversal of arrays sharing `shape`.
///
/// `strides_list` holds one stride array per participating array, each of
/// length `shape.len()`. Rank 0 and rank 1 produce the identity permutation.
pub fn loop_interchange_order(shape: &[usize], strides_list: &[&[isize]]) -> LoopPlan {
    if shape.len() <= 1 || strides_list.is_empty() {
        return LoopPlan::from_permutation((0..shape.len()).collect(), shape, strides_list);
    }

    let classes: Vec<IterationOrder> = strides_list.iter().map(|s| iteration_order(s)).collect();
    let reference = reference_array(&classes);
    let permutation = ascending_stride_permutation(strides_list[reference]);
    trace!(
        "loop interchange: classes={:?} reference={} permutation={:?}",
        classes,
        reference,
        permutation
    );
    LoopPlan::from_permutation(permutation, shape, strides_list)
}

/// Inverse of a permutation: `inv[perm[k]] == k`.
pub fn invert_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0usize; perm.len()];
    for (k, &p) in perm.iter().enumerate() {
        inv[p] = k;
    }
    inv
}
