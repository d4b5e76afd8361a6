//! Dimension fusion.
//!
//! Dimensions are given in iteration order with index 0 innermost. Fusing
//! never changes which buffer positions are visited or their order.

/// Fuse adjacent dimensions that are contiguous in memory for every array.
///
/// Dimension `i` merges into `i - 1` when `strides[k][i] == dims[i-1] * strides[k][i-1]`
/// holds for all arrays `k`. The merged-away dimension is left with size 1;
/// strides are unchanged. Use [`compress_dims`] to drop the leftovers.
pub(crate) fn fuse_dims(dims: &[usize], all_strides: &[&[isize]]) -> Vec<usize> {
    let n = dims.len();
    if n <= 1 || all_strides.is_empty() {
        return dims.to_vec();
    }

    let mut fused = dims.to_vec();
    for i in (1..n).rev() {
        let mergeable = all_strides
            .iter()
            .all(|s| s[i] == fused[i - 1] as isize * s[i - 1]);
        if mergeable {
            fused[i - 1] *= fused[i];
            fused[i] = 1;
        }
    }
    fused
}

/// Drop size-1 dimensions and their strides.
///
/// A fully singleton shape collapses to rank 0.
pub(crate) fn compress_dims(dims: &[usize], all_strides: &[&[isize]]) -> (Vec<usize>, Vec<Vec<isize>>) {
    let keep: Vec<usize> = (0..dims.len()).filter(|&i| dims[i] != 1).collect();
    let out_dims = keep.iter().map(|&i| dims[i]).collect();
    let out_strides = all_strides
        .iter()
        .map(|s| keep.iter().map(|&i| s[i]).collect())
        .collect();
    (out_dims, out_strides)
}
