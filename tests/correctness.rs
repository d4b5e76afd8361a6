use approx::assert_relative_eq;
use strided_ndarray::dtype::ALL_DTYPES;
use strided_ndarray::{
    binary_into, broadcast_scalar, can_cast, complement_shape, fill, is_cast_allowed, map,
    reduce_axis, sum, unary_into, unary_into_with_options, CastingPolicy, ComplexBuffer, DType,
    NdArray, Order, Slice, StridedError, TraversalOptions,
};

fn make_grid(rows: usize, cols: usize, order: Order) -> NdArray<Vec<f64>> {
    let data = (0..rows * cols).map(|k| k as f64).collect();
    NdArray::from_vec(data, &[rows, cols], order).unwrap()
}

#[test]
fn test_binary_add_1d() {
    let x = NdArray::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[4], Order::RowMajor).unwrap();
    let mut y = NdArray::from_vec(vec![0.0; 4], &[4], Order::RowMajor).unwrap();
    binary_into(&mut y, &x, &x, |a: f64, b: f64| a + b).unwrap();
    assert_eq!(y.to_vec(), vec![2.0, 4.0, 6.0, 8.0]);
}

#[test]
fn test_scalar_broadcast_2x2() {
    let s = broadcast_scalar(5.0f64, &[2, 2], Order::RowMajor);
    assert_eq!(s.shape(), &[2, 2]);
    assert_eq!(s.strides(), &[0, 0]);
    assert_eq!(s.buffer().len(), 1);
    for i in 0..2 {
        for j in 0..2 {
            assert_eq!(s.get(&[i, j]).unwrap(), 5.0);
        }
    }
}

#[test]
fn test_reverse_dimension_no_copy() {
    let a = NdArray::from_vec(vec![1, 2, 3, 4, 5, 6], &[3, 2], Order::RowMajor).unwrap();
    let r = a.view().reverse_dimension(0).unwrap();
    assert_eq!(r.to_vec(), vec![5, 6, 3, 4, 1, 2]);
    assert!(std::ptr::eq(*r.buffer(), a.buffer()));
    assert_eq!(a.to_vec(), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_complement_shape_scenarios() {
    assert_eq!(complement_shape(&[3, 2], &[1]), vec![3]);
    assert_eq!(complement_shape(&[2, 1, 10], &[-3, -2]), vec![10]);
}

#[test]
#[allow(clippy::approx_constant)]
fn test_casting_rejection() {
    assert!(!can_cast("float64", "int32", CastingPolicy::Safe));

    let mut a = NdArray::filled(0i32, &[3], Order::RowMajor);
    let err = fill(&mut a, 3.14).unwrap_err();
    assert!(matches!(err, StridedError::ScalarCast { dtype: DType::Int32, .. }));
    assert_eq!(a.to_vec(), vec![0, 0, 0]);
}

#[test]
fn test_fill_accepts_values_exact_in_target() {
    let mut a = NdArray::filled(0i8, &[4], Order::RowMajor);
    fill(&mut a, 5i8).unwrap();
    assert_eq!(a.to_vec(), vec![5; 4]);

    let mut b = NdArray::filled(0i16, &[2, 3], Order::RowMajor);
    fill(&mut b.view_mut().transpose(), 300).unwrap();
    assert_eq!(b.to_vec(), vec![300; 6]);

    let mut f = NdArray::filled(0.0f32, &[3], Order::ColumnMajor);
    fill(&mut f, 100_000.0).unwrap();
    assert_eq!(f.to_vec(), vec![100_000.0f32; 3]);
}

#[test]
fn test_casting_policies_are_nested() {
    for &from in ALL_DTYPES {
        for &to in ALL_DTYPES {
            for pair in CastingPolicy::ALL.windows(2) {
                if is_cast_allowed(from, to, pair[0]) {
                    assert!(
                        is_cast_allowed(from, to, pair[1]),
                        "{from} -> {to} allowed under {} but not {}",
                        pair[0],
                        pair[1]
                    );
                }
            }
            assert!(is_cast_allowed(from, to, CastingPolicy::Unsafe));
        }
        assert!(is_cast_allowed(from, from, CastingPolicy::None));
    }
}

#[test]
fn test_transpose_copy_all_kernel_ranks() {
    for rank in 0..=6 {
        let shape: Vec<usize> = (0..rank).map(|d| 2 + d % 3).collect();
        let n: usize = shape.iter().product();
        let src = NdArray::from_vec((0..n as i64).collect(), &shape, Order::RowMajor).unwrap();
        let reversed: Vec<usize> = (0..rank).rev().collect();
        let t = src.view().permute(&reversed).unwrap();

        let mut out = NdArray::filled(0i64, t.shape(), Order::ColumnMajor);
        unary_into(&mut out, &t, |v| v).unwrap();
        assert_eq!(out.to_vec(), t.to_vec(), "rank {rank}");
    }
}

#[test]
fn test_large_transpose_tiled_matches_sequential() {
    let a = make_grid(300, 170, Order::RowMajor);
    let t = a.view().transpose();
    let mut fast = NdArray::filled(0.0, &[170, 300], Order::RowMajor);
    let mut slow = NdArray::filled(0.0, &[170, 300], Order::RowMajor);
    unary_into(&mut fast, &t, |v| v * 2.0).unwrap();
    unary_into_with_options(&mut slow, &t, |v| v * 2.0, &TraversalOptions::sequential()).unwrap();
    assert_eq!(fast.to_vec(), slow.to_vec());
    assert_relative_eq!(fast.get(&[169, 299]).unwrap(), 2.0 * (299.0 * 170.0 + 169.0));
}

#[test]
fn test_negative_stride_slices() {
    let a = make_grid(6, 4, Order::ColumnMajor);
    let v = a
        .view()
        .slice_dimension(0, Slice::new(Some(-1), None, -2))
        .unwrap()
        .slice_dimension(1, Slice::range(1, 3))
        .unwrap();
    assert_eq!(v.shape(), &[3, 2]);

    let doubled = map(&v, |x| x * 2.0).unwrap();
    let expected: Vec<f64> = v.to_vec().into_iter().map(|x| x * 2.0).collect();
    assert_eq!(doubled.to_vec(), expected);
}

#[test]
fn test_complex_accessor_path_sum() {
    let parts: Vec<f64> = (0..8).map(|k| k as f64).collect();
    let a = NdArray::new(
        DType::Complex128,
        ComplexBuffer::<f64>::new(parts),
        &[2, 2],
        &[1, 2],
        0,
        Order::ColumnMajor,
    )
    .unwrap();
    let total = sum(&a).unwrap();
    assert_relative_eq!(total.re, 12.0);
    assert_relative_eq!(total.im, 16.0);
}

#[test]
fn test_reduce_axis_on_transposed_view() {
    let a = make_grid(3, 4, Order::RowMajor);
    let t = a.view().transpose();
    let sums = reduce_axis(&t, 1, 0.0f64, |acc, v| acc + v).unwrap();
    assert_eq!(sums.shape(), &[4]);
    // Column j of `a` is 0+j, 4+j, 8+j.
    assert_eq!(sums.to_vec(), vec![12.0, 15.0, 18.0, 21.0]);
}

#[test]
fn test_zero_sized_operations() {
    let a = NdArray::filled(1.0f64, &[4, 0], Order::RowMajor);
    let mut out = NdArray::filled(0.0f64, &[4, 0], Order::RowMajor);
    unary_into(&mut out, &a, |v| v).unwrap();
    assert_eq!(sum(&a).unwrap(), 0.0);
    assert!(map(&a, |v| v).unwrap().is_empty());
}
