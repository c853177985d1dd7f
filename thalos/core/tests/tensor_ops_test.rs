mod common;

use common::{assert_near, make_tensor};
use thalos_core::{Nested, Shape, Tensor, TensorError};

#[test]
fn nested_construction_matches_flat() {
    let nested = Tensor::from_nested(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
    let flat = make_tensor(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2]);
    assert_eq!(nested, flat);
}

#[test]
fn ragged_nesting_is_rejected() {
    let ragged = Nested::List(vec![
        Nested::List(vec![Nested::Value(1.0)]),
        Nested::Value(2.0),
    ]);
    assert!(matches!(
        Tensor::from_nested(ragged),
        Err(TensorError::ShapeMismatch { .. })
    ));
}

#[test]
fn broadcast_3d_against_row() {
    // [2, 2, 3] + [3]: the row is added to every innermost vector
    let a = Tensor::arange(0.0, 12.0, 1.0).unwrap().reshape([2, 2, 3]).unwrap();
    let row = Tensor::from_slice(&[100.0, 200.0, 300.0]);
    let c = a.add(&row).unwrap();
    assert_eq!(c.dims(), &[2, 2, 3]);
    assert_near(&c.data()[9..], &[109.0, 210.0, 311.0], 0.0, "last row");
}

#[test]
fn broadcast_both_operands_stretch() {
    let col = make_tensor(&[1.0, 2.0, 3.0], &[3, 1]);
    let row = make_tensor(&[10.0, 20.0], &[1, 2]);
    let diff = row.sub(&col).unwrap();
    assert_eq!(diff.dims(), &[3, 2]);
    assert_near(diff.data(), &[9.0, 19.0, 8.0, 18.0, 7.0, 17.0], 0.0, "row - col");
}

#[test]
fn broadcast_result_matches_op_output_shape() {
    let a = Tensor::zeros([4, 1, 5]);
    let b = Tensor::zeros([3, 1]);
    let expected = a.shape().broadcast_result(b.shape()).unwrap();
    assert_eq!(a.mul(&b).unwrap().shape(), &expected);
    assert_eq!(expected, Shape::new([4, 3, 5]));
}

#[test]
fn transpose_twice_is_identity() {
    let a = make_tensor(&[1.0, -2.0, 3.5, 4.0, 0.0, 6.25], &[2, 3]);
    assert_eq!(a.t().unwrap().t().unwrap(), a);
    assert_eq!(a.transpose(0, 1).unwrap(), a.t().unwrap());
}

#[test]
fn reshape_preserves_row_major_order() {
    let a = Tensor::arange(0.0, 6.0, 1.0).unwrap();
    let m = a.reshape([2, 3]).unwrap();
    assert_eq!(m.get(&[1, 0]).unwrap(), 3.0);
    assert_eq!(m.flatten(), a);
    assert!(a.reshape([4]).is_err());
}

#[test]
fn reductions_with_keepdim_broadcast_back() {
    let x = make_tensor(&[1.0, 2.0, 3.0, 6.0, 8.0, 10.0], &[2, 3]);
    let mean = x.mean(-1, true).unwrap();
    let centered = x.sub(&mean).unwrap();
    assert_near(
        centered.data(),
        &[-1.0, 0.0, 1.0, -2.0, 0.0, 2.0],
        1e-12,
        "centered rows",
    );
    let std = x.std(-1, false).unwrap();
    assert_near(
        std.data(),
        &[(2.0f64 / 3.0).sqrt(), (8.0f64 / 3.0).sqrt()],
        1e-12,
        "population std",
    );
}

#[test]
fn softmax_rows_are_distributions() {
    let x = make_tensor(&[-3.0, 0.0, 7.5, 1e3, -1e3, 0.0, 1.0, 1.0, 1.0], &[3, 3]);
    let p = x.softmax(-1).unwrap();
    for row in p.data().chunks(3) {
        assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(row.iter().all(|&v| v >= 0.0));
    }
}

#[test]
fn division_by_zero_never_errors() {
    let a = make_tensor(&[1.0, 0.0], &[2]);
    let q = a.div(&Tensor::zeros([1])).unwrap();
    assert!(q.data()[0].is_infinite());
    assert!(q.data()[1].is_nan());
}
