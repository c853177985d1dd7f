mod common;

use common::{assert_near, assert_tensor_near, init_logging, make_tensor};
use thalos_core::{linalg, random, NormOrder, PowerIteration, Tensor, TensorError};

fn well_conditioned() -> Tensor {
    make_tensor(
        &[4.0, 1.0, 0.5, 0.0, 1.0, 5.0, 1.0, 0.5, 0.5, 1.0, 6.0, 1.0, 0.0, 0.5, 1.0, 3.0],
        &[4, 4],
    )
}

#[test]
fn inverse_times_matrix_is_identity() {
    let a = well_conditioned();
    let a_inv = linalg::inv(&a).unwrap();
    let eye = Tensor::eye(4);
    assert_tensor_near(&linalg::matmul(&a, &a_inv).unwrap(), &eye, 1e-6, "A * inv(A)");
    assert_tensor_near(&linalg::matmul(&a_inv, &a).unwrap(), &eye, 1e-6, "inv(A) * A");
}

#[test]
fn inverse_of_random_matrix() {
    let mut rng = random::seeded_rng(11);
    let a = Tensor::randn([6, 6], &mut rng).add(&Tensor::eye(6).mul_scalar(6.0)).unwrap();
    let a_inv = linalg::inv(&a).unwrap();
    assert_tensor_near(&a.matmul(&a_inv).unwrap(), &Tensor::eye(6), 1e-6, "random inverse");
}

#[test]
fn solve_satisfies_system() {
    let a = well_conditioned();
    let b = Tensor::from_slice(&[1.0, -2.0, 3.0, 0.5]);
    let x = linalg::solve(&a, &b).unwrap();
    let ax = linalg::matmul(&a, &x.reshape([4, 1]).unwrap()).unwrap();
    assert_near(ax.data(), b.data(), 1e-9, "A x = b");
}

#[test]
fn solve_singular_system() {
    let a = make_tensor(&[1.0, 2.0, 2.0, 4.0], &[2, 2]);
    let b = Tensor::from_slice(&[1.0, 1.0]);
    assert!(matches!(
        linalg::solve(&a, &b),
        Err(TensorError::SingularMatrix { .. })
    ));
}

#[test]
fn determinant_known_values() {
    assert_eq!(linalg::det(&make_tensor(&[4.0, 7.0, 2.0, 6.0], &[2, 2])).unwrap(), 10.0);
    assert_eq!(linalg::det(&make_tensor(&[1.0, 2.0, 2.0, 4.0], &[2, 2])).unwrap(), 0.0);
}

#[test]
fn determinant_agrees_with_inverse() {
    let a = well_conditioned();
    let d = linalg::det(&a).unwrap();
    let d_inv = linalg::det(&linalg::inv(&a).unwrap()).unwrap();
    assert!((d * d_inv - 1.0).abs() < 1e-9);
}

#[test]
fn qr_reconstructs_and_is_orthonormal() {
    let a = well_conditioned();
    let qr = linalg::qr(&a).unwrap();
    assert_tensor_near(&linalg::matmul(&qr.q, &qr.r).unwrap(), &a, 1e-9, "Q R");
    let qtq = linalg::matmul(&linalg::transpose(&qr.q).unwrap(), &qr.q).unwrap();
    assert_tensor_near(&qtq, &Tensor::eye(4), 1e-9, "Q^T Q");
}

#[test]
fn power_iteration_dominant_pair() {
    init_logging();
    let a = make_tensor(&[2.0, 0.0, 0.0, 0.0, 3.0, 4.0, 0.0, 4.0, 9.0], &[3, 3]);
    // Eigenvalues 2, 1, 11
    let pair = linalg::eig(&a).unwrap();
    assert!((pair.value - 11.0).abs() < 1e-9);
    let av = linalg::matmul(&a, &pair.vector.reshape([3, 1]).unwrap()).unwrap();
    assert_near(
        av.data(),
        pair.vector.mul_scalar(11.0).data(),
        1e-6,
        "A v = lambda v",
    );
}

#[test]
fn power_iteration_respects_cap() {
    let a = make_tensor(&[1.0, 0.0, 0.0, 0.99], &[2, 2]);
    let config = PowerIteration {
        max_iterations: 5,
        ..PowerIteration::default()
    };
    let pair = linalg::eig_with(&a, &config).unwrap();
    assert_eq!(pair.iterations, 5);
}

#[test]
fn svd_leading_singular_value_matches_norm_bound() {
    let a = make_tensor(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2]);
    let svd = linalg::svd(&a).unwrap();
    let sigma = svd.s.data()[0];
    // Largest singular value of this matrix
    assert!((sigma - 9.525_518_091_565_107).abs() < 1e-6);
    assert!(sigma <= linalg::norm(&a, NormOrder::L2) + 1e-12);
}

#[test]
fn norms_and_trace() {
    let a = make_tensor(&[1.0, -2.0, 3.0, -4.0], &[2, 2]);
    assert_eq!(linalg::norm(&a, NormOrder::L1), 10.0);
    assert_eq!(linalg::norm(&a, NormOrder::Inf), 4.0);
    assert!((linalg::norm(&a, NormOrder::L2) - 30.0f64.sqrt()).abs() < 1e-12);
    assert_eq!(linalg::trace(&a).unwrap(), -3.0);
}
