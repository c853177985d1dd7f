#![allow(dead_code)]

use thalos_core::Tensor;

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Create a tensor from a flat slice and shape.
pub fn make_tensor(data: &[f64], shape: &[usize]) -> Tensor {
    Tensor::from_vec(data.to_vec(), shape).expect("test tensor shape")
}

/// Assert that two f64 slices are element-wise close within a tolerance.
pub fn assert_near(actual: &[f64], expected: &[f64], tolerance: f64, msg: &str) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "{}: length mismatch (actual={}, expected={})",
        msg,
        actual.len(),
        expected.len()
    );
    for (i, (&a, &e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert!(
            (a - e).abs() <= tolerance,
            "{}: element [{}] mismatch: actual={}, expected={}, diff={}, tolerance={}",
            msg,
            i,
            a,
            e,
            (a - e).abs(),
            tolerance
        );
    }
}

/// Assert shape equality and element-wise closeness.
pub fn assert_tensor_near(actual: &Tensor, expected: &Tensor, tolerance: f64, msg: &str) {
    assert_eq!(actual.dims(), expected.dims(), "{}: shape mismatch", msg);
    assert_near(actual.data(), expected.data(), tolerance, msg);
}
