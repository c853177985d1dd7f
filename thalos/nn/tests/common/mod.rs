#![allow(dead_code)]

use std::io::Write;

use tempfile::NamedTempFile;
use thalos_core::Tensor;
use thalos_nn::ModelConfig;

/// Route `log` output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Small model that keeps forward passes fast.
pub fn tiny_config() -> ModelConfig {
    ModelConfig {
        vocab_size: 20,
        d_model: 12,
        num_heads: 3,
        num_layers: 2,
        d_ff: 24,
        max_seq_len: 10,
        ..ModelConfig::default()
    }
}

/// Write `json` to a temporary file that lives as long as the handle.
pub fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(json.as_bytes()).expect("write config");
    file.flush().expect("flush config");
    file
}

/// Assert that two f64 slices are element-wise close within a tolerance.
pub fn assert_near(actual: &[f64], expected: &[f64], tolerance: f64, msg: &str) {
    assert_eq!(actual.len(), expected.len(), "{}: length mismatch", msg);
    for (i, (&a, &e)) in actual.iter().zip(expected.iter()).enumerate() {
        assert!(
            (a - e).abs() <= tolerance,
            "{}: element [{}] mismatch: actual={}, expected={}, tolerance={}",
            msg,
            i,
            a,
            e,
            tolerance
        );
    }
}

/// Assert shape equality and element-wise closeness.
pub fn assert_tensor_near(actual: &Tensor, expected: &Tensor, tolerance: f64, msg: &str) {
    assert_eq!(actual.dims(), expected.dims(), "{}: shape mismatch", msg);
    assert_near(actual.data(), expected.data(), tolerance, msg);
}
