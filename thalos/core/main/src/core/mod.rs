pub mod linalg;
pub mod random;
pub mod shape;
pub mod tensor;
