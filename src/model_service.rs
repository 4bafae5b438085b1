use ndarray::{Array, Ix4};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model file not found: {0:?}")]
    MissingFile(PathBuf),
    #[error("ONNX Runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("Unexpected model output: {0}")]
    InvalidOutput(String),
}

/// A loaded classifier. Takes a `(1, H, W, 3)` batch and returns the class
/// scores of its single row.
pub trait ModelService: Send + Sync + 'static {
    fn predict(&self, input: &Array<f32, Ix4>) -> Result<Vec<f32>, ModelError>;
}
