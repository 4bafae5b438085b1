use crate::{
    model_service::{ModelError, ModelService},
    prediction::{argmax, round_to_hundredths, Prediction},
    preprocessing::{load_image_tensor, PreprocessError},
    transient::TransientImage,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Failed to persist upload: {0}")]
    Persist(#[source] std::io::Error),
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Model returned no class scores")]
    EmptyOutput,
    #[error("Failed to read upload: {0}")]
    Upload(#[from] axum::extract::multipart::MultipartError),
    #[error("Prediction worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Runs an uploaded image through the model. The model handle is shared by
/// every request and never mutated.
pub struct InferenceService<M: ModelService> {
    model_service: Arc<M>,
    upload_dir: PathBuf,
}

impl<M: ModelService> Clone for InferenceService<M> {
    fn clone(&self) -> Self {
        Self {
            model_service: self.model_service.clone(),
            upload_dir: self.upload_dir.clone(),
        }
    }
}

impl<M: ModelService> InferenceService<M> {
    pub fn new(model_service: M, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_service: Arc::new(model_service),
            upload_dir: upload_dir.into(),
        }
    }

    /// Persists the upload, classifies it, and removes the transient file
    /// before returning, whatever the outcome.
    pub fn predict_upload(&self, image_data: &[u8]) -> Result<Prediction, PredictionError> {
        let upload = TransientImage::persist_in(&self.upload_dir, image_data)
            .map_err(PredictionError::Persist)?;

        self.predict_file(upload.path())
    }

    /// Latency covers decoding, inference and argmax only.
    pub fn predict_file(&self, path: &Path) -> Result<Prediction, PredictionError> {
        let start = Instant::now();

        let input = load_image_tensor(path)?;
        let predictions = self.model_service.predict(&input)?;
        let growth_stage = argmax(&predictions).ok_or(PredictionError::EmptyOutput)?;
        let confidence = predictions[growth_stage];

        let process_time_ms = round_to_hundredths(start.elapsed().as_secs_f64() * 1000.0);

        tracing::info!(
            "Predicted growth stage: {}, confidence: {:.2}",
            growth_stage,
            confidence
        );

        Ok(Prediction {
            growth_stage,
            predictions,
            confidence,
            process_time_ms,
        })
    }
}
