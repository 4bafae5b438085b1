use crate::{
    config::ModelSettings,
    model_service::{ModelError, ModelService},
};
use ndarray::{Array, ArrayD, Axis, Ix4};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex, MutexGuard, PoisonError,
};

#[derive(Clone)]
pub struct OrtModelService {
    sessions: Arc<Vec<Arc<Mutex<Session>>>>,
    counter: Arc<AtomicUsize>,
}

impl OrtModelService {
    pub fn new(model_settings: &ModelSettings) -> Result<Self, ModelError> {
        let model_path = model_settings.get_model_path();
        if !model_path.exists() {
            return Err(ModelError::MissingFile(model_path));
        }

        tracing::info!("Loading model from: {}", model_path.display());

        let num_instances = model_settings.num_instances.max(1);
        let sessions = (0..num_instances)
            .map(|_| {
                let session = Session::builder()?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_file(&model_path)?;
                Ok(Arc::new(Mutex::new(session)))
            })
            .collect::<Result<Vec<_>, ort::Error>>()?;

        tracing::info!("Model loaded successfully ({} ONNX sessions)", num_instances);

        Ok(Self {
            sessions: Arc::new(sessions),
            counter: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn run_inference(&self, input: &Array<f32, Ix4>) -> Result<ArrayD<f32>, ModelError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let mut session = lock_session(&self.sessions[index]);

        tracing::debug!("Handling request with session {}", index);
        let owned_buffer;
        let input_view = if input.view().is_standard_layout() {
            input.view()
        } else {
            owned_buffer = input.as_standard_layout().into_owned();
            owned_buffer.view()
        };

        let tensor_ref = TensorRef::from_array_view(input_view)?;
        let outputs = session.run(ort::inputs![tensor_ref])?;

        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;

        ArrayD::from_shape_vec(shape.to_ixdyn(), data.to_vec())
            .map_err(|e| ModelError::InvalidOutput(format!("invalid tensor shape: {}", e)))
    }
}

/// A panic during a run leaves the session itself usable, so a poisoned lock
/// is taken over instead of failing every later request on that slot.
fn lock_session<T>(session: &Mutex<T>) -> MutexGuard<'_, T> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Takes the first row of a batched `(N, K)` output as the class scores.
fn first_row(outputs: &ArrayD<f32>) -> Result<Vec<f32>, ModelError> {
    if outputs.ndim() < 2 {
        return Err(ModelError::InvalidOutput(format!(
            "expected a batched output, got shape {:?}",
            outputs.shape()
        )));
    }
    if outputs.shape()[0] == 0 {
        return Err(ModelError::InvalidOutput("empty batch".to_string()));
    }

    Ok(outputs.index_axis(Axis(0), 0).iter().copied().collect())
}

impl ModelService for OrtModelService {
    fn predict(&self, input: &Array<f32, Ix4>) -> Result<Vec<f32>, ModelError> {
        let outputs = self.run_inference(input)?;
        first_row(&outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;
    use std::path::PathBuf;

    #[test]
    fn test_new_fails_fast_on_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ModelSettings {
            model_dir: dir.path().to_path_buf(),
            model_file: "missing.onnx".to_string(),
            num_instances: 1,
            labels_file: None,
        };

        let result = OrtModelService::new(&settings);

        match result {
            Err(ModelError::MissingFile(path)) => {
                assert_eq!(path, dir.path().join(PathBuf::from("missing.onnx")))
            }
            _ => panic!("expected a missing file error"),
        }
    }

    #[test]
    fn test_lock_session_recovers_after_panic() {
        let session = Arc::new(Mutex::new(7u32));

        let poisoner = session.clone();
        let result = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("inference panicked");
        })
        .join();

        assert!(result.is_err());
        assert!(session.is_poisoned());
        assert_eq!(*lock_session(&session), 7);
    }

    #[test]
    fn test_first_row_of_batched_output() {
        let outputs =
            ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![0.1, 0.7, 0.2, 0.3, 0.3, 0.4]).unwrap();

        assert_eq!(first_row(&outputs).unwrap(), vec![0.1, 0.7, 0.2]);
    }

    #[test]
    fn test_first_row_rejects_unbatched_output() {
        let outputs = ArrayD::from_shape_vec(IxDyn(&[3]), vec![0.1, 0.7, 0.2]).unwrap();

        assert!(matches!(
            first_row(&outputs),
            Err(ModelError::InvalidOutput(_))
        ));
    }

    #[test]
    fn test_first_row_rejects_empty_batch() {
        let outputs = ArrayD::<f32>::from_shape_vec(IxDyn(&[0, 7]), vec![]).unwrap();

        assert!(matches!(
            first_row(&outputs),
            Err(ModelError::InvalidOutput(_))
        ));
    }
}
