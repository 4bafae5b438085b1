use serde::{Deserialize, Serialize};
use std::error::Error;

pub const MISSING_IMAGE_ERROR: &str = "No image file provided";

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub growth_stage: usize,
    pub predictions: Vec<f32>,
    pub confidence: f32,
    pub process_time_ms: f64,
}

/// Body of every `/predict` response. `success` is the only outcome
/// indicator; fields that do not apply are left out of the JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_stage: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_time_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

impl PredictResponse {
    fn empty(success: bool) -> Self {
        Self {
            success,
            growth_stage: None,
            predictions: None,
            confidence: None,
            process_time_ms: None,
            error: None,
            traceback: None,
        }
    }

    pub fn success(prediction: Prediction) -> Self {
        Self {
            growth_stage: Some(prediction.growth_stage),
            predictions: Some(prediction.predictions),
            confidence: Some(prediction.confidence),
            process_time_ms: Some(prediction.process_time_ms),
            ..Self::empty(true)
        }
    }

    pub fn missing_image() -> Self {
        Self {
            error: Some(MISSING_IMAGE_ERROR.to_string()),
            ..Self::empty(false)
        }
    }

    pub fn failure(err: &(dyn Error + 'static), include_traceback: bool) -> Self {
        Self {
            error: Some(err.to_string()),
            traceback: include_traceback.then(|| diagnostic(err)),
            ..Self::empty(false)
        }
    }
}

/// `Debug` form of the error followed by its chain of causes.
pub fn diagnostic(err: &(dyn Error + 'static)) -> String {
    let mut out = format!("{:?}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(&format!("\nCaused by: {}", cause));
        source = cause.source();
    }
    out
}

/// Index of the highest score. The lowest index wins ties, and the first
/// NaN wins over any number, as numpy's `argmax` does.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    if let Some(index) = scores.iter().position(|score| score.is_nan()) {
        return Some(index);
    }

    scores
        .iter()
        .enumerate()
        .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
        .map(|(index, _)| index)
}

pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
