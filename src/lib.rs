mod inference_service;
mod model_service;
mod ort_service;
mod prediction;
mod preprocessing;
mod routes;
mod server;
mod state;
mod transient;

pub mod config;

pub use inference_service::{InferenceService, PredictionError};
pub use model_service::{ModelError, ModelService};
pub use prediction::{PredictResponse, Prediction};
pub use routes::IMAGE_FIELD;
pub use server::{build_router, start_server};
pub use state::SharedState;
