mod health;
mod labels;
mod predict;

use crate::{model_service::ModelService, state::SharedState};
use axum::{
    routing::{get, post},
    Router,
};

pub use predict::IMAGE_FIELD;

pub fn api_routes<M: ModelService>() -> Router<SharedState<M>> {
    Router::new()
        .route("/health", get(health::healthcheck))
        .route("/labels", get(labels::growth_stages::<M>))
        .route("/predict", post(predict::predict_image::<M>))
}
