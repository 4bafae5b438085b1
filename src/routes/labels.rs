use crate::{model_service::ModelService, state::SharedState};
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct GrowthStages {
    labels: Vec<String>,
}

pub async fn growth_stages<M: ModelService>(
    State(state): State<SharedState<M>>,
) -> Json<GrowthStages> {
    Json(GrowthStages {
        labels: state.growth_stages.as_ref().clone(),
    })
}
