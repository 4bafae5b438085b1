use axum::{response::IntoResponse, response::Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct Status {
    status: String,
    model: String,
}

/// The model is loaded before the listener is bound, so a running process
/// always reports it as loaded.
pub async fn healthcheck() -> impl IntoResponse {
    Json(Status {
        status: "ok".into(),
        model: "loaded".into(),
    })
}
