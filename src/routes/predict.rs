use crate::{
    inference_service::PredictionError, model_service::ModelService, prediction::PredictResponse,
    state::SharedState,
};
use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    response::Json,
};
use tracing::instrument;

pub const IMAGE_FIELD: &str = "image";

/// Returns the first file part named `image`. A plain text part with that
/// name carries no file and is skipped.
async fn read_image_field(mut multipart: Multipart) -> Result<Option<Bytes>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) && field.file_name().is_some() {
            return Ok(Some(field.bytes().await?));
        }
    }
    Ok(None)
}

/// Always answers 200; `success` in the body tells the outcome.
#[instrument(skip(state, multipart))]
pub async fn predict_image<M: ModelService>(
    State(state): State<SharedState<M>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<PredictResponse> {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!("Request is not a multipart upload: {}", rejection);
            return Json(PredictResponse::missing_image());
        }
    };

    let image_data = match read_image_field(multipart).await {
        Ok(Some(image_data)) => image_data,
        Ok(None) => return Json(PredictResponse::missing_image()),
        Err(err) => {
            let err = PredictionError::from(err);
            tracing::error!("Failed to read multipart body: {}", err);
            return Json(PredictResponse::failure(&err, state.include_traceback));
        }
    };

    let inference_service = state.inference_service.clone();
    let outcome =
        tokio::task::spawn_blocking(move || inference_service.predict_upload(&image_data)).await;

    let response = match outcome.map_err(PredictionError::from).and_then(|result| result) {
        Ok(prediction) => PredictResponse::success(prediction),
        Err(err) => {
            tracing::error!("Prediction failed: {}", err);
            PredictResponse::failure(&err, state.include_traceback)
        }
    };

    Json(response)
}
