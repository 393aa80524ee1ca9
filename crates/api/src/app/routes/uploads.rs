use std::sync::Arc;

use axum::{Json, Router, extract::Extension, http::StatusCode, response::IntoResponse, routing::post};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/", post(create_upload))
}

/// Issue a one-shot upload target for caller-provided source audio.
/// The returned key is what a voice-conversion submission references.
pub async fn create_upload(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::UploadRequest>,
) -> axum::response::Response {
    let target = match services.blobs.issue_upload_target(&body.content_type).await {
        Ok(target) => target,
        Err(e) => return errors::blob_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(dto::UploadResponse {
            upload_url: target.upload_url,
            s3_key: target.key.into(),
        }),
    )
        .into_response()
}
