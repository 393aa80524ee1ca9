use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use audioforge_core::JobId;
use audioforge_generation::{JobSpec, JobState};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(submit))
        .route("/:id/status", get(status))
}

pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Json(body): Json<dto::SubmitGenerationRequest>,
) -> axum::response::Response {
    let owner = user.user_id();

    let spec = match JobSpec::validate(
        owner,
        body.service,
        body.text,
        body.source_audio_key.map(Into::into),
        body.voice,
    ) {
        Ok(spec) => spec,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let job_id = match services.jobs.create(spec).await {
        Ok(id) => id,
        Err(e) => return errors::store_error_to_response(e),
    };

    services.generator.enqueue(owner, job_id);

    // The count includes the job just created; the warning is advisory
    // rather than a limit, so a counting failure degrades to "no warning".
    let recent = match services.jobs.count_recent(owner, services.throttle.window).await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(%job_id, "recent-job count failed: {e}");
            0
        }
    };

    (
        StatusCode::CREATED,
        Json(dto::SubmitGenerationResponse {
            job_id,
            should_warn_throttle: services.throttle.should_warn(recent),
        }),
    )
        .into_response()
}

pub async fn status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let job_id: JobId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"),
    };

    let job = match services.jobs.get(user.user_id(), job_id).await {
        Ok(job) => job,
        Err(e) => return errors::store_error_to_response(e),
    };

    let body = match job.state {
        JobState::Pending => dto::JobStatusResponse::Pending,
        JobState::Failed => dto::JobStatusResponse::Failed,
        JobState::Succeeded => {
            let Some(key) = job.result_audio.as_ref() else {
                return errors::json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "missing_result",
                    "succeeded job has no result audio",
                );
            };
            match services.blobs.resolve_fetch_url(key, services.fetch_ttl).await {
                Ok(audio_url) => dto::JobStatusResponse::Succeeded { audio_url },
                Err(e) => return errors::blob_error_to_response(e),
            }
        }
    };

    (StatusCode::OK, Json(body)).into_response()
}
