use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use audioforge_generation::Service;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new().route("/:service", get(list_history))
}

/// The caller's most recent succeeded clips for one service, newest first,
/// each with a fresh fetch URL.
pub async fn list_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(service): Path<String>,
) -> axum::response::Response {
    let service = Service::from(service);
    if !service.is_known() {
        return errors::json_error(StatusCode::BAD_REQUEST, "invalid_service", "unknown service");
    }

    let jobs = match services
        .jobs
        .list_completed(user.user_id(), &service, services.history_limit)
        .await
    {
        Ok(jobs) => jobs,
        Err(e) => return errors::store_error_to_response(e),
    };

    let mut items = Vec::with_capacity(jobs.len());
    for job in jobs {
        let Some(key) = job.result_audio.as_ref() else {
            continue;
        };
        match services.blobs.resolve_fetch_url(key, services.fetch_ttl).await {
            Ok(audio_url) => items.push(dto::HistoryItem {
                id: job.id,
                title: dto::history_title(&job),
                audio_url,
                created_at: job.created_at,
            }),
            Err(e) => {
                // A stale or unresolvable key hides one entry, not the page.
                tracing::warn!(job_id = %job.id, "fetch URL resolution failed: {e}");
            }
        }
    }

    (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
}
