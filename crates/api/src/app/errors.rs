use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use audioforge_core::DomainError;
use audioforge_infra::{BlobError, CreditError, JobStoreError};

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::InvalidSpec(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_spec", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
    }
}

pub fn store_error_to_response(err: JobStoreError) -> axum::response::Response {
    match err {
        JobStoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "job not found"),
        JobStoreError::Storage(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn blob_error_to_response(err: BlobError) -> axum::response::Response {
    match err {
        BlobError::UnsupportedContentType(ct) => json_error(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "unsupported_content_type",
            format!("unsupported content type: {ct}"),
        ),
        BlobError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "audio not found"),
        BlobError::Gateway(msg) => json_error(StatusCode::BAD_GATEWAY, "blob_gateway_error", msg),
    }
}

pub fn credit_error_to_response(err: CreditError) -> axum::response::Response {
    match err {
        CreditError::NoAccount => {
            json_error(StatusCode::NOT_FOUND, "no_account", "no credit account")
        }
        CreditError::Ledger(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "ledger_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
