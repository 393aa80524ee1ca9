use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use audioforge_infra::CreditError;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::UserContext;

/// Remaining balance. An account the ledger has never seen reads as zero;
/// provisioning (signup grants) happens outside this API.
pub async fn balance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> axum::response::Response {
    let balance = match services.credits.balance(user.user_id()).await {
        Ok(balance) => balance,
        Err(CreditError::NoAccount) => 0,
        Err(e) => return errors::credit_error_to_response(e),
    };

    (StatusCode::OK, Json(dto::CreditsResponse { balance })).into_response()
}
