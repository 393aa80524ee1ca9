use axum::{Router, routing::get};

pub mod credits;
pub mod generate;
pub mod history;
pub mod system;
pub mod uploads;

/// Router for all authenticated (owner-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/credits", get(credits::balance))
        .nest("/generate", generate::router())
        .nest("/uploads", uploads::router())
        .nest("/history", history::router())
}
