pub mod app;
pub mod context;
pub mod middleware;
