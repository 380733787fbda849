use axum::{routing::get, Router};
use std::sync::Arc;
use crate::AppContext;

pub mod events;
pub mod jobs;

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(events::events_router(ctx.clone()))
        .nest("/jobs", jobs::jobs_router(ctx))
}

async fn health() -> &'static str {
    "ok"
}
