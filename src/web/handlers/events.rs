use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::pipeline::InvocationResult;
use crate::AppContext;

pub fn events_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/events", post(handle_upload_event))
        .with_state(ctx)
}

/// Object-store upload notification in, invocation result out.
async fn handle_upload_event(
    State(ctx): State<Arc<AppContext>>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(e) => {
            error!("Rejected notification body: {}", e);
            return (StatusCode::BAD_REQUEST, Json(InvocationResult::error(e.body_text())));
        }
    };

    let result = ctx.pipeline.handle_event(&payload).await;
    match &result {
        InvocationResult::Success { summary_file, .. } => {
            info!("Invocation succeeded: {}", summary_file);
            (StatusCode::OK, Json(result))
        }
        InvocationResult::Error { .. } => (StatusCode::INTERNAL_SERVER_ERROR, Json(result)),
    }
}
