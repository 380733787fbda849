use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::transcription::JobStatus;
use crate::AppContext;

pub fn jobs_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/:job_id", get(get_job))
        .with_state(ctx)
}

#[derive(Debug, Serialize)]
struct JobView {
    job_id: String,
    status: &'static str,
    failure_reason: Option<String>,
    output: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

async fn get_job(
    State(ctx): State<Arc<AppContext>>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let Some(record) = ctx.transcriber.job(&job_id).await else {
        let body = ErrorBody { error: format!("Job not found: {}", job_id) };
        return (StatusCode::NOT_FOUND, Json(body)).into_response();
    };

    let failure_reason = match &record.status {
        JobStatus::Failed(reason) => Some(reason.clone()),
        _ => None,
    };
    let view = JobView {
        job_id: record.job_id,
        status: record.status.as_str(),
        failure_reason,
        output: record.output.uri(),
        created_at: record.created_at,
        completed_at: record.completed_at,
    };
    (StatusCode::OK, Json(view)).into_response()
}
