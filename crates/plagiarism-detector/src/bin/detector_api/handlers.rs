use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use plagiarism_detector::DetectorError;
use plagiarism_domain::{AnalysisReport, JobRequest, JobStatus};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::state::AppState;
use super::types::{
    ErrorResponse, HealthResponse, JobListResponse, JobStatusResponse, SubmitJobResponse,
};
use super::validation::parse_job_id;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(request_id: String, error: &DetectorError) -> ApiError {
    let status =
        StatusCode::from_u16(error.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(request_id = %request_id, error = %error, "Request failed");
    } else {
        warn!(request_id = %request_id, error = %error, "Request rejected");
    }

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            request_id,
            code: error.error_code().to_string(),
        }),
    )
}

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        backend: state.orchestrator.backend_name().to_string(),
    })
}

/// Submit an analysis job; validation failures are rejected before a job exists
pub async fn submit_job_handler(
    State(state): State<AppState>,
    payload: Result<Json<JobRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), ApiError> {
    let request_id = Uuid::new_v4().to_string();

    let Json(request) = payload.map_err(|rejection| {
        error_response(
            request_id.clone(),
            &DetectorError::validation_error("body", rejection.body_text()),
        )
    })?;

    info!(
        request_id = %request_id,
        references = request.reference_repos.len(),
        language = %request.language,
        threshold = request.threshold,
        "Job submission received"
    );

    match state.orchestrator.submit(request).await {
        Ok(job_id) => {
            info!(request_id = %request_id, job_id = %job_id, "Job accepted");
            Ok((
                StatusCode::ACCEPTED,
                Json(SubmitJobResponse { job_id, status: JobStatus::Queued }),
            ))
        }
        Err(e) => Err(error_response(request_id, &e)),
    }
}

/// Job status, progress and (once completed) result
pub async fn job_status_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    let request_id = Uuid::new_v4().to_string();

    let job_id = parse_job_id(&raw_id).map_err(|e| error_response(request_id.clone(), &e))?;
    let job = state.orchestrator.get(&job_id).await.map_err(|e| error_response(request_id, &e))?;

    Ok(Json(job.into()))
}

/// The report, verbatim; 404 until the job has completed
pub async fn job_report_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let request_id = Uuid::new_v4().to_string();

    let job_id = parse_job_id(&raw_id).map_err(|e| error_response(request_id.clone(), &e))?;
    let job =
        state.orchestrator.get(&job_id).await.map_err(|e| error_response(request_id.clone(), &e))?;

    match job.result {
        Some(report) if job.status == JobStatus::Completed => Ok(Json(report)),
        _ => Err(error_response(
            request_id,
            &DetectorError::report_not_ready(job_id, job.status),
        )),
    }
}

/// All jobs, newest first
pub async fn list_jobs_handler(
    State(state): State<AppState>,
) -> Result<Json<JobListResponse>, ApiError> {
    let request_id = Uuid::new_v4().to_string();

    let jobs = state.orchestrator.list().await.map_err(|e| error_response(request_id, &e))?;
    Ok(Json(JobListResponse { jobs }))
}
