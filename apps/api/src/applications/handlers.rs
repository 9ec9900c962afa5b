use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use tracing::warn;

use crate::applications::submitter::ApplicationReceipt;
use crate::applications::validation::require_candidate_role;
use crate::applications::workflow::ApplicationAttempt;
use crate::errors::AppError;
use crate::resume::file_extension;
use crate::routes::identity::Caller;
use crate::state::AppState;

/// POST /api/v1/applications/:job_id
pub async fn handle_apply(
    State(state): State<AppState>,
    caller: Caller,
    Path(job_id): Path<String>,
) -> Result<Json<ApplicationReceipt>, AppError> {
    // role gate first: unidentified callers never reach the job store
    require_candidate_role(caller.0.as_ref())?;
    let principal = caller.require()?;

    let session = state.sessions.session(&principal).await;
    let job = match session.find_job(&job_id).await {
        Some(job) => job,
        None => state
            .job_source
            .find_job(&job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?,
    };

    let receipt = session.apply(&principal, job).await?;
    Ok(Json(receipt))
}

/// GET /api/v1/applications/status
pub async fn handle_application_status(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<ApplicationAttempt>>, AppError> {
    let principal = caller.require()?;
    let session = state.sessions.session(&principal).await;
    Ok(Json(session.application_statuses().await))
}

/// GET /api/v1/resumes/:file_name
///
/// Serves a resume stored with an application to the applicant or the owning
/// organization.
pub async fn handle_download_resume(
    State(state): State<AppState>,
    caller: Caller,
    Path(file_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let principal = caller.require()?;
    if file_name.is_empty() || file_name.contains('/') || file_name.contains("..") {
        return Err(AppError::NotFound(format!("Resume {file_name} not found")));
    }

    let stored = state
        .resumes
        .fetch(&file_name)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {file_name} not found")))?;
    if !stored.readable_by(&principal.user_id) {
        warn!(
            "User {} denied access to resume {}",
            principal.user_id, file_name
        );
        return Err(AppError::Authorization(
            "You do not have access to this resume.".to_string(),
        ));
    }

    let content_type = match file_extension(&stored.file_name).as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    };
    let disposition = format!(
        "attachment; filename=\"{}\"",
        stored.file_name.replace(['"', '\\', '\r', '\n'], "_")
    );

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        stored.data,
    ))
}
