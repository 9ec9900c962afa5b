use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::matching::records::MatchRecord;
use crate::models::job::JobRecord;
use crate::resume::{extract_text, ResumeInput};
use crate::routes::identity::Caller;
use crate::state::AppState;

const RESUME_FIELD: &str = "resume";

#[derive(Serialize)]
pub struct ResumeLoadedResponse {
    pub filename: String,
    pub characters: usize,
}

#[derive(Deserialize)]
pub struct StartMatchRequest {
    /// Externally sourced list. Omit to match against the job store.
    pub jobs: Option<Vec<JobRecord>>,
}

#[derive(Serialize)]
pub struct MatchesResponse {
    pub matches: Vec<MatchRecord>,
}

/// PUT /api/v1/resume
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    caller: Caller,
    mut multipart: Multipart,
) -> Result<Json<ResumeLoadedResponse>, AppError> {
    let principal = caller.require()?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::MissingInput(format!("Invalid resume upload: {e}")))?
    {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("resume.txt").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::MissingInput(format!("Invalid resume upload: {e}")))?;

        let text = extract_text(&filename, data.clone()).await;
        let characters = text.chars().count();
        let session = state.sessions.session(&principal).await;
        session
            .load_resume(ResumeInput::new(filename.clone(), text, data))
            .await?;

        return Ok(Json(ResumeLoadedResponse {
            filename,
            characters,
        }));
    }

    Err(AppError::MissingInput(format!(
        "Multipart field '{RESUME_FIELD}' is required"
    )))
}

/// DELETE /api/v1/resume
pub async fn handle_clear_resume(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<StatusCode, AppError> {
    let principal = caller.require()?;
    state.sessions.session(&principal).await.clear().await;
    state.sessions.release(&principal).await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobRecord>>, AppError> {
    Ok(Json(state.job_source.list_jobs().await?))
}

/// POST /api/v1/matches
pub async fn handle_start_matches(
    State(state): State<AppState>,
    caller: Caller,
    body: Bytes,
) -> Result<Json<MatchesResponse>, AppError> {
    let principal = caller.require()?;
    let jobs = match parse_job_list(&body)? {
        Some(jobs) => {
            info!("Matching against {} externally supplied jobs", jobs.len());
            jobs
        }
        None => state.job_source.list_jobs().await?,
    };

    let session = state.sessions.session(&principal).await;
    let matches = session.start_run(&state.matcher, jobs).await?;
    Ok(Json(MatchesResponse { matches }))
}

/// GET /api/v1/matches
pub async fn handle_get_matches(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<MatchesResponse>, AppError> {
    let principal = caller.require()?;
    let session = state.sessions.session(&principal).await;
    Ok(Json(MatchesResponse {
        matches: session.ranked().await,
    }))
}

/// PATCH /api/v1/matches/:job_id/keywords
pub async fn handle_toggle_keywords(
    State(state): State<AppState>,
    caller: Caller,
    Path(job_id): Path<String>,
) -> Result<Json<MatchRecord>, AppError> {
    let principal = caller.require()?;
    let session = state.sessions.session(&principal).await;
    Ok(Json(session.toggle_keywords(&job_id).await?))
}

/// An empty body means "use the job store"; anything else must be a valid
/// `StartMatchRequest`.
fn parse_job_list(body: &[u8]) -> Result<Option<Vec<JobRecord>>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let request: StartMatchRequest = serde_json::from_slice(body)
        .map_err(|e| AppError::MissingInput(format!("Invalid job list: {e}")))?;
    Ok(request.jobs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_body_uses_job_store() {
        assert!(parse_job_list(b"").unwrap().is_none());
        assert!(parse_job_list(b"  \n").unwrap().is_none());
        assert!(parse_job_list(b"{}").unwrap().is_none());
    }

    #[test]
    fn test_supplied_job_list_is_parsed() {
        let jobs = parse_job_list(br#"{"jobs": []}"#).unwrap();
        assert_eq!(jobs.map(|j| j.len()), Some(0));
    }

    #[test]
    fn test_malformed_job_list_is_rejected() {
        let err = parse_job_list(br#"{"jobs": [{"id": "#).unwrap_err();
        assert!(matches!(err, AppError::MissingInput(ref msg) if msg.starts_with("Invalid job list")));

        let err = parse_job_list(br#"{"jobs": "not a list"}"#).unwrap_err();
        assert!(matches!(err, AppError::MissingInput(_)));
    }
}
