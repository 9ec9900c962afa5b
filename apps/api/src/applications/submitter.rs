//! Application-submission collaborator.
//!
//! `StoredApplicationSubmitter` keeps the resume in S3 and the application row in
//! Postgres, and serves stored resumes back to the two parties of an
//! application. Tests swap in in-process fakes through the traits.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::ApplicationRow;

const RESUME_PREFIX: &str = "resumes/";

/// Everything sent to the submission collaborator for one application.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationPayload {
    pub job_id: String,
    /// Empty when the job has no owning organization.
    pub company_user_id: String,
    pub candidate_user_id: String,
    pub candidate_email: String,
    pub job_title: String,
    /// Empty when the job has no URL.
    pub job_url: String,
    pub job_source: String,
    pub match_percentage: f64,
    pub resume_file_name: String,
    #[serde(skip)]
    pub resume: Bytes,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationReceipt {
    pub application_id: Uuid,
    pub message: String,
}

#[async_trait]
pub trait ApplicationSubmitter: Send + Sync {
    async fn submit(&self, payload: ApplicationPayload) -> Result<ApplicationReceipt, AppError>;
}

/// A resume file attached to a stored application.
#[derive(Debug, Clone)]
pub struct StoredResume {
    pub file_name: String,
    pub data: Bytes,
    pub candidate_user_id: String,
    pub company_user_id: String,
}

impl StoredResume {
    /// Only the applicant and the owning organization may read the file.
    pub fn readable_by(&self, user_id: &str) -> bool {
        user_id == self.candidate_user_id
            || (!self.company_user_id.is_empty() && user_id == self.company_user_id)
    }
}

#[async_trait]
pub trait ResumeArchive: Send + Sync {
    /// Looks up a stored resume by the object name under `resumes/`.
    async fn fetch(&self, object_name: &str) -> Result<Option<StoredResume>, AppError>;
}

pub struct StoredApplicationSubmitter {
    db: PgPool,
    s3: S3Client,
    bucket: String,
}

impl StoredApplicationSubmitter {
    pub fn new(db: PgPool, s3: S3Client, bucket: String) -> Self {
        Self { db, s3, bucket }
    }
}

#[async_trait]
impl ApplicationSubmitter for StoredApplicationSubmitter {
    async fn submit(&self, payload: ApplicationPayload) -> Result<ApplicationReceipt, AppError> {
        let applied_at = Utc::now();
        let key = resume_object_key(
            &payload.job_id,
            &payload.candidate_user_id,
            &applied_at.format("%Y%m%d%H%M%S").to_string(),
            &payload.resume_file_name,
        );

        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(payload.resume.clone()))
            .send()
            .await
            .map_err(|e| AppError::Submission(format!("Failed to store resume: {e}")))?;
        info!("Resume stored at s3://{}/{}", self.bucket, key);

        let row = sqlx::query_as::<_, ApplicationRow>(
            r#"
            INSERT INTO applications
                (id, job_id, company_user_id, candidate_user_id, candidate_email, job_title,
                 job_url, job_source, match_percentage, resume_s3_key, resume_file_name, applied_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&payload.job_id)
        .bind(&payload.company_user_id)
        .bind(&payload.candidate_user_id)
        .bind(&payload.candidate_email)
        .bind(&payload.job_title)
        .bind(&payload.job_url)
        .bind(&payload.job_source)
        .bind(payload.match_percentage)
        .bind(&key)
        .bind(&payload.resume_file_name)
        .bind(applied_at)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::Submission(format!("Failed to record application: {e}")))?;

        info!(
            "Application {} recorded for job {} by {}",
            row.id, row.job_id, row.candidate_user_id
        );

        Ok(ApplicationReceipt {
            application_id: row.id,
            message: "Application submitted successfully!".to_string(),
        })
    }
}

#[async_trait]
impl ResumeArchive for StoredApplicationSubmitter {
    async fn fetch(&self, object_name: &str) -> Result<Option<StoredResume>, AppError> {
        let key = format!("{RESUME_PREFIX}{object_name}");
        let row: Option<ApplicationRow> = sqlx::query_as(
            "SELECT * FROM applications WHERE resume_s3_key = $1 ORDER BY applied_at DESC LIMIT 1",
        )
        .bind(&key)
        .fetch_optional(&self.db)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let object = match self
            .s3
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(object) => object,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                warn!("Application {} references missing object {}", row.id, key);
                return Ok(None);
            }
            Err(e) => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "Failed to read {key} from storage: {e}"
                )))
            }
        };
        let data = object
            .body
            .collect()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to read {key}: {e}")))?
            .into_bytes();

        Ok(Some(StoredResume {
            file_name: row.resume_file_name,
            data,
            candidate_user_id: row.candidate_user_id,
            company_user_id: row.company_user_id,
        }))
    }
}

/// `resumes/{job}_{candidate}_{timestamp}_{file}` with unsafe filename characters replaced.
fn resume_object_key(job_id: &str, candidate_id: &str, timestamp: &str, filename: &str) -> String {
    let safe = |s: &str| -> String {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    };
    format!(
        "{RESUME_PREFIX}{}_{}_{}_{}",
        safe(job_id),
        safe(candidate_id),
        timestamp,
        safe(filename)
    )
}
