//! Job-source collaborator.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::models::job::JobRecord;

#[async_trait]
pub trait JobSource: Send + Sync {
    /// Every currently posted job, newest first.
    async fn list_jobs(&self) -> Result<Vec<JobRecord>, AppError>;

    async fn find_job(&self, job_id: &str) -> Result<Option<JobRecord>, AppError>;
}

/// Reads postings from the `jobs` table. Rows without a source tag are internal.
pub struct PgJobSource {
    db: PgPool,
}

impl PgJobSource {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const JOB_COLUMNS: &str = "id, title, company, description, required_skills, education_level, \
     experience_required, location, job_url, COALESCE(source, 'internal') AS source, owner_id";

#[async_trait]
impl JobSource for PgJobSource {
    async fn list_jobs(&self) -> Result<Vec<JobRecord>, AppError> {
        let jobs: Vec<JobRecord> =
            sqlx::query_as(&format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY created_at DESC"))
                .fetch_all(&self.db)
                .await?;
        info!("Loaded {} jobs from the job store", jobs.len());
        Ok(jobs)
    }

    async fn find_job(&self, job_id: &str) -> Result<Option<JobRecord>, AppError> {
        let job: Option<JobRecord> =
            sqlx::query_as(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
                .bind(job_id)
                .fetch_optional(&self.db)
                .await?;
        Ok(job)
    }
}

/// In-memory job list for tests.
#[cfg(test)]
pub(crate) struct StaticJobSource(pub Vec<JobRecord>);

#[cfg(test)]
#[async_trait]
impl JobSource for StaticJobSource {
    async fn list_jobs(&self) -> Result<Vec<JobRecord>, AppError> {
        Ok(self.0.clone())
    }

    async fn find_job(&self, job_id: &str) -> Result<Option<JobRecord>, AppError> {
        Ok(self.0.iter().find(|job| job.id == job_id).cloned())
    }
}
