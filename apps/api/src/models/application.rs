use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApplicationRow {
    pub id: Uuid,
    pub job_id: String,
    pub company_user_id: String,
    pub candidate_user_id: String,
    pub candidate_email: String,
    pub job_title: String,
    pub job_url: String,
    pub job_source: String,
    pub match_percentage: f64,
    pub resume_s3_key: String,
    pub resume_file_name: String,
    pub applied_at: DateTime<Utc>,
}
