//! Ranker: orders MatchRecords by score and owns the keyword visibility toggle.

use std::cmp::Ordering;

use crate::errors::AppError;
use crate::matching::records::{MatchRecord, MatchSet};

/// Records ordered by score descending. Equal scores keep their input order.
pub fn rank(matches: &MatchSet) -> Vec<MatchRecord> {
    let mut ranked: Vec<MatchRecord> = matches.iter().cloned().collect();
    // sort_by is stable
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked
}

/// New set with `keywords_visible` flipped for `job_id` only.
pub fn toggle_keywords(matches: &MatchSet, job_id: &str) -> Result<MatchSet, AppError> {
    matches
        .with_updated(job_id, |record| record.keywords_visible = !record.keywords_visible)
        .ok_or_else(|| AppError::NotFound(format!("No match result for job {job_id}")))
}
