use std::collections::HashMap;

use serde::Serialize;

use crate::models::job::JobRecord;

/// Result of matching one resume against one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub job_id: String,
    /// 0 – 100, always present.
    pub score: f64,
    pub matching_terms: Vec<String>,
    pub keywords_visible: bool,
    pub job_title: String,
    pub company: String,
    pub job_description: String,
    pub location: Option<String>,
    pub job_url: Option<String>,
    pub source: Option<String>,
    pub owner_id: Option<String>,
    pub resume_filename: String,
}

impl MatchRecord {
    pub fn new(job: &JobRecord, score: f64, matching_terms: Vec<String>, resume_filename: &str) -> Self {
        Self {
            job_id: job.id.clone(),
            score,
            matching_terms,
            keywords_visible: false,
            job_title: job.title.clone(),
            company: job.company.clone(),
            job_description: job.description.clone(),
            location: job.location.clone(),
            job_url: job.job_url.clone(),
            source: job.source.clone(),
            owner_id: job.owner_id.clone(),
            resume_filename: resume_filename.to_string(),
        }
    }
}

/// MatchRecords of one completed run, keyed by job id, kept in input order.
///
/// Never mutated in place once published: updates build a new set.
#[derive(Debug, Clone, Default)]
pub struct MatchSet {
    records: Vec<MatchRecord>,
    index: HashMap<String, usize>,
}

impl MatchSet {
    /// Adds a record. A second record for an already-present job id is ignored.
    pub fn insert(&mut self, record: MatchRecord) -> bool {
        if self.index.contains_key(&record.job_id) {
            return false;
        }
        self.index.insert(record.job_id.clone(), self.records.len());
        self.records.push(record);
        true
    }

    pub fn get(&self, job_id: &str) -> Option<&MatchRecord> {
        self.index.get(job_id).map(|&i| &self.records[i])
    }

    /// Records in input order.
    pub fn iter(&self) -> impl Iterator<Item = &MatchRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy of this set with one record replaced through `f`.
    /// Returns `None` when `job_id` is unknown.
    pub fn with_updated<F>(&self, job_id: &str, f: F) -> Option<MatchSet>
    where
        F: FnOnce(&mut MatchRecord),
    {
        let &position = self.index.get(job_id)?;
        let mut next = self.clone();
        f(&mut next.records[position]);
        Some(next)
    }
}

impl FromIterator<MatchRecord> for MatchSet {
    fn from_iter<I: IntoIterator<Item = MatchRecord>>(iter: I) -> Self {
        let mut set = MatchSet::default();
        for record in iter {
            set.insert(record);
        }
        set
    }
}
