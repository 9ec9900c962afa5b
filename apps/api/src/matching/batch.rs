//! Batch Matcher: scores one resume against a whole job list.
//!
//! Three scheduling strategies, picked at startup from config:
//! - `Sequential`: one scoring call in flight at a time
//! - `Concurrent(n)`: at most `n` calls in flight
//! - `Batch`: one aggregate call to the batch scoring capability
//!
//! Keyword overlap is always computed locally. A scoring failure for one job is
//! logged and that job is left out of the result set; it never gets a made-up score.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::matching::keywords::extract_matching_terms;
use crate::matching::records::{MatchRecord, MatchSet};
use crate::matching::scoring::{normalize_score, BatchScoring, ScoringAdapter, ScoringError};
use crate::models::job::JobRecord;
use crate::resume::ResumeInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringStrategy {
    #[default]
    Sequential,
    Concurrent(usize),
    Batch,
}

impl ScoringStrategy {
    /// Parses `sequential` | `concurrent` | `batch`.
    pub fn parse(name: &str, concurrency: usize) -> anyhow::Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "concurrent" => Ok(Self::Concurrent(concurrency.max(1))),
            "batch" => Ok(Self::Batch),
            other => anyhow::bail!(
                "Unknown scoring strategy '{other}' (expected sequential, concurrent or batch)"
            ),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Run invalidation
// ────────────────────────────────────────────────────────────────────────────

/// Issues run ids. Starting a run or invalidating bumps the counter, which
/// makes every outstanding `RunGuard` stale.
#[derive(Debug, Clone, Default)]
pub struct RunCounter(Arc<AtomicU64>);

impl RunCounter {
    pub fn begin(&self) -> RunGuard {
        let run_id = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        RunGuard {
            current: Arc::clone(&self.0),
            run_id,
        }
    }

    pub fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct RunGuard {
    current: Arc<AtomicU64>,
    run_id: u64,
}

impl RunGuard {
    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.run_id
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Matcher
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct BatchMatcher {
    scorer: Arc<dyn ScoringAdapter>,
    batch_scorer: Option<Arc<dyn BatchScoring>>,
    strategy: ScoringStrategy,
}

impl BatchMatcher {
    pub fn new(
        scorer: Arc<dyn ScoringAdapter>,
        batch_scorer: Option<Arc<dyn BatchScoring>>,
        strategy: ScoringStrategy,
    ) -> Self {
        let strategy = if strategy == ScoringStrategy::Batch && batch_scorer.is_none() {
            warn!("Batch scoring strategy requested without a batch backend; using sequential");
            ScoringStrategy::Sequential
        } else {
            strategy
        };
        Self {
            scorer,
            batch_scorer,
            strategy,
        }
    }

    pub fn strategy(&self) -> ScoringStrategy {
        self.strategy
    }

    /// Matches `resume` against `jobs`. Returns one MatchRecord per job that was
    /// scored successfully. Returns `RunSuperseded` as soon as `guard` goes stale.
    pub async fn run(
        &self,
        resume: &ResumeInput,
        jobs: &[JobRecord],
        guard: &RunGuard,
    ) -> Result<MatchSet, AppError> {
        let admitted = admit_jobs(jobs);
        info!(
            "Match run {} started: {} of {} jobs admitted (strategy {:?}, backend {})",
            guard.run_id(),
            admitted.len(),
            jobs.len(),
            self.strategy,
            self.scorer.backend()
        );

        let scores: Vec<Option<Result<f64, ScoringError>>> = if !resume.has_text() {
            // Nothing to compare; every job gets a defined zero without a backend call.
            admitted.iter().map(|_| Some(Ok(0.0))).collect()
        } else {
            match self.strategy {
                ScoringStrategy::Sequential => {
                    self.score_sequential(&resume.text, &admitted, guard).await?
                }
                ScoringStrategy::Concurrent(limit) => {
                    self.score_concurrent(&resume.text, &admitted, limit, guard)
                        .await?
                }
                ScoringStrategy::Batch => self.score_batch(&resume.text, &admitted).await?,
            }
        };

        if !guard.is_current() {
            return Err(AppError::RunSuperseded);
        }

        let mut set = MatchSet::default();
        for (job, score) in admitted.iter().zip(scores) {
            let outcome = score
                .unwrap_or_else(|| Err(ScoringError::MissingResult(job.id.clone())))
                .and_then(normalize_score);
            match outcome {
                Ok(score) => {
                    let terms = extract_matching_terms(&job.description, &resume.text);
                    set.insert(MatchRecord::new(job, score, terms, &resume.filename));
                }
                Err(e) => warn!("Skipping job {} after scoring failure: {}", job.id, e),
            }
        }

        info!(
            "Match run {} finished: {} match records",
            guard.run_id(),
            set.len()
        );
        Ok(set)
    }

    async fn score_sequential(
        &self,
        resume_text: &str,
        jobs: &[&JobRecord],
        guard: &RunGuard,
    ) -> Result<Vec<Option<Result<f64, ScoringError>>>, AppError> {
        let mut scores = Vec::with_capacity(jobs.len());
        for job in jobs {
            if !guard.is_current() {
                return Err(AppError::RunSuperseded);
            }
            scores.push(Some(self.scorer.score(resume_text, &job.description).await));
        }
        Ok(scores)
    }

    async fn score_concurrent(
        &self,
        resume_text: &str,
        jobs: &[&JobRecord],
        limit: usize,
        guard: &RunGuard,
    ) -> Result<Vec<Option<Result<f64, ScoringError>>>, AppError> {
        let permits = Arc::new(Semaphore::new(limit.max(1)));
        let resume_text: Arc<str> = Arc::from(resume_text);
        let mut tasks = JoinSet::new();

        for (position, job) in jobs.iter().enumerate() {
            let permits = Arc::clone(&permits);
            let scorer = Arc::clone(&self.scorer);
            let resume_text = Arc::clone(&resume_text);
            let description = job.description.clone();
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                (position, scorer.score(&resume_text, &description).await)
            });
        }

        let mut scores: Vec<Option<Result<f64, ScoringError>>> =
            (0..jobs.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            if !guard.is_current() {
                tasks.abort_all();
                return Err(AppError::RunSuperseded);
            }
            match joined {
                Ok((position, score)) => scores[position] = Some(score),
                Err(e) => warn!("Scoring task failed to complete: {}", e),
            }
        }
        Ok(scores)
    }

    async fn score_batch(
        &self,
        resume_text: &str,
        jobs: &[&JobRecord],
    ) -> Result<Vec<Option<Result<f64, ScoringError>>>, AppError> {
        let Some(batch_scorer) = &self.batch_scorer else {
            return Err(AppError::Scoring("No batch scoring backend configured".to_string()));
        };
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let request: Vec<JobRecord> = jobs.iter().map(|job| (*job).clone()).collect();
        let results = batch_scorer
            .score_batch(resume_text, &request)
            .await
            .map_err(|e| AppError::Scoring(format!("Batch scoring failed: {e}")))?;

        let mut by_id: HashMap<String, f64> = HashMap::with_capacity(results.len());
        for result in results {
            by_id.entry(result.job_id).or_insert(result.score);
        }
        Ok(jobs
            .iter()
            .map(|job| by_id.get(&job.id).map(|&score| Ok(score)))
            .collect())
    }
}

/// Filters out records missing an id, title or description, and repeats of an
/// id already seen in this batch. Both are logged, never failed.
fn admit_jobs(jobs: &[JobRecord]) -> Vec<&JobRecord> {
    let mut seen = HashSet::new();
    jobs.iter()
        .filter(|job| {
            let missing = job.missing_match_fields();
            if !missing.is_empty() {
                warn!(
                    "Skipping job '{}' with missing data for matching: {}",
                    job.id,
                    missing.join(", ")
                );
                return false;
            }
            if !seen.insert(job.id.as_str()) {
                warn!("Skipping duplicate job id '{}' in batch", job.id);
                return false;
            }
            true
        })
        .collect()
}
