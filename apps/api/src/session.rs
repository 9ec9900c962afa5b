//! Candidate sessions: the coordinating context that owns one candidate's
//! resume, last job list, published MatchSet and application statuses.
//!
//! The MatchSet is replaced wholesale (new `Arc`) on every run or toggle, so
//! readers never observe a half-updated result. A run only publishes if its
//! `RunGuard` is still current when it finishes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::applications::submitter::{ApplicationReceipt, ApplicationSubmitter};
use crate::applications::workflow::{ApplicationAttempt, ApplicationWorkflow, ApplyRequest};
use crate::errors::AppError;
use crate::matching::batch::{BatchMatcher, RunCounter};
use crate::matching::ranker::{rank, toggle_keywords};
use crate::matching::records::{MatchRecord, MatchSet};
use crate::models::job::JobRecord;
use crate::models::user::Principal;
use crate::resume::ResumeInput;

/// Sessions untouched for this long are dropped on the next registry access.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Default)]
struct SessionState {
    resume: Option<Arc<ResumeInput>>,
    jobs: Arc<Vec<JobRecord>>,
    matches: Arc<MatchSet>,
}

pub struct CandidateSession {
    state: RwLock<SessionState>,
    runs: RunCounter,
    applications: ApplicationWorkflow,
}

impl CandidateSession {
    pub fn new(applications: ApplicationWorkflow) -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
            runs: RunCounter::default(),
            applications,
        }
    }

    /// Replaces the resume. Previous results and statuses are discarded and any
    /// in-flight run goes stale.
    pub async fn load_resume(&self, resume: ResumeInput) -> Result<(), AppError> {
        if !resume.has_text() {
            return Err(AppError::MissingInput(format!(
                "No text could be extracted from {}",
                resume.filename
            )));
        }

        {
            let mut state = self.state.write().await;
            // under the write lock, so no run can snapshot the old resume with a fresh guard
            self.runs.invalidate();
            info!(
                "Resume {} loaded ({} characters)",
                resume.filename,
                resume.text.len()
            );
            *state = SessionState {
                resume: Some(Arc::new(resume)),
                ..SessionState::default()
            };
        }
        self.applications.clear_all().await;
        Ok(())
    }

    pub async fn clear(&self) {
        {
            let mut state = self.state.write().await;
            self.runs.invalidate();
            *state = SessionState::default();
        }
        self.applications.clear_all().await;
        info!("Session inputs cleared");
    }

    pub async fn resume(&self) -> Option<Arc<ResumeInput>> {
        self.state.read().await.resume.clone()
    }

    /// No resume loaded and no application in flight.
    pub async fn is_idle(&self) -> bool {
        self.state.read().await.resume.is_none() && !self.applications.has_active().await
    }

    /// Runs the matcher over `jobs` and publishes the result if no newer run
    /// or clear happened meanwhile. Returns the ranked sequence.
    pub async fn start_run(
        &self,
        matcher: &BatchMatcher,
        jobs: Vec<JobRecord>,
    ) -> Result<Vec<MatchRecord>, AppError> {
        let (resume, guard) = {
            let state = self.state.read().await;
            let resume = state.resume.clone().ok_or_else(|| {
                AppError::MissingInput("Please upload your resume first.".to_string())
            })?;
            if jobs.is_empty() {
                return Err(AppError::MissingInput(
                    "No job vacancies available to match against.".to_string(),
                ));
            }
            (resume, self.runs.begin())
        };

        let matches = match matcher.run(&resume, &jobs, &guard).await {
            Ok(matches) => matches,
            Err(AppError::RunSuperseded) => {
                error!("Match run {} discarded: superseded", guard.run_id());
                return Err(AppError::RunSuperseded);
            }
            Err(e) => return Err(e),
        };

        let mut state = self.state.write().await;
        if !guard.is_current() {
            error!(
                "Match run {} finished after being superseded; result discarded",
                guard.run_id()
            );
            return Err(AppError::RunSuperseded);
        }
        if matches.is_empty() {
            info!("Match run {} produced no match records", guard.run_id());
        }
        let ranked = rank(&matches);
        state.matches = Arc::new(matches);
        state.jobs = Arc::new(jobs);
        Ok(ranked)
    }

    pub async fn ranked(&self) -> Vec<MatchRecord> {
        let matches = Arc::clone(&self.state.read().await.matches);
        rank(&matches)
    }

    /// Flips keyword visibility for one record and returns the updated record.
    pub async fn toggle_keywords(&self, job_id: &str) -> Result<MatchRecord, AppError> {
        let mut state = self.state.write().await;
        let next = toggle_keywords(&state.matches, job_id)?;
        let record = next
            .get(job_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No match result for job {job_id}")))?;
        state.matches = Arc::new(next);
        Ok(record)
    }

    /// Job from the most recent run's input list.
    pub async fn find_job(&self, job_id: &str) -> Option<JobRecord> {
        self.state
            .read()
            .await
            .jobs
            .iter()
            .find(|job| job.id == job_id)
            .cloned()
    }

    /// Starts an apply attempt for `job`, scored from the published MatchSet
    /// (0 when the job has no match result).
    pub async fn apply(
        &self,
        principal: &Principal,
        job: JobRecord,
    ) -> Result<ApplicationReceipt, AppError> {
        let (resume, score) = {
            let state = self.state.read().await;
            let score = state.matches.get(&job.id).map(|m| m.score).unwrap_or(0.0);
            (state.resume.clone(), score)
        };

        self.applications
            .apply(ApplyRequest {
                principal: Some(principal.clone()),
                resume,
                job,
                score,
            })
            .await
    }

    pub async fn application_statuses(&self) -> Vec<ApplicationAttempt> {
        self.applications.statuses().await
    }
}

struct SessionEntry {
    session: Arc<CandidateSession>,
    last_seen: Instant,
}

/// One `CandidateSession` per identified caller.
pub struct SessionRegistry {
    submitter: Arc<dyn ApplicationSubmitter>,
    sessions: Mutex<HashMap<String, SessionEntry>>,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(submitter: Arc<dyn ApplicationSubmitter>) -> Self {
        Self {
            submitter,
            sessions: Mutex::new(HashMap::new()),
            idle_ttl: SESSION_IDLE_TTL,
        }
    }

    pub async fn session(&self, principal: &Principal) -> Arc<CandidateSession> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        self.evict_idle(&mut sessions, now).await;

        let entry = sessions
            .entry(principal.user_id.clone())
            .or_insert_with(|| SessionEntry {
                session: Arc::new(CandidateSession::new(ApplicationWorkflow::new(
                    Arc::clone(&self.submitter),
                ))),
                last_seen: now,
            });
        entry.last_seen = now;
        Arc::clone(&entry.session)
    }

    /// Drops the caller's session once it holds nothing worth keeping.
    pub async fn release(&self, principal: &Principal) {
        let mut sessions = self.sessions.lock().await;
        let idle = match sessions.get(&principal.user_id) {
            Some(entry) => entry.session.is_idle().await,
            None => return,
        };
        if idle {
            sessions.remove(&principal.user_id);
            debug!("Released session for {}", principal.user_id);
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Removes sessions unused for `idle_ttl` that no request holds and that
    /// have no application in flight.
    async fn evict_idle(&self, sessions: &mut HashMap<String, SessionEntry>, now: Instant) {
        let mut expired = Vec::new();
        for (user_id, entry) in sessions.iter() {
            if now.duration_since(entry.last_seen) >= self.idle_ttl
                && Arc::strong_count(&entry.session) == 1
                && !entry.session.applications.has_active().await
            {
                expired.push(user_id.clone());
            }
        }
        for user_id in expired {
            sessions.remove(&user_id);
            debug!("Evicted idle session for {}", user_id);
        }
    }
}
