//! Application Workflow: per-job apply state machine with transient status.
//!
//! Idle → Validating → Submitting → {Succeeded, Failed} → Idle (after `STATUS_TTL`).
//!
//! Each job id owns at most one status slot. A slot in `Validating` or
//! `Submitting` blocks further attempts for that job; terminal slots carry a
//! clear timer that a newer attempt cancels before starting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::applications::submitter::{ApplicationPayload, ApplicationReceipt, ApplicationSubmitter};
use crate::applications::validation::{validate_application, ApplyContext};
use crate::errors::AppError;
use crate::models::job::JobRecord;
use crate::models::user::Principal;
use crate::resume::ResumeInput;

/// How long a status stays visible after it is set.
pub const STATUS_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    Validating,
    Submitting,
    Succeeded,
    Failed,
}

impl AttemptPhase {
    pub fn is_active(self) -> bool {
        matches!(self, AttemptPhase::Validating | AttemptPhase::Submitting)
    }
}

/// Transient status of the latest apply attempt for one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationAttempt {
    pub job_id: String,
    pub phase: AttemptPhase,
    pub message: String,
    pub severity: Severity,
}

struct Slot {
    attempt: ApplicationAttempt,
    generation: u64,
    clear_timer: Option<JoinHandle<()>>,
}

impl Slot {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.clear_timer.take() {
            timer.abort();
        }
    }
}

/// Inputs of one apply attempt, resolved by the owning session.
pub struct ApplyRequest {
    pub principal: Option<Principal>,
    pub resume: Option<Arc<ResumeInput>>,
    pub job: JobRecord,
    /// Score from the current match run; 0 when none was computed.
    pub score: f64,
}

#[derive(Clone)]
pub struct ApplicationWorkflow {
    submitter: Arc<dyn ApplicationSubmitter>,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
    generations: Arc<AtomicU64>,
    ttl: Duration,
}

impl ApplicationWorkflow {
    pub fn new(submitter: Arc<dyn ApplicationSubmitter>) -> Self {
        Self {
            submitter,
            slots: Arc::new(Mutex::new(HashMap::new())),
            generations: Arc::new(AtomicU64::new(0)),
            ttl: STATUS_TTL,
        }
    }

    /// Runs one apply attempt to completion.
    ///
    /// The attempt runs on its own task, so it still reaches a terminal status
    /// (and its clear timer) when the caller stops waiting for it.
    ///
    /// Rejects with `InProgress` while another attempt for the same job is
    /// validating or submitting; that rejection leaves the running attempt's
    /// status untouched.
    pub async fn apply(&self, request: ApplyRequest) -> Result<ApplicationReceipt, AppError> {
        let workflow = self.clone();
        let job_id = request.job.id.clone();
        tokio::spawn(async move { workflow.run_attempt(request).await })
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!(
                    "Apply task for job {job_id} did not complete: {e}"
                ))
            })?
    }

    async fn run_attempt(&self, request: ApplyRequest) -> Result<ApplicationReceipt, AppError> {
        let job = &request.job;
        let job_id = job.id.clone();
        let generation = self.begin(&job_id, &job.title).await?;

        let ctx = ApplyContext {
            principal: request.principal.as_ref(),
            resume: request.resume.as_deref(),
            job,
        };
        if let Err(err) = validate_application(&ctx) {
            self.finish(
                &job_id,
                generation,
                AttemptPhase::Failed,
                rejection_message(&err),
                Severity::Danger,
            )
            .await;
            return Err(err);
        }

        let payload = build_payload(&ctx, request.score);
        self.set(
            &job_id,
            generation,
            AttemptPhase::Submitting,
            format!("Submitting application for {}...", job.title),
            Severity::Info,
        )
        .await;

        match self.submitter.submit(payload).await {
            Ok(receipt) => {
                info!(
                    "Application {} submitted for job {}",
                    receipt.application_id, job_id
                );
                self.finish(
                    &job_id,
                    generation,
                    AttemptPhase::Succeeded,
                    receipt.message.clone(),
                    Severity::Success,
                )
                .await;
                Ok(receipt)
            }
            Err(err) => {
                let detail = match err {
                    AppError::Submission(detail) => detail,
                    other => other.to_string(),
                };
                error!("Error submitting application for job {}: {}", job_id, detail);
                self.finish(
                    &job_id,
                    generation,
                    AttemptPhase::Failed,
                    format!("Failed to submit application: {detail}"),
                    Severity::Danger,
                )
                .await;
                Err(AppError::Submission(detail))
            }
        }
    }

    /// Current status of every job with a visible attempt, ordered by job id.
    pub async fn statuses(&self) -> Vec<ApplicationAttempt> {
        let slots = self.slots.lock().await;
        let mut attempts: Vec<ApplicationAttempt> =
            slots.values().map(|slot| slot.attempt.clone()).collect();
        attempts.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        attempts
    }

    #[cfg(test)]
    pub async fn status(&self, job_id: &str) -> Option<ApplicationAttempt> {
        self.slots
            .lock()
            .await
            .get(job_id)
            .map(|slot| slot.attempt.clone())
    }

    /// Drops every terminal status and its pending timer. Slots of attempts
    /// still validating or submitting stay, so the job keeps rejecting new
    /// attempts until that one finishes.
    pub async fn clear_all(&self) {
        let mut slots = self.slots.lock().await;
        slots.retain(|_, slot| {
            if slot.attempt.phase.is_active() {
                return true;
            }
            slot.cancel_timer();
            false
        });
    }

    /// True while any attempt is validating or submitting.
    pub async fn has_active(&self) -> bool {
        self.slots
            .lock()
            .await
            .values()
            .any(|slot| slot.attempt.phase.is_active())
    }

    async fn begin(&self, job_id: &str, job_title: &str) -> Result<u64, AppError> {
        let mut slots = self.slots.lock().await;
        if let Some(existing) = slots.get_mut(job_id) {
            if existing.attempt.phase.is_active() {
                return Err(AppError::InProgress(job_id.to_string()));
            }
            existing.cancel_timer();
        }

        let generation = self.generations.fetch_add(1, Ordering::SeqCst) + 1;
        slots.insert(
            job_id.to_string(),
            Slot {
                attempt: ApplicationAttempt {
                    job_id: job_id.to_string(),
                    phase: AttemptPhase::Validating,
                    message: format!("Validating application for {job_title}..."),
                    severity: Severity::Info,
                },
                generation,
                clear_timer: None,
            },
        );
        Ok(generation)
    }

    async fn set(
        &self,
        job_id: &str,
        generation: u64,
        phase: AttemptPhase,
        message: String,
        severity: Severity,
    ) {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get_mut(job_id).filter(|s| s.generation == generation) {
            slot.attempt.phase = phase;
            slot.attempt.message = message;
            slot.attempt.severity = severity;
        }
    }

    /// Publishes a terminal status and arms its clear timer.
    async fn finish(
        &self,
        job_id: &str,
        generation: u64,
        phase: AttemptPhase,
        message: String,
        severity: Severity,
    ) {
        let mut slots = self.slots.lock().await;
        let Some(slot) = slots.get_mut(job_id).filter(|s| s.generation == generation) else {
            debug!("Status for job {} was cleared before the attempt finished", job_id);
            return;
        };
        slot.attempt.phase = phase;
        slot.attempt.message = message;
        slot.attempt.severity = severity;
        slot.cancel_timer();

        let shared = Arc::clone(&self.slots);
        let ttl = self.ttl;
        let key = job_id.to_string();
        slot.clear_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            let mut slots = shared.lock().await;
            if slots.get(&key).map(|s| s.generation) == Some(generation) {
                slots.remove(&key);
                debug!("Cleared application status for job {}", key);
            }
        }));
    }
}

/// Gate rejections show their own wording, without the error-kind prefix.
fn rejection_message(err: &AppError) -> String {
    match err {
        AppError::Authorization(msg) | AppError::MissingInput(msg) | AppError::DataIntegrity(msg) => {
            msg.clone()
        }
        other => other.to_string(),
    }
}

fn build_payload(ctx: &ApplyContext<'_>, score: f64) -> ApplicationPayload {
    let job = ctx.job;
    let (candidate_user_id, candidate_email) = ctx
        .principal
        .map(|p| (p.user_id.clone(), p.email.clone().unwrap_or_default()))
        .unwrap_or_default();
    let (resume_file_name, resume) = ctx
        .resume
        .map(|r| (r.filename.clone(), r.file.clone()))
        .unwrap_or_default();

    ApplicationPayload {
        job_id: job.id.clone(),
        company_user_id: job.owner().unwrap_or_default().to_string(),
        candidate_user_id,
        candidate_email,
        job_title: job.title.clone(),
        job_url: job.url().unwrap_or_default().to_string(),
        job_source: job.source_tag().unwrap_or_default().to_string(),
        match_percentage: score,
        resume_file_name,
        resume,
    }
}
