// Application workflow: eligibility gates, payload assembly, submission and
// the transient per-job status shown to the candidate.

pub mod handlers;
pub mod submitter;
pub mod validation;
pub mod workflow;
