use std::sync::Arc;

use crate::applications::submitter::ResumeArchive;
use crate::jobs::JobSource;
use crate::matching::batch::BatchMatcher;
use crate::session::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry>,
    /// Scoring backend and scheduling strategy, fixed at startup.
    pub matcher: BatchMatcher,
    pub job_source: Arc<dyn JobSource>,
    pub resumes: Arc<dyn ResumeArchive>,
}
