use serde::{Deserialize, Serialize};

/// Role name the identity collaborator assigns to job seekers.
pub const CANDIDATE_ROLE: &str = "candidate";

/// Authenticated caller as resolved by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl Principal {
    pub fn is_candidate(&self) -> bool {
        self.role.as_deref() == Some(CANDIDATE_ROLE)
    }
}
