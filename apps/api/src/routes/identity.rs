use std::convert::Infallible;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::errors::AppError;
use crate::models::user::Principal;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Caller identity forwarded by the identity collaborator.
///
/// `None` when no user id header is present; the authorization gate decides
/// what an anonymous caller may do.
pub struct Caller(pub Option<Principal>);

impl Caller {
    /// Session-backed routes need an identified caller; anonymous callers keep
    /// no state.
    pub fn require(self) -> Result<Principal, AppError> {
        self.0.ok_or_else(|| {
            AppError::Authorization("Please log in to use the job matcher.".to_string())
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Ok(Caller(header(USER_ID_HEADER).map(|user_id| Principal {
            user_id,
            email: header(USER_EMAIL_HEADER),
            role: header(USER_ROLE_HEADER).map(|r| r.to_ascii_lowercase()),
        })))
    }
}
