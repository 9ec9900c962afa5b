//! Ordered eligibility gates for an apply attempt. First failure wins.

use tracing::warn;

use crate::errors::AppError;
use crate::models::job::{non_blank, JobRecord};
use crate::models::user::Principal;
use crate::resume::ResumeInput;

/// Everything the gates look at.
#[derive(Debug, Clone, Copy)]
pub struct ApplyContext<'a> {
    pub principal: Option<&'a Principal>,
    pub resume: Option<&'a ResumeInput>,
    pub job: &'a JobRecord,
}

/// A named predicate. Rules run in declaration order.
pub struct Rule {
    pub name: &'static str,
    pub check: fn(&ApplyContext<'_>) -> Result<(), AppError>,
}

pub const RULES: &[Rule] = &[
    Rule {
        name: "candidate_role",
        check: require_candidate,
    },
    Rule {
        name: "resume_loaded",
        check: require_resume,
    },
    Rule {
        name: "internal_job_owner",
        check: require_owner_for_internal_job,
    },
    Rule {
        name: "required_fields",
        check: require_application_fields,
    },
];

/// Runs every rule in order and returns the first rejection.
pub fn validate_application(ctx: &ApplyContext<'_>) -> Result<(), AppError> {
    for rule in RULES {
        if let Err(err) = (rule.check)(ctx) {
            warn!(
                "Application for job '{}' rejected by rule {}: {}",
                ctx.job.id, rule.name, err
            );
            return Err(err);
        }
    }
    Ok(())
}

fn require_candidate(ctx: &ApplyContext<'_>) -> Result<(), AppError> {
    require_candidate_role(ctx.principal)
}

/// The first gate on its own, for callers that must check the role before
/// resolving the job.
pub fn require_candidate_role(principal: Option<&Principal>) -> Result<(), AppError> {
    match principal {
        Some(principal) if principal.is_candidate() => Ok(()),
        _ => Err(AppError::Authorization(
            "Please log in as a candidate to apply for jobs.".to_string(),
        )),
    }
}

fn require_resume(ctx: &ApplyContext<'_>) -> Result<(), AppError> {
    match ctx.resume {
        Some(resume) if resume.has_text() => Ok(()),
        _ => Err(AppError::MissingInput(
            "Please upload your resume first before applying.".to_string(),
        )),
    }
}

fn require_owner_for_internal_job(ctx: &ApplyContext<'_>) -> Result<(), AppError> {
    if ctx.job.is_internal() && ctx.job.owner().is_none() {
        return Err(AppError::DataIntegrity(
            "Cannot apply: this internal job has incomplete data (missing company id). \
             Please contact the administrator."
                .to_string(),
        ));
    }
    Ok(())
}

fn require_application_fields(ctx: &ApplyContext<'_>) -> Result<(), AppError> {
    let user_id = ctx.principal.map(|p| p.user_id.as_str());
    let email = ctx.principal.and_then(|p| p.email.as_deref());

    let fields = [
        ("job_id", non_blank(Some(ctx.job.id.as_str()))),
        ("candidate_user_id", non_blank(user_id)),
        ("candidate_email", non_blank(email)),
        ("job_title", non_blank(Some(ctx.job.title.as_str()))),
        ("job_source", ctx.job.source_tag()),
    ];
    let missing: Vec<String> = fields
        .iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation { missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> Principal {
        Principal {
            user_id: "cand-1".to_string(),
            email: Some("cand@example.com".to_string()),
            role: Some("candidate".to_string()),
        }
    }

    fn internal_job() -> JobRecord {
        JobRecord {
            id: "j1".to_string(),
            title: "Cloud Engineer".to_string(),
            description: "Kubernetes".to_string(),
            source: Some("internal".to_string()),
            owner_id: Some("company-1".to_string()),
            ..Default::default()
        }
    }

    fn resume() -> ResumeInput {
        ResumeInput::from_text("cv.txt", "python cloud")
    }

    #[test]
    fn test_rule_order_is_fixed() {
        let names: Vec<&str> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec!["candidate_role", "resume_loaded", "internal_job_owner", "required_fields"]
        );
    }

    #[test]
    fn test_valid_application_passes() {
        let (p, r, j) = (candidate(), resume(), internal_job());
        let ctx = ApplyContext {
            principal: Some(&p),
            resume: Some(&r),
            job: &j,
        };
        assert!(validate_application(&ctx).is_ok());
    }

    #[test]
    fn test_missing_principal_is_authorization_error() {
        let j = internal_job();
        let ctx = ApplyContext {
            principal: None,
            resume: None,
            job: &j,
        };
        assert!(matches!(validate_application(&ctx), Err(AppError::Authorization(_))));
    }

    #[test]
    fn test_company_role_is_rejected() {
        let p = Principal {
            role: Some("company".to_string()),
            ..candidate()
        };
        let (r, j) = (resume(), internal_job());
        let ctx = ApplyContext {
            principal: Some(&p),
            resume: Some(&r),
            job: &j,
        };
        assert!(matches!(validate_application(&ctx), Err(AppError::Authorization(_))));
    }

    #[test]
    fn test_missing_resume_wins_over_later_rules() {
        let p = candidate();
        let j = JobRecord {
            owner_id: None,
            ..internal_job()
        };
        let ctx = ApplyContext {
            principal: Some(&p),
            resume: None,
            job: &j,
        };
        assert!(matches!(validate_application(&ctx), Err(AppError::MissingInput(_))));
    }

    #[test]
    fn test_internal_job_without_owner_is_integrity_error() {
        let (p, r) = (candidate(), resume());
        let j = JobRecord {
            owner_id: Some("  ".to_string()),
            ..internal_job()
        };
        let ctx = ApplyContext {
            principal: Some(&p),
            resume: Some(&r),
            job: &j,
        };
        assert!(matches!(validate_application(&ctx), Err(AppError::DataIntegrity(_))));
    }

    #[test]
    fn test_external_job_without_owner_is_allowed() {
        let (p, r) = (candidate(), resume());
        let j = JobRecord {
            source: Some("TopJobs.lk".to_string()),
            owner_id: None,
            ..internal_job()
        };
        let ctx = ApplyContext {
            principal: Some(&p),
            resume: Some(&r),
            job: &j,
        };
        assert!(validate_application(&ctx).is_ok());
    }

    #[test]
    fn test_missing_fields_are_listed() {
        let p = Principal {
            email: None,
            ..candidate()
        };
        let r = resume();
        let j = JobRecord {
            source: None,
            ..internal_job()
        };
        let ctx = ApplyContext {
            principal: Some(&p),
            resume: Some(&r),
            job: &j,
        };
        match validate_application(&ctx) {
            Err(AppError::Validation { missing }) => {
                assert_eq!(missing, vec!["candidate_email", "job_source"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
