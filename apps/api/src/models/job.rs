use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Origin tag carried by postings that live in the platform's own job store.
pub const INTERNAL_SOURCE: &str = "internal";

/// A job posting as supplied by a job-source collaborator.
///
/// Field aliases accept the column names used by the legacy job store and the
/// external listing importer, so lists from either origin deserialize as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JobRecord {
    #[serde(default, alias = "Job_ID")]
    pub id: String,
    #[serde(default, alias = "Job_Title")]
    pub title: String,
    #[serde(default, alias = "Company_Name")]
    pub company: String,
    #[serde(default, alias = "Job_Description")]
    pub description: String,
    #[serde(default, alias = "Required_Skills")]
    pub required_skills: Option<String>,
    #[serde(default, alias = "Education_Level")]
    pub education_level: Option<String>,
    #[serde(default, alias = "Experience_Required")]
    pub experience_required: Option<String>,
    #[serde(default, alias = "Location")]
    pub location: Option<String>,
    #[serde(default, alias = "Job_URL")]
    pub job_url: Option<String>,
    #[serde(default, alias = "Source")]
    pub source: Option<String>,
    /// Owning organization's user id. Required for internal postings.
    #[serde(default, alias = "companyUserId")]
    pub owner_id: Option<String>,
}

impl JobRecord {
    pub fn is_internal(&self) -> bool {
        self.source
            .as_deref()
            .map(|s| s.trim().eq_ignore_ascii_case(INTERNAL_SOURCE))
            .unwrap_or(false)
    }

    /// Owner id, treating blank strings as absent.
    pub fn owner(&self) -> Option<&str> {
        non_blank(self.owner_id.as_deref())
    }

    pub fn url(&self) -> Option<&str> {
        non_blank(self.job_url.as_deref())
    }

    pub fn source_tag(&self) -> Option<&str> {
        non_blank(self.source.as_deref())
    }

    /// Names of the fields a record needs before it can be matched.
    pub fn missing_match_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.id.trim().is_empty() {
            missing.push("id");
        }
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.description.trim().is_empty() {
            missing.push("description");
        }
        missing
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
