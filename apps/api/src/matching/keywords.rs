//! Keyword overlap between a job description and a resume.
//!
//! Pure and deterministic: terms come out in the order they first appear in
//! the job description token stream.

use std::collections::HashSet;

use crate::matching::tokenizer::{token_set, tokenize};

/// Terms must be strictly longer than this many characters to count as significant.
pub const MIN_TERM_EXCLUSIVE: usize = 3;

/// Shared significant terms between `job_description` and `resume_text`.
///
/// Empty text on either side yields an empty result.
pub fn extract_matching_terms(job_description: &str, resume_text: &str) -> Vec<String> {
    let resume_tokens = token_set(resume_text);
    if resume_tokens.is_empty() {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    tokenize(job_description)
        .into_iter()
        .filter(|token| token.chars().count() > MIN_TERM_EXCLUSIVE)
        .filter(|token| resume_tokens.contains(token))
        .filter(|token| seen.insert(token.clone()))
        .collect()
}
