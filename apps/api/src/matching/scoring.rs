//! Scoring Adapter: pluggable relevance scorer for (resume, job description) pairs.
//!
//! Default: `TfIdfScorer` (local, deterministic, no network).
//! Remote: `RemoteScorer` calls a similarity service and also serves the
//! aggregate batch endpoint used by the `batch` scheduling strategy.
//!
//! Every raw score passes through `normalize_score` before it reaches a MatchRecord.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::matching::tokenizer::tokenize;
use crate::models::job::JobRecord;

pub const MAX_SCORE: f64 = 100.0;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Scoring API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Scoring API returned a non-finite score: {0}")]
    NonFinite(f64),

    #[error("Scoring backend returned no result for job {0}")]
    MissingResult(String),
}

/// Scores one resume against one job description. Range: 0 – 100.
///
/// Carried in `BatchMatcher` as `Arc<dyn ScoringAdapter>`.
#[async_trait]
pub trait ScoringAdapter: Send + Sync {
    async fn score(&self, resume_text: &str, job_description: &str) -> Result<f64, ScoringError>;

    /// Backend label for logs: "tfidf" | "remote".
    fn backend(&self) -> &'static str;
}

/// One entry of an aggregate batch response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchScore {
    pub job_id: String,
    pub score: f64,
}

/// Aggregate scoring: one call for a resume and a whole job list.
#[async_trait]
pub trait BatchScoring: Send + Sync {
    async fn score_batch(
        &self,
        resume_text: &str,
        jobs: &[JobRecord],
    ) -> Result<Vec<BatchScore>, ScoringError>;
}

/// Clamps to [0, 100] and rounds to two decimals. Non-finite input is rejected.
pub fn normalize_score(raw: f64) -> Result<f64, ScoringError> {
    if !raw.is_finite() {
        return Err(ScoringError::NonFinite(raw));
    }
    Ok((raw.clamp(0.0, MAX_SCORE) * 100.0).round() / 100.0)
}

// ────────────────────────────────────────────────────────────────────────────
// TfIdfScorer: local default
// ────────────────────────────────────────────────────────────────────────────

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "etc", "few",
    "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its",
    "itself", "just", "me", "more", "most", "must", "my", "myself", "no", "nor", "not", "now",
    "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over",
    "own", "per", "same", "she", "should", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those", "through",
    "to", "too", "under", "until", "up", "us", "very", "was", "we", "were", "what", "when",
    "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your",
    "yours", "yourself", "yourselves",
];

/// TF-IDF weighted cosine similarity over the two-document corpus {resume, job}.
///
/// Algorithm:
/// 1. Tokenize both texts, drop stop words and single-character tokens
/// 2. idf(t) = ln((1 + n) / (1 + df(t))) + 1, with n = 2
/// 3. weight = raw term count × idf, vectors L2-normalized
/// 4. score = cosine × 100
#[derive(Debug, Default, Clone, Copy)]
pub struct TfIdfScorer;

#[async_trait]
impl ScoringAdapter for TfIdfScorer {
    async fn score(&self, resume_text: &str, job_description: &str) -> Result<f64, ScoringError> {
        Ok(tfidf_similarity(resume_text, job_description))
    }

    fn backend(&self) -> &'static str {
        "tfidf"
    }
}

fn term_counts(text: &str) -> HashMap<String, f64> {
    let mut counts = HashMap::new();
    for token in tokenize(text) {
        if token.chars().count() < 2 || STOP_WORDS.contains(&token.as_str()) {
            continue;
        }
        *counts.entry(token).or_insert(0.0) += 1.0;
    }
    counts
}

fn weighted_vector(
    counts: &HashMap<String, f64>,
    idf: &HashMap<&str, f64>,
) -> HashMap<String, f64> {
    let mut vector: HashMap<String, f64> = counts
        .iter()
        .map(|(term, tf)| (term.clone(), tf * idf.get(term.as_str()).copied().unwrap_or(1.0)))
        .collect();
    let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for weight in vector.values_mut() {
            *weight /= norm;
        }
    }
    vector
}

/// Similarity in [0, 100], rounded to two decimals.
pub fn tfidf_similarity(a: &str, b: &str) -> f64 {
    let counts_a = term_counts(a);
    let counts_b = term_counts(b);
    if counts_a.is_empty() || counts_b.is_empty() {
        return 0.0;
    }

    let vocabulary: HashSet<&str> = counts_a
        .keys()
        .chain(counts_b.keys())
        .map(String::as_str)
        .collect();
    let n_docs = 2.0_f64;
    let idf: HashMap<&str, f64> = vocabulary
        .into_iter()
        .map(|term| {
            let df = [&counts_a, &counts_b]
                .iter()
                .filter(|counts| counts.contains_key(term))
                .count() as f64;
            (term, ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0)
        })
        .collect();

    let vec_a = weighted_vector(&counts_a, &idf);
    let vec_b = weighted_vector(&counts_b, &idf);
    let cosine: f64 = vec_a
        .iter()
        .filter_map(|(term, wa)| vec_b.get(term).map(|wb| wa * wb))
        .sum();

    ((cosine * MAX_SCORE).clamp(0.0, MAX_SCORE) * 100.0).round() / 100.0
}

// ────────────────────────────────────────────────────────────────────────────
// RemoteScorer: similarity service over HTTP
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ScoreRequest<'a> {
    resume_text: &'a str,
    job_description: &'a str,
}

/// Some deployments also echo the text they extracted; that field is ignored.
#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: f64,
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    resume_text: &'a str,
    jobs: &'a [JobRecord],
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
    results: Vec<BatchScore>,
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    message: String,
}

#[derive(Clone)]
pub struct RemoteScorer {
    client: Client,
    base_url: String,
}

impl RemoteScorer {
    pub fn new(base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ScoringError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<RemoteError>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            warn!("Scoring API {} returned {}: {}", url, status, message);
            return Err(ScoringError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ScoringAdapter for RemoteScorer {
    async fn score(&self, resume_text: &str, job_description: &str) -> Result<f64, ScoringError> {
        let response: ScoreResponse = self
            .post(
                "/api/v1/score",
                &ScoreRequest {
                    resume_text,
                    job_description,
                },
            )
            .await?;
        debug!("Remote score received: {}", response.score);
        Ok(response.score)
    }

    fn backend(&self) -> &'static str {
        "remote"
    }
}

#[async_trait]
impl BatchScoring for RemoteScorer {
    async fn score_batch(
        &self,
        resume_text: &str,
        jobs: &[JobRecord],
    ) -> Result<Vec<BatchScore>, ScoringError> {
        let response: BatchResponse = self
            .post("/api/v1/match-batch", &BatchRequest { resume_text, jobs })
            .await?;
        Ok(response.results)
    }
}
