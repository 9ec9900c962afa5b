// Resume-to-job matching engine.
// Tokenizer and keyword overlap are pure; scoring goes through the ScoringAdapter
// seam; the batch matcher and ranker assemble and order MatchRecords.

pub mod batch;
pub mod handlers;
pub mod keywords;
pub mod ranker;
pub mod records;
pub mod scoring;
pub mod tokenizer;
