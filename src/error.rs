use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HistoryError>;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not a benchmark data file: {0}")]
    Malformed(String),
    #[error("no suite named \"{0}\"")]
    UnknownSuite(String),
    #[error("suite \"{0}\" holds fewer than two runs")]
    NotEnoughRuns(String),
    #[error("integrity check failed: {count} error(s); first: {first}")]
    Integrity { count: usize, first: String },
}
