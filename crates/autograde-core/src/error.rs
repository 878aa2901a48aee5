use std::path::PathBuf;

use thiserror::Error;

/// Faults in the grading setup itself. These abort the run; they are never
/// turned into a zero score.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Expected 1 {expected} in {dir}, found {found}")]
    SubmissionCount {
        dir: PathBuf,
        expected: &'static str,
        found: usize,
    },

    #[error("Found import statement in your code. Please remove it!")]
    ImportStatement,

    #[error("Malformed notebook {path}: {reason}")]
    Notebook { path: PathBuf, reason: String },

    #[error("Failed to import submission: {0}")]
    SubmissionImport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
