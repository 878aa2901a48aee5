// Domain modules
pub mod config;
pub mod criterion;
pub mod error;
pub mod results;

pub use config::{env_keys, FeedbackConfig, GraderConfig, DEFAULT_FEEDBACK_ENDPOINT};
pub use criterion::{Conv2dCase, PoolCase, Score, Size2, TestCriterion};
pub use error::{HarnessError, Result};
pub use results::{results_path, save_results, ResultsPayload, TestResult, PASS_MESSAGE};
