mod client;
mod code;
mod enhance;
mod error;
mod parse;
mod prompt;

pub use client::FeedbackClient;
pub use code::{student_code, TRUNCATION_NOTICE};
pub use enhance::{apply_feedback, enhance_results_with_ai_feedback};
pub use error::{FeedbackError, Result};
pub use parse::{parse_feedback, Feedback, PLACEHOLDER_OVERALL};
pub use prompt::{feedback_prompt, summarize_tests, TestSummary, SYSTEM_PROMPT};
