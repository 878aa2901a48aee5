use std::path::Path;

use autograde_core::{FeedbackConfig, ResultsPayload};
use tracing::{info, warn};

use crate::client::FeedbackClient;
use crate::code::student_code;
use crate::parse::{parse_feedback, Feedback};
use crate::prompt::{feedback_prompt, summarize_tests, SYSTEM_PROMPT};
use crate::Result;

const OVERALL_BANNER: &str = "\n\n=== AI FEEDBACK ===\n";
const TEST_BANNER: &str = "\n\n📝 AI Feedback:\n";

fn score_band(score: f64, max_score: f64) -> &'static str {
    let percentage = score / max_score * 100.0;
    if percentage >= 90.0 {
        "Good implementation for this section."
    } else if percentage >= 50.0 {
        "Partial credit earned. Review the test requirements and error messages."
    } else {
        "Significant issues detected. Check the error output and revise your approach."
    }
}

fn matching_note<'a>(feedback: &'a Feedback, test_name: &str) -> Option<&'a str> {
    let name = test_name.to_lowercase();
    feedback
        .tests
        .iter()
        .find(|(key, _)| {
            let key = key.to_lowercase();
            key.contains(&name) || name.contains(&key)
        })
        .map(|(_, note)| note.as_str())
}

/// Append `feedback` to the payload's output and to every test's output.
/// Scores are never touched.
pub fn apply_feedback(mut results: ResultsPayload, feedback: &Feedback) -> ResultsPayload {
    if let Some(overall) = &feedback.overall {
        results.output.push_str(OVERALL_BANNER);
        results.output.push_str(overall);
    }

    for test in &mut results.tests {
        let note = matching_note(feedback, &test.name)
            .filter(|n| !n.is_empty())
            .or_else(|| (test.max_score > 0.0).then(|| score_band(test.score, test.max_score)));

        if let Some(note) = note {
            test.output.push_str(TEST_BANNER);
            test.output.push_str(note);
        }
    }

    results
}

async fn generate_feedback(
    results: &ResultsPayload,
    autograder_dir: &Path,
    config: &FeedbackConfig,
) -> Result<Feedback> {
    let code = student_code(autograder_dir, config.max_code_length);
    let prompt = feedback_prompt(&summarize_tests(results), &code);

    let client = FeedbackClient::new(config.clone())?;
    let reply = client.request(SYSTEM_PROMPT, &prompt).await?;
    Ok(parse_feedback(&reply))
}

/// Ask the model for feedback and fold it into `results`.
///
/// Without an API key, or on any failure, the payload comes back exactly as
/// it went in.
pub async fn enhance_results_with_ai_feedback(
    results: ResultsPayload,
    autograder_dir: &Path,
    config: &FeedbackConfig,
) -> ResultsPayload {
    if !config.is_enabled() {
        info!("AI feedback: no API key configured, skipping");
        return results;
    }

    match generate_feedback(&results, autograder_dir, config).await {
        Ok(feedback) => {
            info!("AI feedback added to {} tests", results.tests.len());
            apply_feedback(results, &feedback)
        }
        Err(e) => {
            warn!("AI feedback error: {}", e);
            results
        }
    }
}
