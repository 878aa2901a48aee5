use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use autograde_core::{Score, TestCriterion, TestResult};

use crate::Fault;

/// Keep only the parts of a trace that point into the student's own file.
///
/// A line containing `marker` names a frame (`File "...", line N, in f`); the
/// text after its last comma (`in f`) becomes the location and the following
/// line (the offending source) is paired with it. The final line, the exception
/// summary, is always kept. If nothing matches, only that summary survives.
pub fn sanitize_trace(trace: &str, marker: &str) -> String {
    let lines: Vec<&str> = trace.trim_end().lines().collect();
    let mut kept = Vec::new();
    let mut location: Option<String> = None;

    for line in &lines {
        if !marker.is_empty() && line.contains(marker) {
            let tail = line.rsplit(',').next().unwrap_or(line).trim();
            location = Some(format!("{}:", tail));
        } else if let Some(loc) = location.take() {
            kept.push(format!("{}\n{}", loc, line));
        }
    }

    kept.push(lines.last().copied().unwrap_or_default().to_string());
    kept.join(&format!("\n{}\n", "-".repeat(50)))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return s.to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "unknown panic".to_string()
}

/// Run one graded check. Never fails: a fault (or panic) becomes a zero
/// score carrying the sanitized trace.
pub fn run_graded<F>(criterion: &TestCriterion, marker: &str, test_fn: F) -> TestResult
where
    F: FnOnce() -> Result<Score, Fault>,
{
    tracing::info!("{}", criterion.action);

    let outcome = panic::catch_unwind(AssertUnwindSafe(test_fn))
        .unwrap_or_else(|payload| Err(Fault::Panicked(panic_message(payload.as_ref()))));

    match outcome {
        Ok(score) => {
            tracing::info!(
                "{}: {}/{}",
                criterion.name,
                score.score,
                criterion.max_score
            );
            TestResult::passed(criterion, score)
        }
        Err(fault) => {
            tracing::warn!("{} failed: {}", criterion.name, fault);
            TestResult::failed(criterion, sanitize_trace(&fault.trace(), marker))
        }
    }
}

/// Wrap `test_fn` so every call goes through [`run_graded`].
pub fn grader<'a, S: ?Sized + 'a, F>(
    criterion: TestCriterion,
    marker: &'a str,
    test_fn: F,
) -> impl Fn(&S) -> TestResult + 'a
where
    F: Fn(&S) -> Result<Score, Fault> + 'a,
{
    move |subject: &S| run_graded(&criterion, marker, || test_fn(subject))
}
