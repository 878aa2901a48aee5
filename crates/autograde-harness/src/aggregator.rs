use std::sync::LazyLock;
use std::time::Instant;

use autograde_core::{GraderConfig, ResultsPayload, Result, TestResult};
use regex::Regex;

use crate::extractor::make_script;
use crate::grader::run_graded;
use crate::oracle::{Oracle, ReferenceOracle};
use crate::python::PythonSubmission;
use crate::runner::convolution_checks;
use crate::submission::Submission;

/// Preamble placed ahead of the student's cells in the assembled script.
pub const IMPORTS: &str = r#"
import numpy as np
from typing import Tuple, Union

def to_tuple(
        x: Union[int, Tuple[int, int]]
        ) -> Tuple[int, int]:

    if isinstance(x, tuple):
        return x
    return (x, x)
"#;

static FOR_LOOP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*for\s+\w+\s+in\s+").expect("for loop pattern"));

pub fn count_for_loops(source: &str) -> usize {
    FOR_LOOP.find_iter(source).count()
}

/// Non-positive entry deducting `per_loop` for each loop beyond `allowed`.
pub fn loop_penalty(source: &str, allowed: usize, per_loop: f64) -> TestResult {
    let excess = count_for_loops(source).saturating_sub(allowed);
    TestResult {
        name: "for loops".to_string(),
        score: -(excess as f64 * per_loop),
        max_score: 0.0,
        output: format!("Number of additional for loops: {}", excess),
    }
}

/// Run every criterion against `submission`, then the loop penalty.
pub fn grade(
    source: &str,
    submission: &dyn Submission,
    oracle: &dyn Oracle,
    config: &GraderConfig,
) -> ResultsPayload {
    let start = Instant::now();
    let marker = config.marker();

    let mut tests: Vec<TestResult> = convolution_checks()
        .iter()
        .map(|check| run_graded(&check.criterion, &marker, || check.run(submission, oracle)))
        .collect();

    let penalty = loop_penalty(source, config.allowed_for_loops, config.for_loop_penalty);
    tracing::info!("{}", penalty.output);
    tests.push(penalty);

    ResultsPayload::new(tests, start.elapsed())
}

/// Extract, load and grade the submission under `config.autograder_dir`.
///
/// Only setup problems are errors here; anything the student's code does
/// wrong ends up as a score.
pub fn grade_directory(config: &GraderConfig) -> Result<ResultsPayload> {
    let source = make_script(config, IMPORTS)?;
    let submission = PythonSubmission::load(&config.python, &config.script_path())?;

    tracing::info!(
        "Grading {} (python: {})",
        submission.script_path().display(),
        config.python
    );
    Ok(grade(&source, &submission, &ReferenceOracle, config))
}
