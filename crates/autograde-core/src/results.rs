use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Result, Score, TestCriterion};

/// Output attached to a criterion that passed without comment.
pub const PASS_MESSAGE: &str = "All checks passed.";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub score: f64,
    pub max_score: f64,
    #[serde(default)]
    pub output: String,
}

impl TestResult {
    pub fn passed(criterion: &TestCriterion, score: Score) -> Self {
        Self {
            name: criterion.name.clone(),
            score: score.score,
            max_score: criterion.max_score,
            output: score.output.unwrap_or_else(|| PASS_MESSAGE.to_string()),
        }
    }

    pub fn failed(criterion: &TestCriterion, output: String) -> Self {
        Self {
            name: criterion.name.clone(),
            score: 0.0,
            max_score: criterion.max_score,
            output,
        }
    }
}

/// The document handed back to the grading platform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultsPayload {
    pub tests: Vec<TestResult>,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub execution_time: u64,
}

impl ResultsPayload {
    pub fn new(tests: Vec<TestResult>, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        Self {
            tests,
            output: format!("autograder runtime: {:.2} seconds", secs),
            execution_time: secs.round() as u64,
        }
    }

    pub fn total_score(&self) -> f64 {
        self.tests.iter().map(|t| t.score).sum()
    }

    pub fn total_max_score(&self) -> f64 {
        self.tests.iter().map(|t| t.max_score).sum()
    }

    /// Serialize with four-space indentation.
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

pub fn results_path(autograder_dir: &Path) -> PathBuf {
    autograder_dir.join("results").join("results.json")
}

/// Write `<dir>/results/results.json`, creating the directory if needed.
pub fn save_results(results: &ResultsPayload, autograder_dir: &Path) -> Result<PathBuf> {
    let path = results_path(autograder_dir);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, results.to_json()?)?;
    tracing::info!(
        "Results written to {} ({}/{})",
        path.display(),
        results.total_score(),
        results.total_max_score()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ResultsPayload {
        let criterion = TestCriterion::new("testing simple convolution", "simple convolution", 10.0);
        ResultsPayload::new(
            vec![
                TestResult::passed(&criterion, Score::full(&criterion)),
                TestResult {
                    name: "for loops".into(),
                    score: -5.0,
                    max_score: 0.0,
                    output: "Number of additional for loops: 1".into(),
                },
            ],
            Duration::from_millis(2340),
        )
    }

    #[test]
    fn test_summary_line_and_rounded_time() {
        let payload = sample();
        assert_eq!(payload.output, "autograder runtime: 2.34 seconds");
        assert_eq!(payload.execution_time, 2);
        assert_eq!(payload.total_score(), 5.0);
        assert_eq!(payload.total_max_score(), 10.0);
    }

    #[test]
    fn test_json_uses_four_space_indent() {
        let json = sample().to_json().unwrap();
        assert!(json.starts_with("{\n    \"tests\": [\n        {"));
        assert!(json.contains("\"name\": \"simple convolution\""));
        assert!(json.contains("\"output\": \"All checks passed.\""));
    }

    #[test]
    fn test_save_creates_results_dir() {
        let dir = tempfile::tempdir().unwrap();
        let payload = sample();

        let path = save_results(&payload, dir.path()).unwrap();

        assert_eq!(path, dir.path().join("results/results.json"));
        let saved: ResultsPayload =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, payload);
    }
}
