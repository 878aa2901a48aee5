use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{HarnessError, Result};

pub const DEFAULT_FEEDBACK_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

// Well-known environment keys
pub mod env_keys {
    pub const API_KEY: &str = "OPENAI_API_KEY";
    pub const MODEL: &str = "AI_FEEDBACK_MODEL";
    pub const MAX_CODE_LENGTH: &str = "AI_FEEDBACK_MAX_CODE_LENGTH";
    pub const ENDPOINT: &str = "AI_FEEDBACK_ENDPOINT";
    pub const TIMEOUT_SECS: &str = "AI_FEEDBACK_TIMEOUT_SECS";
    pub const PYTHON: &str = "AUTOGRADER_PYTHON";
    pub const SUBMISSION_MARKER: &str = "AUTOGRADER_SUBMISSION_MARKER";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraderConfig {
    pub autograder_dir: PathBuf,
    /// Interpreter used to run the assembled submission script.
    pub python: String,
    /// Substring identifying traceback frames that belong to the student.
    /// Defaults to the assembled script path.
    #[serde(default)]
    pub submission_marker: Option<String>,
    pub allowed_for_loops: usize,
    pub for_loop_penalty: f64,
    /// Also convert `source/solution.ipynb` next to the submission.
    #[serde(default)]
    pub convert_solution: bool,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            autograder_dir: PathBuf::from("/autograder"),
            python: "python3".to_string(),
            submission_marker: None,
            allowed_for_loops: 2,
            for_loop_penalty: 5.0,
            convert_solution: false,
        }
    }
}

impl GraderConfig {
    /// Relative directories are resolved against the current directory.
    pub fn new(autograder_dir: impl AsRef<Path>) -> Self {
        let dir = autograder_dir.as_ref();
        Self {
            autograder_dir: std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf()),
            ..Default::default()
        }
    }

    /// Apply `AUTOGRADER_*` overrides from the environment.
    pub fn with_env(mut self) -> Self {
        if let Ok(python) = std::env::var(env_keys::PYTHON) {
            self.python = python;
        }
        if let Ok(marker) = std::env::var(env_keys::SUBMISSION_MARKER) {
            self.submission_marker = Some(marker);
        }
        self
    }

    pub fn submission_dir(&self) -> PathBuf {
        self.autograder_dir.join("submission")
    }

    pub fn source_dir(&self) -> PathBuf {
        self.autograder_dir.join("source")
    }

    pub fn script_path(&self) -> PathBuf {
        self.source_dir().join("submission.py")
    }

    pub fn marker(&self) -> String {
        self.submission_marker
            .clone()
            .unwrap_or_else(|| self.script_path().display().to_string())
    }
}

/// Settings for the optional language-model feedback pass. Built once per
/// grading run and passed in explicitly.
#[derive(Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub model: String,
    /// Characters of student code included in the prompt.
    pub max_code_length: usize,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o".to_string(),
            max_code_length: 8000,
            endpoint: DEFAULT_FEEDBACK_ENDPOINT.to_string(),
            timeout_secs: 30,
            temperature: 0.3,
            max_tokens: 1500,
        }
    }
}

impl std::fmt::Debug for FeedbackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("max_code_length", &self.max_code_length)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl FeedbackConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let api_key = std::env::var(env_keys::API_KEY)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        Ok(Self {
            api_key,
            model: std::env::var(env_keys::MODEL).unwrap_or(defaults.model),
            max_code_length: parse_env(env_keys::MAX_CODE_LENGTH)?
                .unwrap_or(defaults.max_code_length),
            endpoint: std::env::var(env_keys::ENDPOINT).unwrap_or(defaults.endpoint),
            timeout_secs: parse_env(env_keys::TIMEOUT_SECS)?.unwrap_or(defaults.timeout_secs),
            ..defaults
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| HarnessError::Config(format!("{key} must be a number, got {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let config = GraderConfig::new("/tmp/ag");
        assert_eq!(config.script_path(), PathBuf::from("/tmp/ag/source/submission.py"));
        assert_eq!(config.marker(), "/tmp/ag/source/submission.py");
        assert_eq!(config.allowed_for_loops, 2);
    }

    #[test]
    fn test_relative_dir_is_made_absolute() {
        let config = GraderConfig::new("ag");
        let cwd = std::env::current_dir().unwrap();

        assert!(config.autograder_dir.is_absolute());
        assert_eq!(config.script_path(), cwd.join("ag/source/submission.py"));
        assert_eq!(config.marker(), cwd.join("ag/source/submission.py").display().to_string());
    }

    #[test]
    fn test_explicit_marker_wins() {
        let config = GraderConfig {
            submission_marker: Some("/autograder/source/submission.py".into()),
            ..GraderConfig::new("/elsewhere")
        };
        assert_eq!(config.marker(), "/autograder/source/submission.py");
    }

    #[test]
    fn test_feedback_disabled_without_key() {
        let config = FeedbackConfig::default();
        assert!(!config.is_enabled());
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(!format!("{:?}", FeedbackConfig {
            api_key: Some("sk-secret".into()),
            ..Default::default()
        })
        .contains("sk-secret"));
    }
}
