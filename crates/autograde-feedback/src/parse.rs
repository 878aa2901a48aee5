use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

pub const PLACEHOLDER_OVERALL: &str = "Unable to generate detailed feedback.";

static OVERALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)overall[:\s]+(.+?)(?:tests:|$)").expect("overall pattern")
});

/// Structured model feedback: one overall paragraph plus notes keyed by
/// (approximate) test name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Feedback {
    #[serde(default)]
    pub overall: Option<String>,
    #[serde(default)]
    pub tests: BTreeMap<String, String>,
}

impl Feedback {
    pub fn placeholder() -> Self {
        Self {
            overall: Some(PLACEHOLDER_OVERALL.to_string()),
            tests: BTreeMap::new(),
        }
    }
}

type Strategy = fn(&str) -> Option<Feedback>;

const STRATEGIES: &[Strategy] = &[embedded_json, labelled_text];

/// Interpret a model reply. Never fails; falls back to
/// [`Feedback::placeholder`].
pub fn parse_feedback(text: &str) -> Feedback {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(text))
        .unwrap_or_else(Feedback::placeholder)
}

/// The span from the first `{` to the last `}`, parsed as JSON.
fn embedded_json(text: &str) -> Option<Feedback> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

/// `overall: ...` paragraph plus `name: note` lines. Lines without a label
/// continue the previous note.
fn labelled_text(text: &str) -> Option<Feedback> {
    let overall = OVERALL
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty());

    let mut tests: Vec<(String, String)> = Vec::new();
    let mut current: Option<usize> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match trimmed.split_once(':') {
            Some((label, note)) if !label.trim().is_empty() => {
                let label = label.trim();
                if label.eq_ignore_ascii_case("overall") || label.eq_ignore_ascii_case("tests") {
                    current = None;
                    continue;
                }
                tests.push((label.to_string(), note.trim().to_string()));
                current = Some(tests.len() - 1);
            }
            _ => {
                if let Some(i) = current {
                    let note = &mut tests[i].1;
                    if !note.is_empty() {
                        note.push('\n');
                    }
                    note.push_str(trimmed);
                }
            }
        }
    }

    let tests: BTreeMap<String, String> =
        tests.into_iter().filter(|(_, note)| !note.is_empty()).collect();

    if overall.is_none() && tests.is_empty() {
        return None;
    }
    Some(Feedback { overall, tests })
}
