use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use autograde_harness::extractor::{files_with_extension, load_notebook, AUTOGRADED_MARKER};
use regex::Regex;

pub const TRUNCATION_NOTICE: &str = "\n\n[Code truncated for brevity...]";

static DIVIDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#{50,}").expect("divider pattern"));

fn truncate_chars(text: &str, max_len: usize) -> &str {
    match text.char_indices().nth(max_len) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// The student code shown to the model, at most `max_len` characters.
///
/// Prefers the assembled `source/submission.py`; otherwise falls back to the
/// graded cells of the first readable notebook under `submission/`. Returns
/// an empty string when neither exists.
pub fn student_code(autograder_dir: &Path, max_len: usize) -> String {
    let script = autograder_dir.join("source").join("submission.py");
    if let Ok(text) = fs::read_to_string(&script) {
        let cleaned = DIVIDER.replace_all(&text, "\n");
        return truncate_chars(&cleaned, max_len).to_string();
    }

    let notebooks =
        files_with_extension(&autograder_dir.join("submission"), "ipynb").unwrap_or_default();

    let mut code = String::new();
    for path in notebooks {
        let cells = match load_notebook(&path) {
            Ok(cells) => cells,
            Err(e) => {
                tracing::debug!("Skipping unreadable notebook {}: {}", path.display(), e);
                continue;
            }
        };

        let mut picked: Vec<&str> = Vec::new();
        for cell in &cells {
            if cell.first_line().contains(AUTOGRADED_MARKER) || picked.is_empty() {
                picked.push(&cell.source);
            }
        }
        code = picked.join("\n\n");
        break;
    }

    if code.chars().count() > max_len {
        return format!("{}{}", truncate_chars(&code, max_len), TRUNCATION_NOTICE);
    }
    code
}
