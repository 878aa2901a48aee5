//! Pulls graded code out of a submitted notebook (or percent-format script)
//! and assembles it into one loadable script.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use autograde_core::{GraderConfig, HarnessError, Result};
use regex::Regex;
use serde::Deserialize;

pub const AUTOGRADED_MARKER: &str = "# AUTOGRADED";

static DOCSTRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)'''.*?'''|""".*?""""#).expect("docstring pattern"));
static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#.*").expect("comment pattern"));
static IMPORT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bimport\b").expect("import pattern"));
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("blank line pattern"));
static PRINT_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^([ \t]*)print[ \t]*\((.*)\)[ \t]*$").expect("print pattern")
});

/// One code cell, as written by the student.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    pub source: String,
}

impl Cell {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn first_line(&self) -> &str {
        self.source.lines().next().unwrap_or("")
    }

    pub fn is_autograded(&self) -> bool {
        self.first_line().starts_with(AUTOGRADED_MARKER)
    }
}

// =============================================================================
// Notebook input
// =============================================================================

#[derive(Debug, Deserialize)]
struct Notebook {
    cells: Vec<NotebookCell>,
}

#[derive(Debug, Deserialize)]
struct NotebookCell {
    cell_type: String,
    #[serde(default)]
    source: CellSource,
}

/// nbformat allows either a list of lines or one string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CellSource {
    Lines(Vec<String>),
    Text(String),
}

impl Default for CellSource {
    fn default() -> Self {
        CellSource::Lines(Vec::new())
    }
}

impl CellSource {
    fn into_text(self) -> String {
        match self {
            CellSource::Lines(lines) => lines.concat(),
            CellSource::Text(text) => text,
        }
    }
}

/// Parse notebook JSON and return its non-empty code cells in order.
pub fn parse_notebook(json: &str, path: &Path) -> Result<Vec<Cell>> {
    let notebook: Notebook = serde_json::from_str(json).map_err(|e| HarnessError::Notebook {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(notebook
        .cells
        .into_iter()
        .filter(|c| c.cell_type == "code")
        .map(|c| c.source.into_text())
        .filter(|s| !s.is_empty())
        .map(Cell::new)
        .collect())
}

pub fn load_notebook(path: &Path) -> Result<Vec<Cell>> {
    let json = fs::read_to_string(path)?;
    parse_notebook(&json, path)
}

/// Split a jupytext percent-format script on its `# %%` markers. Markdown
/// cells are dropped.
pub fn parse_percent_script(text: &str) -> Vec<Cell> {
    let mut cells = Vec::new();
    let mut current: Option<String> = Some(String::new());

    for line in text.split_inclusive('\n') {
        if line.starts_with("# %%") {
            if let Some(body) = current.take().filter(|b| !b.trim().is_empty()) {
                cells.push(Cell::new(body));
            }
            let is_markdown = line.contains("[markdown]");
            current = (!is_markdown).then(String::new);
            continue;
        }
        if let Some(body) = current.as_mut() {
            body.push_str(line);
        }
    }

    if let Some(body) = current.filter(|b| !b.trim().is_empty()) {
        cells.push(Cell::new(body));
    }
    cells
}

// =============================================================================
// Assembly
// =============================================================================

fn sanitize_cell(source: &str) -> String {
    let without_docstrings = DOCSTRING.replace_all(source, "");
    COMMENT.replace_all(&without_docstrings, "").into_owned()
}

/// Assemble cells into a single script.
///
/// With `autograded_only`, only cells opened by `# AUTOGRADED` survive, the
/// harness `imports` are placed first, and any remaining `import` is a
/// harness fault.
pub fn to_script(cells: &[Cell], imports: &str, autograded_only: bool) -> Result<String> {
    let mut parts = Vec::with_capacity(cells.len() + 1);
    if autograded_only {
        parts.push(imports.to_string());
    }

    for cell in cells {
        if autograded_only && !cell.is_autograded() {
            continue;
        }
        let source = sanitize_cell(&cell.source);
        if autograded_only && IMPORT.is_match(&source) {
            return Err(HarnessError::ImportStatement);
        }
        parts.push(source);
    }

    let separator = format!("\n\n{}\n\n", "#".repeat(100));
    let script = parts.join(&separator);
    let script = BLANK_RUN.replace_all(&script, "\n\n");
    Ok(PRINT_CALL.replace_all(&script, "${1}pass").into_owned())
}

fn load_cells(path: &Path) -> Result<Vec<Cell>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ipynb") => load_notebook(path),
        _ => Ok(parse_percent_script(&fs::read_to_string(path)?)),
    }
}

/// Read `source_path`, assemble it and overwrite `script_path`.
pub fn convert(
    source_path: &Path,
    script_path: &Path,
    imports: &str,
    autograded_only: bool,
) -> Result<String> {
    let cells = load_cells(source_path)?;
    let script = to_script(&cells, imports, autograded_only)?;

    if let Some(parent) = script_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(script_path, &script)?;

    tracing::debug!(
        "Converted {} ({} cells) -> {}",
        source_path.display(),
        cells.len(),
        script_path.display()
    );
    Ok(script)
}

pub fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Locate the single submitted notebook (or, failing that, the single
/// submitted script).
pub fn find_submission(submission_dir: &Path) -> Result<PathBuf> {
    let notebooks = files_with_extension(submission_dir, "ipynb")?;
    if !notebooks.is_empty() {
        return single(notebooks, submission_dir, "notebook");
    }
    let scripts = files_with_extension(submission_dir, "py")?;
    single(scripts, submission_dir, "notebook or script")
}

fn single(mut found: Vec<PathBuf>, dir: &Path, expected: &'static str) -> Result<PathBuf> {
    match found.len() {
        1 => Ok(found.remove(0)),
        n => Err(HarnessError::SubmissionCount {
            dir: dir.to_path_buf(),
            expected,
            found: n,
        }),
    }
}

/// Assemble `<dir>/source/submission.py` from the submission.
pub fn make_script(config: &GraderConfig, imports: &str) -> Result<String> {
    let submission = find_submission(&config.submission_dir())?;

    if config.convert_solution {
        let source = config.source_dir();
        convert(
            &source.join("solution.ipynb"),
            &source.join("solution.py"),
            "",
            false,
        )?;
    }

    tracing::info!("Extracting graded cells from {}", submission.display());
    convert(&submission, &config.script_path(), imports, true)
}
