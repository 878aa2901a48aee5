use thiserror::Error;

/// Something went wrong while a graded check was exercising student code.
/// Every variant ends up as a zero score; none of them abort the run.
#[derive(Debug, Error)]
pub enum Fault {
    /// The submission raised. `trace` is the interpreter's full traceback.
    #[error("{}", last_line(.trace))]
    Raised { trace: String },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error(
        "Tensor-likes are not close! Mismatched elements: {mismatched} / {total}. \
         Greatest absolute difference: {max_abs_diff} at index {index:?} \
         (up to {atol} allowed, rtol {rtol})"
    )]
    ValueMismatch {
        mismatched: usize,
        total: usize,
        max_abs_diff: f32,
        index: Vec<usize>,
        atol: f32,
        rtol: f32,
    },

    #[error("Reference computation rejected the configuration: {0}")]
    Oracle(String),

    #[error("Panicked: {0}")]
    Panicked(String),

    /// The bridge to the submission broke (interpreter missing, garbled reply).
    #[error("Submission bridge error: {0}")]
    Bridge(String),
}

impl Fault {
    /// Full diagnostic text; the last line is always the summary.
    pub fn trace(&self) -> String {
        match self {
            Fault::Raised { trace } => trace.trim_end().to_string(),
            other => other.to_string(),
        }
    }
}

fn last_line(trace: &str) -> &str {
    trace.trim_end().lines().last().unwrap_or("")
}
