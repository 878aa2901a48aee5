use serde::{Deserialize, Serialize};

// =============================================================================
// Structural parameters
// =============================================================================

/// A stride/padding/dilation/window argument, given either as one number for
/// both axes or as an explicit `(x, y)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Size2 {
    Scalar(usize),
    Pair(usize, usize),
}

impl Size2 {
    pub fn pair(self) -> (usize, usize) {
        match self {
            Size2::Scalar(v) => (v, v),
            Size2::Pair(x, y) => (x, y),
        }
    }
}

impl From<usize> for Size2 {
    fn from(v: usize) -> Self {
        Size2::Scalar(v)
    }
}

impl From<(usize, usize)> for Size2 {
    fn from((x, y): (usize, usize)) -> Self {
        Size2::Pair(x, y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conv2dCase {
    pub c_in: usize,
    pub c_out: usize,
    pub x_in: usize,
    pub y_in: usize,
    pub x_k: usize,
    pub y_k: usize,
    pub stride: Size2,
    pub padding: Size2,
    pub dilation: Size2,
    pub groups: usize,
}

impl Conv2dCase {
    pub fn input_shape(&self) -> [usize; 3] {
        [self.c_in, self.x_in, self.y_in]
    }

    /// Kernel layout is `(c_out, c_in / groups, x_k, y_k)`.
    pub fn kernel_shape(&self) -> [usize; 4] {
        [self.c_out, self.c_in / self.groups.max(1), self.x_k, self.y_k]
    }

    pub fn with_kernel(mut self, x_k: usize, y_k: usize) -> Self {
        self.x_k = x_k;
        self.y_k = y_k;
        self
    }

    pub fn with_padding(mut self, padding: impl Into<Size2>) -> Self {
        self.padding = padding.into();
        self
    }

    pub fn with_stride(mut self, stride: impl Into<Size2>) -> Self {
        self.stride = stride.into();
        self
    }

    pub fn with_dilation(mut self, dilation: impl Into<Size2>) -> Self {
        self.dilation = dilation.into();
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCase {
    pub c: usize,
    pub x_in: usize,
    pub y_in: usize,
    pub x_k: usize,
    pub y_k: usize,
    pub stride: Size2,
    pub padding: Size2,
}

impl PoolCase {
    pub fn input_shape(&self) -> [usize; 3] {
        [self.c, self.x_in, self.y_in]
    }

    pub fn with_kernel(mut self, x_k: usize, y_k: usize) -> Self {
        self.x_k = x_k;
        self.y_k = y_k;
        self
    }
}

// =============================================================================
// Criteria
// =============================================================================

/// One named, independently scored check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestCriterion {
    /// Display name written into the results payload.
    pub name: String,
    /// Human-readable label used when logging the run.
    pub action: String,
    pub max_score: f64,
}

impl TestCriterion {
    pub fn new(action: &str, name: &str, max_score: f64) -> Self {
        Self {
            name: name.to_string(),
            action: action.to_string(),
            max_score,
        }
    }
}

/// Success branch of a graded check.
#[derive(Clone, Debug, PartialEq)]
pub struct Score {
    pub score: f64,
    pub output: Option<String>,
}

impl Score {
    pub fn full(criterion: &TestCriterion) -> Self {
        Self {
            score: criterion.max_score,
            output: None,
        }
    }
}
