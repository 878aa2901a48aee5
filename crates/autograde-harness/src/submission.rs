use autograde_core::{Conv2dCase, PoolCase, Size2};
use ndarray::{Array1, Array3, Array4, ArrayD};
use serde::{Deserialize, Serialize};

use crate::Fault;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conv2dArgs {
    pub stride: Size2,
    pub padding: Size2,
    pub dilation: Size2,
    pub groups: usize,
}

impl From<&Conv2dCase> for Conv2dArgs {
    fn from(case: &Conv2dCase) -> Self {
        Self {
            stride: case.stride,
            padding: case.padding,
            dilation: case.dilation,
            groups: case.groups,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolArgs {
    pub kernel_size: Size2,
    pub stride: Size2,
    pub padding: Size2,
}

impl From<&PoolCase> for PoolArgs {
    fn from(case: &PoolCase) -> Self {
        Self {
            kernel_size: Size2::Pair(case.x_k, case.y_k),
            stride: case.stride,
            padding: case.padding,
        }
    }
}

/// The functions a student hands in.
///
/// Outputs are dynamically shaped: a wrong-rank answer has to reach the
/// comparison so it can be reported as a shape mismatch.
pub trait Submission {
    fn conv2d(
        &self,
        input: &Array3<f32>,
        kernel: &Array4<f32>,
        bias: &Array1<f32>,
        args: &Conv2dArgs,
    ) -> Result<ArrayD<f32>, Fault>;

    fn avg_pool2d(&self, input: &Array3<f32>, args: &PoolArgs) -> Result<ArrayD<f32>, Fault>;
}

impl<S: Submission + ?Sized> Submission for &S {
    fn conv2d(
        &self,
        input: &Array3<f32>,
        kernel: &Array4<f32>,
        bias: &Array1<f32>,
        args: &Conv2dArgs,
    ) -> Result<ArrayD<f32>, Fault> {
        (**self).conv2d(input, kernel, bias, args)
    }

    fn avg_pool2d(&self, input: &Array3<f32>, args: &PoolArgs) -> Result<ArrayD<f32>, Fault> {
        (**self).avg_pool2d(input, args)
    }
}
