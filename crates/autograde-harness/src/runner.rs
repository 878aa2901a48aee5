use autograde_core::{Conv2dCase, PoolCase, Score, TestCriterion};
use ndarray::{Array1, Array3, Array4};

use crate::oracle::Oracle;
use crate::submission::{Conv2dArgs, PoolArgs, Submission};
use crate::tensor::{assert_close, normal_array, trial_rng, ATOL, RTOL};
use crate::Fault;

pub const TRIALS: u64 = 3;

/// Inputs for one convolution trial, drawn from the trial's own seed.
pub fn conv2d_inputs(case: &Conv2dCase, trial: u64) -> (Array3<f32>, Array4<f32>, Array1<f32>) {
    let mut rng = trial_rng(trial);
    let input = normal_array(&mut rng, case.input_shape());
    let kernel = normal_array(&mut rng, case.kernel_shape());
    let bias = normal_array(&mut rng, case.c_out);
    (input, kernel, bias)
}

pub fn pool_inputs(case: &PoolCase, trial: u64) -> Array3<f32> {
    normal_array(&mut trial_rng(trial), case.input_shape())
}

/// Compare the submission's `conv2d` against the oracle on every trial.
pub fn check_conv2d(
    submission: &dyn Submission,
    oracle: &dyn Oracle,
    case: &Conv2dCase,
) -> Result<(), Fault> {
    let args = Conv2dArgs::from(case);

    for trial in 0..TRIALS {
        let (input, kernel, bias) = conv2d_inputs(case, trial);
        let yours = submission.conv2d(&input, &kernel, &bias, &args)?;
        let expected = oracle.conv2d(&input, &kernel, &bias, &args)?;
        assert_close(&yours, &expected.into_dyn(), ATOL, RTOL)?;
        tracing::debug!("conv2d trial {} passed for {:?}", trial, case);
    }

    Ok(())
}

pub fn check_avg_pool2d(
    submission: &dyn Submission,
    oracle: &dyn Oracle,
    case: &PoolCase,
) -> Result<(), Fault> {
    let args = PoolArgs::from(case);

    for trial in 0..TRIALS {
        let input = pool_inputs(case, trial);
        let yours = submission.avg_pool2d(&input, &args)?;
        let expected = oracle.avg_pool2d(&input, &args)?;
        assert_close(&yours, &expected.into_dyn(), ATOL, RTOL)?;
        tracing::debug!("avg_pool2d trial {} passed for {:?}", trial, case);
    }

    Ok(())
}

// =============================================================================
// Criteria
// =============================================================================

/// What a criterion exercises.
#[derive(Clone, Debug, PartialEq)]
pub enum Check {
    Conv2d(Vec<Conv2dCase>),
    AvgPool2d(Vec<PoolCase>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct GradedCheck {
    pub criterion: TestCriterion,
    pub check: Check,
}

impl GradedCheck {
    /// Run every case; full marks only if all of them pass.
    pub fn run(&self, submission: &dyn Submission, oracle: &dyn Oracle) -> Result<Score, Fault> {
        match &self.check {
            Check::Conv2d(cases) => {
                for case in cases {
                    check_conv2d(submission, oracle, case)?;
                }
            }
            Check::AvgPool2d(cases) => {
                for case in cases {
                    check_avg_pool2d(submission, oracle, case)?;
                }
            }
        }
        Ok(Score::full(&self.criterion))
    }
}

fn base_conv(x_in: usize, y_in: usize) -> Conv2dCase {
    Conv2dCase {
        c_in: 3,
        c_out: 5,
        x_in,
        y_in,
        x_k: 3,
        y_k: 4,
        stride: 1.into(),
        padding: 0.into(),
        dilation: 1.into(),
        groups: 1,
    }
}

fn graded(action: &str, name: &str, max_score: f64, check: Check) -> GradedCheck {
    GradedCheck {
        criterion: TestCriterion::new(action, name, max_score),
        check,
    }
}

/// The convolution assignment's criteria, in grading order.
pub fn convolution_checks() -> Vec<GradedCheck> {
    let simple = base_conv(7, 8);
    let padded = simple.with_padding((1, 2));
    let strided = base_conv(11, 13).with_stride((2, 3)).with_padding((1, 2));
    let dilated = base_conv(23, 29)
        .with_stride((2, 3))
        .with_padding((3, 2))
        .with_dilation((2, 1));
    let grouped = Conv2dCase {
        c_in: 8,
        c_out: 12,
        groups: 4,
        ..base_conv(17, 19)
            .with_stride((2, 3))
            .with_padding((1, 2))
            .with_dilation((2, 1))
    };
    let pool = PoolCase {
        c: 3,
        x_in: 17,
        y_in: 19,
        x_k: 3,
        y_k: 4,
        stride: (2, 3).into(),
        padding: (1, 0).into(),
    };

    vec![
        graded(
            "testing simple convolution",
            "simple convolution",
            10.0,
            Check::Conv2d(vec![simple, simple.with_kernel(4, 3)]),
        ),
        graded(
            "testing with padding",
            "padding",
            20.0,
            Check::Conv2d(vec![padded, padded.with_padding((2, 3))]),
        ),
        graded(
            "testing with padding & stride",
            "padding, stride",
            20.0,
            Check::Conv2d(vec![strided, strided.with_stride((3, 2))]),
        ),
        graded(
            "testing with padding, stride, dilation",
            "padding, stride, dilation",
            20.0,
            Check::Conv2d(vec![dilated, dilated.with_dilation((1, 2))]),
        ),
        graded(
            "testing with padding, stride, dilation, groups",
            "padding, stride, dilation, groups",
            20.0,
            Check::Conv2d(vec![grouped]),
        ),
        graded(
            "testing average pooling",
            "average pooling",
            10.0,
            Check::AvgPool2d(vec![pool, pool.with_kernel(4, 3)]),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::ReferenceOracle;

    #[test]
    fn test_inputs_are_deterministic_per_trial() {
        let case = base_conv(7, 8);
        assert_eq!(conv2d_inputs(&case, 0), conv2d_inputs(&case, 0));
        assert_ne!(conv2d_inputs(&case, 0).0, conv2d_inputs(&case, 1).0);
    }

    #[test]
    fn test_conv_input_shapes() {
        let checks = convolution_checks();
        let Check::Conv2d(cases) = &checks[4].check else {
            panic!("groups criterion should be a conv check");
        };
        let (input, kernel, bias) = conv2d_inputs(&cases[0], 0);
        assert_eq!(input.dim(), (8, 17, 19));
        assert_eq!(kernel.dim(), (12, 2, 3, 4));
        assert_eq!(bias.len(), 12);
    }

    #[test]
    fn test_criteria_order_and_scores() {
        let checks = convolution_checks();
        let names: Vec<_> = checks.iter().map(|c| c.criterion.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "simple convolution",
                "padding",
                "padding, stride",
                "padding, stride, dilation",
                "padding, stride, dilation, groups",
                "average pooling",
            ]
        );
        let total: f64 = checks.iter().map(|c| c.criterion.max_score).sum();
        assert_eq!(total, 100.0);
    }

    #[test]
    fn test_every_case_is_valid_for_the_oracle() {
        for graded in convolution_checks() {
            match &graded.check {
                Check::Conv2d(cases) => {
                    for case in cases {
                        let (input, kernel, bias) = conv2d_inputs(case, 0);
                        assert!(ReferenceOracle
                            .conv2d(&input, &kernel, &bias, &Conv2dArgs::from(case))
                            .is_ok());
                    }
                }
                Check::AvgPool2d(cases) => {
                    for case in cases {
                        let input = pool_inputs(case, 0);
                        assert!(ReferenceOracle
                            .avg_pool2d(&input, &PoolArgs::from(case))
                            .is_ok());
                    }
                }
            }
        }
    }
}
