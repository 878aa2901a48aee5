use autograde_core::{GraderConfig, PASS_MESSAGE};
use autograde_harness::{
    grade, Conv2dArgs, Fault, Oracle, PoolArgs, ReferenceOracle, Submission,
};
use ndarray::{Array1, Array3, Array4, ArrayD, IxDyn};

/// Hands in exactly what the reference computes.
struct Correct;

impl Submission for Correct {
    fn conv2d(
        &self,
        input: &Array3<f32>,
        kernel: &Array4<f32>,
        bias: &Array1<f32>,
        args: &Conv2dArgs,
    ) -> Result<ArrayD<f32>, Fault> {
        Ok(ReferenceOracle.conv2d(input, kernel, bias, args)?.into_dyn())
    }

    fn avg_pool2d(&self, input: &Array3<f32>, args: &PoolArgs) -> Result<ArrayD<f32>, Fault> {
        Ok(ReferenceOracle.avg_pool2d(input, args)?.into_dyn())
    }
}

/// Raises from inside the student file on every call.
struct Raising;

const TRACE: &str = "Traceback (most recent call last):
  File \"/autograder/source/autograde.py\", line 40, in test
    your_output = conv2d(Input, Kernel, Bias, stride, padding, dilation, groups)
  File \"/autograder/source/submission.py\", line 9, in conv2d
    raise NotImplementedError
NotImplementedError";

impl Submission for Raising {
    fn conv2d(
        &self,
        _: &Array3<f32>,
        _: &Array4<f32>,
        _: &Array1<f32>,
        _: &Conv2dArgs,
    ) -> Result<ArrayD<f32>, Fault> {
        Err(Fault::Raised {
            trace: TRACE.to_string(),
        })
    }

    fn avg_pool2d(&self, _: &Array3<f32>, _: &PoolArgs) -> Result<ArrayD<f32>, Fault> {
        panic!("avg_pool2d is not implemented");
    }
}

/// Returns a tensor of the wrong shape.
struct WrongShape;

impl Submission for WrongShape {
    fn conv2d(
        &self,
        _: &Array3<f32>,
        _: &Array4<f32>,
        _: &Array1<f32>,
        _: &Conv2dArgs,
    ) -> Result<ArrayD<f32>, Fault> {
        Ok(ArrayD::zeros(IxDyn(&[1, 1])))
    }

    fn avg_pool2d(&self, input: &Array3<f32>, args: &PoolArgs) -> Result<ArrayD<f32>, Fault> {
        let mut out = ReferenceOracle.avg_pool2d(input, args)?.into_dyn();
        out[[0, 0, 0]] += 1.0;
        Ok(out)
    }
}

fn config() -> GraderConfig {
    let mut config = GraderConfig::new("/autograder");
    config.submission_marker = Some("/autograder/source/submission.py".to_string());
    config
}

const SOURCE: &str = "def conv2d(Input, Kernel, Bias, stride, padding, dilation, groups):\n    for c in range(3):\n        pass\n";

#[test]
fn correct_submission_gets_full_marks() {
    let results = grade(SOURCE, &Correct, &ReferenceOracle, &config());

    assert_eq!(results.tests.len(), 7);
    for test in &results.tests[..6] {
        assert_eq!(test.score, test.max_score, "{}", test.name);
        assert_eq!(test.output, PASS_MESSAGE);
    }
    assert_eq!(results.tests[6].name, "for loops");
    assert_eq!(results.tests[6].score, 0.0);
    assert_eq!(results.total_score(), 100.0);
    assert!(results.output.starts_with("autograder runtime: "));
    assert!(results.output.ends_with(" seconds"));
}

#[test]
fn raising_submission_scores_zero_with_student_frames() {
    let results = grade(SOURCE, &Raising, &ReferenceOracle, &config());

    let first = &results.tests[0];
    assert_eq!(first.score, 0.0);
    assert_eq!(first.max_score, 10.0);
    assert!(first.output.starts_with("in conv2d:\n    raise NotImplementedError"));
    assert!(first.output.ends_with("NotImplementedError"));
    assert!(!first.output.contains("autograde.py"));

    let pool = &results.tests[5];
    assert_eq!(pool.name, "average pooling");
    assert_eq!(pool.score, 0.0);
    assert_eq!(pool.output, "Panicked: avg_pool2d is not implemented");
}

#[test]
fn wrong_outputs_name_the_mismatch() {
    let results = grade(SOURCE, &WrongShape, &ReferenceOracle, &config());

    let first = &results.tests[0];
    assert_eq!(first.score, 0.0);
    assert!(first.output.contains("Shape mismatch"), "{}", first.output);
    assert!(first.output.contains("[5, 5, 5]"), "{}", first.output);

    let pool = &results.tests[5];
    assert_eq!(pool.score, 0.0);
    assert!(pool.output.starts_with("Tensor-likes are not close!"), "{}", pool.output);
}

#[test]
fn grading_is_deterministic() {
    let first = grade(SOURCE, &WrongShape, &ReferenceOracle, &config());
    let second = grade(SOURCE, &WrongShape, &ReferenceOracle, &config());
    assert_eq!(first.tests, second.tests);
}

#[test]
fn extra_loops_are_penalised() {
    let source = "for a in b:\n".repeat(4);
    let results = grade(&source, &Correct, &ReferenceOracle, &config());
    let penalty = results.tests.last().unwrap();
    assert_eq!(penalty.score, -10.0);
    assert_eq!(results.total_score(), 90.0);
}
