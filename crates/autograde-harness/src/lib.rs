pub mod aggregator;
pub mod extractor;
pub mod fault;
pub mod grader;
pub mod oracle;
pub mod python;
pub mod runner;
pub mod submission;
pub mod tensor;

pub use aggregator::{count_for_loops, grade, grade_directory, loop_penalty, IMPORTS};
pub use extractor::{convert, find_submission, make_script, parse_notebook, to_script, Cell};
pub use fault::Fault;
pub use grader::{grader, run_graded, sanitize_trace};
pub use oracle::{Oracle, ReferenceOracle};
pub use python::PythonSubmission;
pub use runner::{check_avg_pool2d, check_conv2d, convolution_checks, Check, GradedCheck};
pub use submission::{Conv2dArgs, PoolArgs, Submission};
