//! Runs the assembled submission script under a Python interpreter.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use autograde_core::{HarnessError, Size2};
use ndarray::{Array1, Array3, Array4, ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

use crate::submission::{Conv2dArgs, PoolArgs, Submission};
use crate::Fault;

/// Loads the script as module `submission`, decodes the request, calls the
/// named function and writes `{shape, data}` on a fresh stdout line.
const DRIVER: &str = r#"
import importlib.util
import json
import math
import sys

import numpy as np


def _load(path):
    spec = importlib.util.spec_from_file_location("submission", path)
    module = importlib.util.module_from_spec(spec)
    sys.modules["submission"] = module
    spec.loader.exec_module(module)
    return module


def _arg(arg):
    kind, value = arg["kind"], arg["value"]
    if kind == "array":
        return np.asarray(value["data"], dtype=np.float32).reshape(value["shape"])
    if kind == "size":
        return tuple(value) if isinstance(value, list) else value
    return value


def main():
    submission = _load(sys.argv[1])
    if len(sys.argv) < 3:
        return
    with open(sys.argv[2], encoding="utf-8") as f:
        request = json.load(f)
    func = getattr(submission, request["function"])
    out = np.asarray(func(*[_arg(a) for a in request["args"]])).astype(np.float32)
    data = [v if math.isfinite(v) else None for v in out.ravel().tolist()]
    sys.stdout.write("\n")
    json.dump({"shape": list(out.shape), "data": data}, sys.stdout)


main()
"#;

#[derive(Debug, Serialize)]
struct BridgeArray {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl BridgeArray {
    fn from_array<D: ndarray::Dimension>(array: &ndarray::Array<f32, D>) -> Self {
        Self {
            shape: array.shape().to_vec(),
            data: array.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
enum BridgeArg {
    Array(BridgeArray),
    Size(Size2),
    Int(usize),
}

#[derive(Debug, Serialize)]
struct BridgeRequest<'a> {
    function: &'a str,
    args: Vec<BridgeArg>,
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    shape: Vec<usize>,
    data: Vec<Option<f32>>,
}

pub struct PythonSubmission {
    python: String,
    script_path: PathBuf,
    temp_dir: TempDir,
}

impl PythonSubmission {
    /// Import the script once. A script that does not even import is a setup
    /// problem, not a graded failure.
    pub fn load(python: &str, script_path: &Path) -> Result<Self, HarnessError> {
        // The interpreter runs inside the script's directory, so argv must not
        // be relative to ours.
        let script_path = std::path::absolute(script_path)?;
        let submission = Self {
            python: python.to_string(),
            script_path,
            temp_dir: TempDir::new()?,
        };

        let output = submission.execute(&[])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HarnessError::SubmissionImport(stderr.trim().to_string()));
        }

        tracing::info!("Loaded submission {}", submission.script_path.display());
        Ok(submission)
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    fn execute(&self, extra: &[&Path]) -> std::io::Result<Output> {
        let mut cmd = Command::new(&self.python);
        cmd.arg("-c")
            .arg(DRIVER)
            .arg(&self.script_path)
            .args(extra)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = self.script_path.parent() {
            cmd.current_dir(dir);
        }
        cmd.output()
    }

    fn call(&self, function: &str, args: Vec<BridgeArg>) -> Result<ArrayD<f32>, Fault> {
        let request_path = self.temp_dir.path().join("request.json");
        let request = BridgeRequest { function, args };
        let body = serde_json::to_vec(&request).map_err(|e| Fault::Bridge(e.to_string()))?;
        fs::write(&request_path, body).map_err(|e| Fault::Bridge(e.to_string()))?;

        tracing::debug!("Calling submission.{}", function);
        let output = self
            .execute(&[request_path.as_path()])
            .map_err(|e| Fault::Bridge(format!("failed to run {}: {}", self.python, e)))?;

        if !output.status.success() {
            return Err(Fault::Raised {
                trace: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        decode_reply(&stdout)
    }
}

fn decode_reply(stdout: &str) -> Result<ArrayD<f32>, Fault> {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| Fault::Bridge("submission produced no output".to_string()))?;

    let reply: BridgeReply = serde_json::from_str(line).map_err(|e| {
        let excerpt: String = line.chars().take(200).collect();
        Fault::Bridge(format!("unreadable reply: {} - {}", e, excerpt))
    })?;

    let data = reply
        .data
        .into_iter()
        .map(|v| v.unwrap_or(f32::NAN))
        .collect();
    ArrayD::from_shape_vec(IxDyn(&reply.shape), data).map_err(|e| Fault::Bridge(e.to_string()))
}

impl Submission for PythonSubmission {
    fn conv2d(
        &self,
        input: &Array3<f32>,
        kernel: &Array4<f32>,
        bias: &Array1<f32>,
        args: &Conv2dArgs,
    ) -> Result<ArrayD<f32>, Fault> {
        self.call(
            "conv2d",
            vec![
                BridgeArg::Array(BridgeArray::from_array(input)),
                BridgeArg::Array(BridgeArray::from_array(kernel)),
                BridgeArg::Array(BridgeArray::from_array(bias)),
                BridgeArg::Size(args.stride),
                BridgeArg::Size(args.padding),
                BridgeArg::Size(args.dilation),
                BridgeArg::Int(args.groups),
            ],
        )
    }

    fn avg_pool2d(&self, input: &Array3<f32>, args: &PoolArgs) -> Result<ArrayD<f32>, Fault> {
        self.call(
            "avg_pool2d",
            vec![
                BridgeArg::Array(BridgeArray::from_array(input)),
                BridgeArg::Size(args.kernel_size),
                BridgeArg::Size(args.stride),
                BridgeArg::Size(args.padding),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_encoding() {
        let input = Array3::<f32>::zeros((1, 2, 2));
        let request = BridgeRequest {
            function: "avg_pool2d",
            args: vec![
                BridgeArg::Array(BridgeArray::from_array(&input)),
                BridgeArg::Size(Size2::Pair(3, 4)),
                BridgeArg::Size(Size2::Scalar(1)),
                BridgeArg::Int(4),
            ],
        };

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["function"], "avg_pool2d");
        assert_eq!(json["args"][0]["kind"], "array");
        assert_eq!(json["args"][0]["value"]["shape"], serde_json::json!([1, 2, 2]));
        assert_eq!(json["args"][1], serde_json::json!({"kind": "size", "value": [3, 4]}));
        assert_eq!(json["args"][2], serde_json::json!({"kind": "size", "value": 1}));
        assert_eq!(json["args"][3], serde_json::json!({"kind": "int", "value": 4}));
    }

    #[test]
    fn test_reply_skips_stray_output() {
        let stdout = "leftover chatter\n{\"shape\": [2, 1], \"data\": [1.5, null]}";
        let out = decode_reply(stdout).unwrap();
        assert_eq!(out.shape(), &[2, 1]);
        assert_eq!(out[[0, 0]], 1.5);
        assert!(out[[1, 0]].is_nan());
    }

    #[test]
    fn test_reply_with_wrong_element_count_is_bridge_fault() {
        let err = decode_reply("{\"shape\": [3], \"data\": [1.0]}").unwrap_err();
        assert!(matches!(err, Fault::Bridge(_)));
    }

    #[test]
    fn test_garbled_multibyte_reply_is_bridge_fault() {
        let stdout = format!("{}{}", "x".repeat(199), "é".repeat(50));
        let msg = match decode_reply(&stdout).unwrap_err() {
            Fault::Bridge(msg) => msg,
            other => panic!("expected a bridge fault, got {:?}", other),
        };
        assert!(msg.starts_with("unreadable reply: "));
        assert!(msg.ends_with(&format!("{}é", "x".repeat(199))));
    }

    #[test]
    fn test_missing_interpreter_is_harness_fault() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("submission.py");
        fs::write(&script, "x = 1\n").unwrap();

        let err = PythonSubmission::load("definitely-not-a-python-binary", &script)
            .err()
            .unwrap();
        assert!(matches!(err, HarnessError::Io(_)));
    }
}
