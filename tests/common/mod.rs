#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use grader::grading::{CandidatePolicy, GradingRequest, ValidRequest};
use grader::sandbox::{ExecutionResult, RunSpec, SandboxError, SandboxRunner};

/// In-memory runner interpreting a tiny command language instead of spawning processes
///
/// - `echo`: prints its input
/// - `print <text>`: prints `<text>` and a newline
/// - `crash`: exits with status 1 after writing a traceback to stderr
/// - `spin`: is killed for exceeding the time limit
pub struct MockRunner {
    calls: AtomicUsize,
    /// 1-based call number that fails to prepare its scratch directory
    fail_on_call: Option<usize>,
    runs: Mutex<Vec<(String, String)>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_on_call: None,
            runs: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on_call(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// (program, input) of every run that got past preparation
    pub fn runs(&self) -> Vec<(String, String)> {
        self.runs.lock().clone()
    }
}

#[async_trait]
impl SandboxRunner for MockRunner {
    async fn run(&self, spec: RunSpec<'_>) -> Result<ExecutionResult, SandboxError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            return Err(SandboxError::ScratchDir {
                source: io::Error::other("no space left on device"),
            });
        }
        self.runs
            .lock()
            .push((spec.program.to_string(), spec.input.to_string()));

        let command = spec.program.trim_end();
        let result = if command == "echo" {
            ExecutionResult {
                stdout: spec.input.as_bytes().to_vec(),
                ..Default::default()
            }
        } else if let Some(text) = command.strip_prefix("print ") {
            ExecutionResult {
                stdout: format!("{text}\n").into_bytes(),
                ..Default::default()
            }
        } else if command == "crash" {
            ExecutionResult {
                failed: true,
                message: "exit status: 1".to_string(),
                stderr: b"Traceback (most recent call last)\n".to_vec(),
                ..Default::default()
            }
        } else if command == "spin" {
            ExecutionResult {
                failed: true,
                message: "exceeded time limit".to_string(),
                ..Default::default()
            }
        } else {
            ExecutionResult {
                failed: true,
                message: format!("unknown mock command {command:?}"),
                ..Default::default()
            }
        };
        Ok(result)
    }
}

pub fn request(reference: &str, candidate: &str, tests: &[&str], hidden: &[&str]) -> GradingRequest {
    GradingRequest {
        reference: reference.to_string(),
        candidate: candidate.to_string(),
        tests: tests.iter().map(|t| t.to_string()).collect(),
        hidden_tests: hidden.iter().map(|t| t.to_string()).collect(),
        max_seconds: 2,
        max_mb: 32,
        ..Default::default()
    }
}

pub fn valid(reference: &str, candidate: &str, tests: &[&str], hidden: &[&str]) -> ValidRequest {
    request(reference, candidate, tests, hidden)
        .validate(CandidatePolicy::Required)
        .unwrap()
}
