mod cache;
mod grader;
mod report;
mod request;

pub use cache::{CacheKey, ReferenceCache};
pub use grader::Grader;
pub use request::{
    CandidatePolicy, GradingRequest, ValidRequest, ValidationError, normalize_source,
};

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::sandbox::SandboxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Visible,
    /// Outcome is reported but expected output never is
    Hidden,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Visible => write!(f, "visible"),
            Visibility::Hidden => write!(f, "hidden"),
        }
    }
}

/// One test input, fed to both solutions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub content: String,
    pub visibility: Visibility,
}

/// Which solution a run belonged to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Reference,
    Candidate,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Reference => write!(f, "reference"),
            Role::Candidate => write!(f, "candidate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestOutcome {
    /// Position across all tests, visible ones first
    pub index: usize,
    /// 1-based number within its own list
    pub number: usize,
    pub visibility: Visibility,
    pub passed: bool,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GradingVerdict {
    pub passed: bool,
    pub pass_count: usize,
    pub report: String,
    pub outcomes: Vec<TestOutcome>,
}

/// A run could not be prepared; the whole grading operation is abandoned
#[derive(Error, Debug)]
#[error("Error running {role} solution on {visibility} test #{number}: {source}")]
pub struct GradeError {
    pub role: Role,
    pub visibility: Visibility,
    /// 1-based number within its own list
    pub number: usize,
    pub source: SandboxError,
}
