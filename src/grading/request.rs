use serde::Deserialize;
use thiserror::Error;

use crate::config::ResourceLimits;
use crate::sandbox::ExecutionMode;

use super::{TestCase, Visibility};

/// A grading request as submitted
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase")]
pub struct GradingRequest {
    #[serde(skip)]
    pub mode: ExecutionMode,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub candidate: String,
    #[serde(default)]
    pub tests: Vec<String>,
    #[serde(default)]
    pub hidden_tests: Vec<String>,
    #[serde(default)]
    pub max_seconds: i64,
    #[serde(default, rename = "MaxMB")]
    pub max_mb: i64,
}

/// Whether an empty candidate source is acceptable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidatePolicy {
    Required,
    /// The candidate is not run at all (expected-output requests)
    Deferred,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    /// Offending request field
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// A normalized request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRequest {
    pub mode: ExecutionMode,
    pub reference: String,
    pub candidate: String,
    /// Visible tests first, then hidden ones, each in submission order
    pub cases: Vec<TestCase>,
    pub limits: ResourceLimits,
}

impl ValidRequest {
    pub fn visible_cases(&self) -> impl Iterator<Item = &TestCase> {
        self.cases
            .iter()
            .filter(|case| case.visibility == Visibility::Visible)
    }
}

impl GradingRequest {
    /// Normalizes every field and checks the limits against the hard ceilings
    ///
    /// Fields are checked in a fixed order and the first violation is returned.
    /// Operator ceilings are not applied here; the runner clamps to them.
    pub fn validate(self, policy: CandidatePolicy) -> Result<ValidRequest, ValidationError> {
        let ceiling = ResourceLimits::CEILING;
        let reference = normalize_source(&self.reference);
        if is_blank(&reference) {
            return Err(ValidationError::new(
                "Reference",
                "Reference solution is required",
            ));
        }

        let candidate = normalize_source(&self.candidate);
        if policy == CandidatePolicy::Required && is_blank(&candidate) {
            return Err(ValidationError::new(
                "Candidate",
                "Candidate solution is required",
            ));
        }

        let visible = normalize_tests(&self.tests);
        if visible.is_empty() {
            return Err(ValidationError::new("Tests", "Tests list must not be empty"));
        }
        let hidden = normalize_tests(&self.hidden_tests);

        let max_seconds = check_range("MaxSeconds", self.max_seconds, ceiling.max_seconds)?;
        let max_mb = check_range("MaxMB", self.max_mb, ceiling.max_mb)?;

        let cases = visible
            .into_iter()
            .map(|content| TestCase {
                content,
                visibility: Visibility::Visible,
            })
            .chain(hidden.into_iter().map(|content| TestCase {
                content,
                visibility: Visibility::Hidden,
            }))
            .collect();

        Ok(ValidRequest {
            mode: self.mode,
            reference,
            candidate,
            cases,
            limits: ResourceLimits {
                max_seconds,
                max_mb,
            },
        })
    }
}

fn check_range(field: &'static str, value: i64, max: u32) -> Result<u32, ValidationError> {
    if value < 1 {
        return Err(ValidationError::new(field, format!("{field} must be >= 1")));
    }
    match u32::try_from(value) {
        Ok(v) if v <= max => Ok(v),
        _ => Err(ValidationError::new(field, format!("{field} must be <= {max}"))),
    }
}

fn normalize_tests(tests: &[String]) -> Vec<String> {
    tests
        .iter()
        .map(|test| normalize_source(test))
        .filter(|test| !is_blank(test))
        .collect()
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// CRLF to LF, a final newline, and no trailing spaces on any line
pub fn normalize_source(text: &str) -> String {
    let mut unified = text.replace("\r\n", "\n");
    if !unified.ends_with('\n') {
        unified.push('\n');
    }
    let mut out = String::with_capacity(unified.len());
    for line in unified.split_terminator('\n') {
        out.push_str(line.trim_end_matches(' '));
        out.push('\n');
    }
    out
}
