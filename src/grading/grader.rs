use std::sync::Arc;

use crate::sandbox::{ExecutionResult, RunSpec, SandboxError, SandboxRunner};

use super::report;
use super::{
    CacheKey, GradeError, GradingVerdict, ReferenceCache, Role, TestCase, TestOutcome,
    ValidRequest, Visibility,
};

/// Grades candidates against reference solutions
///
/// Shared by every in-flight request; the reference cache is the only state
/// that outlives a single call.
pub struct Grader {
    runner: Arc<dyn SandboxRunner>,
    cache: ReferenceCache,
}

impl Grader {
    pub fn new(runner: Arc<dyn SandboxRunner>) -> Self {
        Self {
            runner,
            cache: ReferenceCache::new(),
        }
    }

    pub fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    /// Runs every test in order and builds the verdict
    ///
    /// Tests run one after another. The first run that cannot be prepared aborts the
    /// whole operation and no partial verdict is returned.
    pub async fn grade(&self, request: &ValidRequest) -> Result<GradingVerdict, GradeError> {
        let mut verdict = GradingVerdict {
            passed: true,
            pass_count: 0,
            report: String::new(),
            outcomes: Vec::with_capacity(request.cases.len()),
        };

        for (index, (number, case)) in numbered(&request.cases).enumerate() {
            // Step 1: Reference result, possibly from cache
            let reference = self.reference_result(request, case, number).await?;

            // Step 2: Candidate result, always fresh
            let candidate = self
                .run(request, &request.candidate, case)
                .await
                .map_err(|source| GradeError {
                    role: Role::Candidate,
                    visibility: case.visibility,
                    number,
                    source,
                })?;

            // Step 3: Compare byte for byte
            let passed =
                !reference.failed && !candidate.failed && reference.stdout == candidate.stdout;

            // Step 4: Report
            if index > 0 {
                verdict.report.push_str(report::SEPARATOR);
            }
            let detail = report::detail(case.visibility, &reference, &candidate);
            verdict
                .report
                .push_str(&report::header(number, case.visibility, passed));
            verdict.report.push_str(&detail);

            // Step 5: Tally
            if passed {
                verdict.pass_count += 1;
            }
            verdict.passed &= passed;
            verdict.outcomes.push(TestOutcome {
                index,
                number,
                visibility: case.visibility,
                passed,
                detail: (!detail.is_empty()).then_some(detail),
            });
        }

        let total = request.cases.len();
        log::info!(
            "  passed {}/{} {}",
            verdict.pass_count,
            total,
            if total == 1 { "test" } else { "tests" }
        );
        Ok(verdict)
    }

    /// What the reference produces on each visible test
    pub async fn expected_outputs(&self, request: &ValidRequest) -> Result<Vec<String>, GradeError> {
        let mut outputs = Vec::new();
        for (i, case) in request.visible_cases().enumerate() {
            let reference = self.reference_result(request, case, i + 1).await?;
            outputs.push(report::expected_output(&reference));
        }
        Ok(outputs)
    }

    async fn reference_result(
        &self,
        request: &ValidRequest,
        case: &TestCase,
        number: usize,
    ) -> Result<Arc<ExecutionResult>, GradeError> {
        let key = CacheKey::new(request.mode, &request.reference, &case.content);
        self.cache
            .get_or_compute(key, || self.run(request, &request.reference, case))
            .await
            .map_err(|source| GradeError {
                role: Role::Reference,
                visibility: case.visibility,
                number,
                source,
            })
    }

    async fn run(
        &self,
        request: &ValidRequest,
        program: &str,
        case: &TestCase,
    ) -> Result<ExecutionResult, SandboxError> {
        self.runner
            .run(RunSpec {
                mode: request.mode,
                program,
                input: &case.content,
                limits: request.limits,
            })
            .await
    }
}

/// Pairs each case with its 1-based number within its own visibility list
fn numbered(cases: &[TestCase]) -> impl Iterator<Item = (usize, &TestCase)> {
    let mut visible = 0;
    let mut hidden = 0;
    cases.iter().map(move |case| {
        let counter = match case.visibility {
            Visibility::Visible => &mut visible,
            Visibility::Hidden => &mut hidden,
        };
        *counter += 1;
        (*counter, case)
    })
}
