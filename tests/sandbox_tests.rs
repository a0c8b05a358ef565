use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use grader::config::ResourceLimits;
use grader::grading::{CandidatePolicy, Grader, GradingRequest};
use grader::sandbox::{
    Confinement, ExecutionMode, ExecutionResult, ProcessRunner, RunSpec, SandboxError,
    SandboxRunner,
};

const SHELL: &str = "/bin/sh";

// Stands in for the constrained-process launcher: reports its arguments on stderr and
// in LAUNCHER_ARGS, then runs everything after `--`
const FAKE_LAUNCHER: &str = r#"#!/bin/sh
echo "launcher: $*" >&2
LAUNCHER_ARGS="$*"
export LAUNCHER_ARGS
while [ "$#" -gt 0 ] && [ "$1" != "--" ]; do shift; done
shift
exec "$@"
"#;

static LAUNCHER_DIR: OnceLock<TempDir> = OnceLock::new();

/// Path of the shared fake launcher
///
/// Every test calls this before spawning anything. The first call writes the script
/// while the others block, so no concurrently forked process can still hold it open
/// for writing when it is executed.
fn launcher() -> PathBuf {
    let dir = LAUNCHER_DIR.get_or_init(|| {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sandbox");
        fs::write(&path, FAKE_LAUNCHER).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        dir
    });
    dir.path().join("sandbox")
}

fn limits(max_seconds: u32, max_mb: u32) -> ResourceLimits {
    ResourceLimits {
        max_seconds,
        max_mb,
    }
}

fn confined(ceiling: ResourceLimits) -> ProcessRunner {
    ProcessRunner::new(PathBuf::from(SHELL), Confinement::Launcher(launcher()), ceiling)
}

fn unconfined() -> ProcessRunner {
    launcher();
    ProcessRunner::new(PathBuf::from(SHELL), Confinement::None, ResourceLimits::CEILING)
}

async fn run(
    runner: &ProcessRunner,
    mode: ExecutionMode,
    program: &str,
    input: &str,
    limits: ResourceLimits,
) -> ExecutionResult {
    runner
        .run(RunSpec {
            mode,
            program,
            input,
            limits,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_stdin_is_fed_to_program() {
    let runner = confined(ResourceLimits::CEILING);

    let result = run(
        &runner,
        ExecutionMode::StdinFeed,
        "cat\n",
        "3\n4\n",
        limits(2, 16),
    )
    .await;

    assert!(!result.failed, "{result:?}");
    assert_eq!(result.message, "");
    assert_eq!(result.stdout_text(), "3\n4\n");
    assert_eq!(
        result.stderr_text(),
        "launcher: -m 16 -c 3 -- /bin/sh main.py\n"
    );
}

#[tokio::test]
async fn test_limits_clamped_to_runner_ceiling() {
    let runner = confined(limits(1, 64));

    let result = run(&runner, ExecutionMode::StdinFeed, "true\n", "", limits(60, 256)).await;

    assert!(!result.failed, "{result:?}");
    assert_eq!(
        result.stderr_text(),
        "launcher: -m 64 -c 2 -- /bin/sh main.py\n"
    );
}

#[tokio::test]
async fn test_non_zero_exit_is_a_failure() {
    let result = run(
        &unconfined(),
        ExecutionMode::StdinFeed,
        "echo partial\necho oops >&2\nexit 3\n",
        "",
        limits(2, 16),
    )
    .await;

    assert!(result.failed);
    assert_eq!(result.message, "exit status: 3");
    assert_eq!(result.stdout_text(), "partial\n");
    assert_eq!(result.stderr_text(), "oops\n");
}

#[tokio::test]
async fn test_timeout_kills_the_whole_process_group() {
    let runner = confined(ResourceLimits::CEILING);

    let start = Instant::now();
    // `sleep` is a grandchild of the launcher and keeps the output pipes open
    let result = run(
        &runner,
        ExecutionMode::StdinFeed,
        "echo started\nsleep 30\necho finished\n",
        "",
        limits(1, 16),
    )
    .await;
    let elapsed = start.elapsed();

    assert!(result.failed);
    assert_eq!(result.message, "exceeded time limit");
    assert_eq!(result.stdout_text(), "started\n");
    assert!(elapsed >= Duration::from_secs(1), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "{elapsed:?}");
}

#[tokio::test]
async fn test_module_driver_imports_candidate() {
    let runner = unconfined();

    let result = run(
        &runner,
        ExecutionMode::ModuleDriver,
        "greet() { echo \"hello $1\"; }\n",
        ". ./Candidate.py\ngreet world\n",
        limits(2, 16),
    )
    .await;

    assert!(!result.failed, "{result:?}");
    assert_eq!(result.stdout_text(), "hello world\n");

    // Standard input is closed for drivers
    let result = run(&runner, ExecutionMode::ModuleDriver, "\n", "cat\n", limits(2, 16)).await;
    assert!(!result.failed, "{result:?}");
    assert_eq!(result.stdout_text(), "");
}

#[tokio::test]
async fn test_launch_failure_is_a_graded_failure() {
    launcher();
    let runner = ProcessRunner::new(
        PathBuf::from("/nonexistent/python"),
        Confinement::None,
        ResourceLimits::CEILING,
    );

    let result = run(&runner, ExecutionMode::StdinFeed, "print 1\n", "", limits(1, 16)).await;

    assert!(result.failed);
    assert!(
        result.message.starts_with("failed to start /nonexistent/python: "),
        "{}",
        result.message
    );
    assert!(result.stdout.is_empty());
}

#[tokio::test]
async fn test_missing_scratch_root_is_an_error() {
    let runner = unconfined().with_scratch_root(Some(PathBuf::from("/nonexistent/scratch")));

    let err = runner
        .run(RunSpec {
            mode: ExecutionMode::StdinFeed,
            program: "true\n",
            input: "",
            limits: limits(1, 16),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, SandboxError::ScratchDir { .. }), "{err:?}");
}

#[tokio::test]
async fn test_scratch_directory_removed_after_run() {
    let root = TempDir::new().unwrap();
    let runner = unconfined().with_scratch_root(Some(root.path().to_path_buf()));

    let result = run(
        &runner,
        ExecutionMode::StdinFeed,
        "ls\n",
        "",
        limits(2, 16),
    )
    .await;

    assert_eq!(result.stdout_text(), "main.py\n");
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_output_kept_when_background_child_lingers() {
    let start = Instant::now();
    // The backgrounded sleep inherits the output pipes
    let result = run(
        &unconfined(),
        ExecutionMode::StdinFeed,
        "echo hi\nsleep 3 &\n",
        "",
        limits(5, 16),
    )
    .await;

    assert!(!result.failed, "{result:?}");
    assert_eq!(result.message, "");
    assert_eq!(result.stdout_text(), "hi\n");
    assert!(start.elapsed() < Duration::from_secs(2), "{:?}", start.elapsed());
}

#[tokio::test]
async fn test_no_descendant_survives_normal_exit() {
    let dir = TempDir::new().unwrap();
    let marker = dir.path().join("late");
    let program = format!(
        "echo hi\n(sleep 1; echo late > '{}') &\n",
        marker.display()
    );

    let result = run(
        &unconfined(),
        ExecutionMode::StdinFeed,
        &program,
        "",
        limits(5, 16),
    )
    .await;
    assert!(!result.failed, "{result:?}");
    assert_eq!(result.stdout_text(), "hi\n");

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!marker.exists(), "background process outlived the run");
}

#[tokio::test]
async fn test_request_limits_clamped_to_operator_ceiling() {
    let grader = Grader::new(Arc::new(confined(limits(30, 128))));
    // Accepted by validation, then lowered by the runner
    let request = GradingRequest {
        reference: "echo \"$LAUNCHER_ARGS\"".to_string(),
        tests: vec!["1".to_string()],
        max_seconds: 45,
        max_mb: 200,
        ..Default::default()
    }
    .validate(CandidatePolicy::Deferred)
    .unwrap();

    let outputs = grader.expected_outputs(&request).await.unwrap();

    assert_eq!(outputs, vec!["-m 128 -c 31 -- /bin/sh main.py\n".to_string()]);
}
