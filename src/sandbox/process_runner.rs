use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::config::ResourceLimits;

use super::{
    ENTRY_FILE, ExecutionMode, ExecutionResult, MODULE_FILE, RunSpec, SandboxError,
    SandboxRunner, ScratchDir,
};

pub(crate) const TIMEOUT_MESSAGE: &str = "exceeded time limit";

// The launcher's CPU ceiling trails the wall-clock kill by this much
const LAUNCHER_GRACE_SECONDS: u32 = 1;
// How long to keep reading output pipes once the program has terminated
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// How the interpreter is wrapped
#[derive(Debug, Clone)]
pub enum Confinement {
    /// Through the external constrained-process launcher
    Launcher(PathBuf),
    /// Directly, with only the wall-clock limit enforced
    None,
}

/// Runs programs as real subprocesses in per-run scratch directories
///
/// Each run races the child against a wall-clock timer. When the timer wins, the run
/// is reported as failed. Either way the child's whole process group is killed
/// afterwards.
#[derive(Debug)]
pub struct ProcessRunner {
    interpreter: PathBuf,
    confinement: Confinement,
    /// Limits of every run are clamped to this, whatever the request asked for
    ceiling: ResourceLimits,
    scratch_root: Option<PathBuf>,
}

#[async_trait]
impl SandboxRunner for ProcessRunner {
    async fn run(&self, spec: RunSpec<'_>) -> Result<ExecutionResult, SandboxError> {
        let limits = spec.limits.clamp_to(self.ceiling);

        // Step 1: Materialize the sources; failures here abort the grading
        let scratch = self.materialize(&spec)?;

        // Step 2: Launch and supervise
        let stdin_data = match spec.mode {
            ExecutionMode::StdinFeed => Some(spec.input),
            ExecutionMode::ModuleDriver => None,
        };
        let command = self.build_command(scratch.path(), limits, stdin_data.is_some());
        let result = execute(command, stdin_data, limits).await;

        log::debug!(
            "Run in {} finished: failed={} message={:?}",
            scratch.path().display(),
            result.failed,
            result.message
        );
        Ok(result)
    }
}

impl ProcessRunner {
    pub fn new(interpreter: PathBuf, confinement: Confinement, ceiling: ResourceLimits) -> Self {
        Self {
            interpreter,
            confinement,
            ceiling,
            scratch_root: None,
        }
    }

    /// Creates scratch directories under `root` instead of the system temp directory
    pub fn with_scratch_root(mut self, root: Option<PathBuf>) -> Self {
        self.scratch_root = root;
        self
    }

    /// Creates the scratch directory and writes the source files into it
    fn materialize(&self, spec: &RunSpec<'_>) -> Result<ScratchDir, SandboxError> {
        let scratch = ScratchDir::create(self.scratch_root.as_deref())?;
        match spec.mode {
            ExecutionMode::StdinFeed => {
                scratch.write(ENTRY_FILE, spec.program)?;
            }
            ExecutionMode::ModuleDriver => {
                scratch.write(ENTRY_FILE, spec.input)?;
                scratch.write(MODULE_FILE, spec.program)?;
            }
        }
        Ok(scratch)
    }

    /// Builds the (possibly launcher-wrapped) interpreter invocation
    fn build_command(&self, work_dir: &Path, limits: ResourceLimits, piped_stdin: bool) -> Command {
        let mut cmd = match &self.confinement {
            Confinement::Launcher(launcher) => {
                let memory_arg = limits.max_mb.to_string();
                let cpu_arg = (limits.max_seconds + LAUNCHER_GRACE_SECONDS).to_string();
                let mut cmd = Command::new(launcher);
                cmd.args(["-m", &memory_arg, "-c", &cpu_arg, "--"])
                    .arg(&self.interpreter)
                    .arg(ENTRY_FILE);
                cmd
            }
            Confinement::None => {
                let mut cmd = Command::new(&self.interpreter);
                cmd.arg(ENTRY_FILE);
                cmd
            }
        };

        cmd.current_dir(work_dir)
            .stdin(if piped_stdin {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);
        cmd
    }
}

/// Spawns `cmd` and waits for it to exit or for the wall-clock limit, whichever is first
///
/// Once either happens the whole process group is killed, so nothing the program
/// started in the background outlives the run.
async fn execute(
    mut cmd: Command,
    stdin_data: Option<&str>,
    limits: ResourceLimits,
) -> ExecutionResult {
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            let program = cmd.as_std().get_program().to_string_lossy().into_owned();
            return ExecutionResult {
                failed: true,
                message: format!("failed to start {program}: {e}"),
                ..Default::default()
            };
        }
    };
    let pgid = child.id().and_then(|pid| i32::try_from(pid).ok());

    if let (Some(mut stdin), Some(data)) = (child.stdin.take(), stdin_data) {
        let data = data.to_owned();
        tokio::spawn(async move {
            // A program that exits without reading its input closes the pipe early
            if let Err(e) = stdin.write_all(data.as_bytes()).await {
                log::debug!("Stopped feeding standard input: {e}");
            }
        });
    }
    let stdout = Capture::start(child.stdout.take());
    let stderr = Capture::start(child.stderr.take());

    let limit = Duration::from_secs(u64::from(limits.max_seconds));
    let waited = tokio::select! {
        status = child.wait() => Some(status),
        _ = tokio::time::sleep(limit) => None,
    };

    // Background descendants die with the group even when the program exited on its own
    kill_process_group(pgid);

    let (failed, message) = match waited {
        Some(Ok(status)) if status.success() => (false, String::new()),
        Some(Ok(status)) => (true, status.to_string()),
        Some(Err(e)) => (true, format!("failed to wait for program: {e}")),
        None => {
            log::debug!("Run exceeded {}s", limits.max_seconds);
            if let Err(e) = child.start_kill() {
                log::debug!("Failed to kill child: {e}");
            }
            if let Err(e) = child.wait().await {
                log::warn!("Failed to reap killed program: {e}");
            }
            (true, TIMEOUT_MESSAGE.to_string())
        }
    };

    ExecutionResult {
        failed,
        message,
        stdout: stdout.finish().await,
        stderr: stderr.finish().await,
    }
}

/// Output pipe read in the background into a buffer shared with the caller
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl Capture {
    fn start<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let task = tokio::spawn(async move {
            let Some(mut pipe) = pipe else {
                return;
            };
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
                    Err(e) => {
                        log::debug!("Failed to read program output: {e}");
                        break;
                    }
                }
            }
        });
        Self { buf, task }
    }

    /// Everything read so far, waiting briefly for the pipe to reach end of file
    ///
    /// A descriptor leaked to a process outside the group keeps the pipe open; the
    /// bytes already read are kept.
    async fn finish(mut self) -> Vec<u8> {
        match tokio::time::timeout(OUTPUT_DRAIN_GRACE, &mut self.task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Output reader failed: {e}"),
            Err(_) => {
                log::warn!("Output pipe still open after the program terminated");
                self.task.abort();
            }
        }
        std::mem::take(&mut *self.buf.lock())
    }
}

fn kill_process_group(pgid: Option<i32>) {
    let Some(pgid) = pgid else {
        return;
    };
    // SAFETY: kill(2) has no memory effects; the group was created for this child
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        // ESRCH: every member already exited
        log::debug!(
            "Failed to signal process group {pgid}: {}",
            std::io::Error::last_os_error()
        );
    }
}
