mod process_runner;
mod runner;
mod scratch;

pub use process_runner::{Confinement, ProcessRunner};
pub use runner::{RunSpec, SandboxRunner};
pub use scratch::ScratchDir;

use std::io;
use std::sync::Arc;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SandboxConfig;

/// File the interpreter is pointed at
pub const ENTRY_FILE: &str = "main.py";
/// Importable module holding the graded source in module-driver mode
pub const MODULE_FILE: &str = "Candidate.py";

/// How test content reaches the program under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    /// Test content is piped to the program's standard input
    #[default]
    StdinFeed,
    /// Test content is a driver program importing the graded source as a module
    ModuleDriver,
}

impl ExecutionMode {
    pub fn tag(self) -> &'static str {
        match self {
            Self::StdinFeed => "stdin-feed",
            Self::ModuleDriver => "module-driver",
        }
    }
}

/// Outcome of one program run
///
/// Only ever built after the run has terminated, so it never holds partial output.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecutionResult {
    /// Launch failure, non-zero exit or forced kill
    pub failed: bool,
    /// Diagnostic, empty on clean success
    pub message: String,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ExecutionResult {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Failure to prepare a run, as opposed to a program failing
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Failed to create working directory: {source}")]
    ScratchDir { source: io::Error },
    #[error("Failed to create {name} file: {source}")]
    SourceFile { name: String, source: io::Error },
}

/// Creates the runner selected by the sandbox configuration
///
/// Runs are wrapped in the constrained-process launcher when it exists. Without it,
/// the interpreter is invoked directly only if `allow_unconfined` is set.
pub fn create_sandbox_runner(config: &SandboxConfig) -> Result<Arc<dyn SandboxRunner>> {
    let interpreter = config.interpreter_path()?;
    let launcher = config.launcher_path()?;
    let ceiling = config.ceiling()?;

    if !interpreter.exists() {
        log::warn!(
            "Interpreter {} not found; every run will fail to start",
            interpreter.display()
        );
    }

    let confinement = if launcher.exists() {
        log::info!("Using launcher {} (confined mode)", launcher.display());
        Confinement::Launcher(launcher)
    } else if config.allow_unconfined {
        log::warn!(
            "Launcher {} not found; running programs WITHOUT confinement - use only in trusted environments",
            launcher.display()
        );
        Confinement::None
    } else {
        bail!(
            "Launcher {} not found (pass --allow-unconfined to run without it)",
            launcher.display()
        );
    };

    let runner = ProcessRunner::new(interpreter, confinement, ceiling)
        .with_scratch_root(config.scratch_root.clone());
    Ok(Arc::new(runner))
}
