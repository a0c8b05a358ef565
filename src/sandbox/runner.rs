use async_trait::async_trait;

use crate::config::ResourceLimits;

use super::{ExecutionMode, ExecutionResult, SandboxError};

/// One (program, input) pair to execute
#[derive(Debug, Clone, Copy)]
pub struct RunSpec<'a> {
    pub mode: ExecutionMode,
    /// Graded source: the whole program in stdin-feed mode, the module in module-driver mode
    pub program: &'a str,
    /// Standard input in stdin-feed mode, the driver program in module-driver mode
    pub input: &'a str,
    pub limits: ResourceLimits,
}

/// Trait for the different ways of executing a single run
///
/// Implementations must always terminate and only report an error when the run could
/// not be prepared. Crashes, non-zero exits and timeouts are returned as a failed
/// [`ExecutionResult`].
#[async_trait]
pub trait SandboxRunner: Send + Sync {
    async fn run(&self, spec: RunSpec<'_>) -> Result<ExecutionResult, SandboxError>;
}
