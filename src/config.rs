use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Deserialize;

/// Hard ceiling on the wall-clock budget of a single run, in seconds
pub const MAX_SECONDS: u32 = 60;
/// Hard ceiling on the memory budget of a single run, in megabytes
pub const MAX_MB: u32 = 256;

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
const DEFAULT_BIND_PORT: u16 = 8080;
const DEFAULT_INTERPRETER: &str = "bin/python";
const DEFAULT_LAUNCHER: &str = "bin/sandbox";

#[derive(Parser)]
#[command(name = "grader", version = "1.0", about, long_about = None)]
pub struct CliArgs {
    /// Path to an optional JSON configuration file
    #[arg(long = "config", short = 'c', env = "GRADER_CONFIG")]
    pub config_path: Option<String>,

    /// Address to listen on
    #[arg(long, env = "GRADER_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Port to listen on
    #[arg(long, env = "GRADER_BIND_PORT")]
    pub bind_port: Option<u16>,

    /// Interpreter used to run reference and candidate programs
    #[arg(long, env = "GRADER_INTERPRETER")]
    pub interpreter: Option<PathBuf>,

    /// Constrained-process launcher wrapping every run
    #[arg(long, env = "GRADER_LAUNCHER")]
    pub launcher: Option<PathBuf>,

    /// Per-run wall-clock ceiling; longer requested limits are lowered to it
    #[arg(long, env = "GRADER_MAX_SECONDS")]
    pub max_seconds: Option<u32>,

    /// Per-run memory ceiling; larger requested limits are lowered to it
    #[arg(long, env = "GRADER_MAX_MB")]
    pub max_mb: Option<u32>,

    /// Parent directory for per-run scratch directories
    #[arg(long, env = "GRADER_SCRATCH_ROOT")]
    pub scratch_root: Option<PathBuf>,

    /// Run the interpreter directly when the launcher is missing (NO confinement)
    #[arg(long, env = "GRADER_ALLOW_UNCONFINED", default_value_t = false)]
    pub allow_unconfined: bool,
}

impl CliArgs {
    /// Load the configuration file (if any) and apply command-line overrides
    pub fn to_config(&self) -> Result<Config> {
        let mut config = match &self.config_path {
            Some(path) => {
                let file = std::fs::File::open(path)
                    .with_context(|| format!("Failed to open configuration file {path}"))?;
                let reader = std::io::BufReader::new(file);
                serde_json::from_reader(reader)
                    .with_context(|| format!("Failed to parse configuration file {path}"))?
            }
            None => Config::default(),
        };

        if let Some(address) = &self.bind_address {
            config.server.bind_address = Some(address.clone());
        }
        if let Some(port) = self.bind_port {
            config.server.bind_port = Some(port);
        }
        if let Some(interpreter) = &self.interpreter {
            config.sandbox.interpreter = Some(interpreter.clone());
        }
        if let Some(launcher) = &self.launcher {
            config.sandbox.launcher = Some(launcher.clone());
        }
        if let Some(max_seconds) = self.max_seconds {
            config.sandbox.max_seconds = Some(max_seconds);
        }
        if let Some(max_mb) = self.max_mb {
            config.sandbox.max_mb = Some(max_mb);
        }
        if let Some(root) = &self.scratch_root {
            config.sandbox.scratch_root = Some(root.clone());
        }
        config.sandbox.allow_unconfined |= self.allow_unconfined;

        Ok(config)
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

#[derive(Deserialize, Debug, Default)]
pub struct ServerConfig {
    pub bind_address: Option<String>,
    pub bind_port: Option<u16>,
}

impl ServerConfig {
    pub fn address(&self) -> (String, u16) {
        (
            self.bind_address
                .clone()
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            self.bind_port.unwrap_or(DEFAULT_BIND_PORT),
        )
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct SandboxConfig {
    pub interpreter: Option<PathBuf>,
    pub launcher: Option<PathBuf>,
    pub max_seconds: Option<u32>,
    pub max_mb: Option<u32>,
    pub scratch_root: Option<PathBuf>,
    #[serde(default)]
    pub allow_unconfined: bool,
}

impl SandboxConfig {
    /// Interpreter path, relative defaults resolved against the working directory
    pub fn interpreter_path(&self) -> Result<PathBuf> {
        resolve(self.interpreter.as_deref(), DEFAULT_INTERPRETER)
    }

    /// Launcher path, relative defaults resolved against the working directory
    pub fn launcher_path(&self) -> Result<PathBuf> {
        resolve(self.launcher.as_deref(), DEFAULT_LAUNCHER)
    }

    /// Effective per-run ceilings, never above the hard ceilings
    pub fn ceiling(&self) -> Result<ResourceLimits> {
        let max_seconds = clamp_ceiling("max_seconds", self.max_seconds, MAX_SECONDS)?;
        let max_mb = clamp_ceiling("max_mb", self.max_mb, MAX_MB)?;
        Ok(ResourceLimits {
            max_seconds,
            max_mb,
        })
    }
}

fn resolve(configured: Option<&std::path::Path>, default: &str) -> Result<PathBuf> {
    let path = configured.map_or_else(|| PathBuf::from(default), |p| p.to_path_buf());
    if path.is_absolute() {
        return Ok(path);
    }
    let wd = std::env::current_dir().context("Failed to find working directory")?;
    Ok(wd.join(path))
}

fn clamp_ceiling(name: &str, configured: Option<u32>, hard: u32) -> Result<u32> {
    match configured {
        None => Ok(hard),
        Some(0) => bail!("{name} must be at least 1"),
        Some(v) if v > hard => {
            log::warn!("{name}={v} exceeds the hard ceiling, using {hard}");
            Ok(hard)
        }
        Some(v) => Ok(v),
    }
}

/// Wall-clock and memory budget of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    pub max_seconds: u32,
    pub max_mb: u32,
}

impl ResourceLimits {
    /// The hard ceilings
    pub const CEILING: ResourceLimits = ResourceLimits {
        max_seconds: MAX_SECONDS,
        max_mb: MAX_MB,
    };

    /// Lowers each limit to the corresponding ceiling
    pub fn clamp_to(self, ceiling: ResourceLimits) -> ResourceLimits {
        ResourceLimits {
            max_seconds: self.max_seconds.min(ceiling.max_seconds),
            max_mb: self.max_mb.min(ceiling.max_mb),
        }
    }
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self::CEILING
    }
}
