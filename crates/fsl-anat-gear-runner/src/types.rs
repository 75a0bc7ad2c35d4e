//! Command specification and result types.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Command specification for a single subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Command path or program name resolved on `PATH`.
    pub command: PathBuf,
    /// Command arguments.
    pub args: Vec<String>,
    /// Optional working directory.
    pub cwd: Option<PathBuf>,
    /// Environment variables for the command.
    pub env: BTreeMap<String, String>,
    /// Whether the parent process environment is passed through.
    ///
    /// When false the child sees exactly `env`.
    pub inherit_env: bool,
}

impl CommandSpec {
    /// Create a new command spec with defaults.
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            inherit_env: true,
        }
    }

    /// Run with exactly the supplied environment.
    pub fn with_isolated_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self.inherit_env = false;
        self
    }

    /// Program name as shown in logs.
    pub fn program_name(&self) -> String {
        self.command
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.command.display().to_string())
    }

    /// Full argv joined with spaces, for logging.
    pub fn command_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.command.display().to_string());
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Result of a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Exit status code if available; `None` when killed by a signal.
    pub status_code: Option<i32>,
    /// Captured stdout content.
    pub stdout: String,
    /// Captured stderr content.
    pub stderr: String,
}

impl CommandResult {
    /// Whether the command exited with status zero.
    pub fn success(&self) -> bool {
        self.status_code == Some(0)
    }
}
