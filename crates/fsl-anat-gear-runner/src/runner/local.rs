//! Local process runner implementation.

use crate::runner::run_local_process;
use crate::{
    CommandOutputSink, CommandResult, CommandSpec, ProcessRunner, RunnerError, command_display,
};
use async_trait::async_trait;
use log::info;
use std::path::Path;

/// Runner that executes commands directly on the host.
#[derive(Debug, Default)]
pub struct LocalProcessRunner {}

impl LocalProcessRunner {
    /// Create a new local process runner.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProcessRunner for LocalProcessRunner {
    /// Run a command with streaming output callbacks.
    async fn run_command_streaming(
        &self,
        spec: CommandSpec,
        sink: &mut dyn CommandOutputSink,
    ) -> Result<CommandResult, RunnerError> {
        let working_dir = spec.cwd.as_deref().unwrap_or(Path::new("."));
        info!(
            "local run (program={})",
            command_display(&spec.command, working_dir)
        );
        run_local_process(spec, sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::LocalProcessRunner;
    use crate::{CommandSpec, ProcessRunner, RunnerError};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[tokio::test]
    async fn local_runner_runs_commands() {
        let runner = LocalProcessRunner::new();
        let mut spec = CommandSpec::new("sh");
        spec.args
            .extend(["-c".to_string(), "printf 'hello'".to_string()]);

        let result = runner.run_command(spec).await.expect("run");
        assert_eq!(result.stdout, "hello");
        assert_eq!(result.status_code, Some(0));
    }

    #[tokio::test]
    async fn local_runner_reports_exit_code_and_cwd() {
        let workspace = tempdir().expect("workspace");
        let runner = LocalProcessRunner::new();
        let mut spec = CommandSpec::new("sh");
        spec.cwd = Some(workspace.path().to_path_buf());
        spec.args
            .extend(["-c".to_string(), "pwd; exit 3".to_string()]);

        let result = runner.run_command(spec).await.expect("run");
        assert_eq!(result.status_code, Some(3));
        let reported = std::path::PathBuf::from(result.stdout.trim());
        assert_eq!(
            reported.canonicalize().expect("canonical"),
            workspace.path().canonicalize().expect("canonical")
        );
    }

    #[tokio::test]
    async fn local_runner_reports_missing_program() {
        let runner = LocalProcessRunner::new();
        let spec = CommandSpec::new("fsl-anat-gear-definitely-missing-tool");
        let err = runner.run_command(spec).await.expect_err("missing");
        assert!(matches!(err, RunnerError::DependencyMissing(_)));
    }
}
