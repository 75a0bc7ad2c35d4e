use async_trait::async_trait;
use fsl_anat_gear_runner::{
    CommandOutputSink, CommandResult, CommandSpec, ProcessRunner, RunnerError,
};
use parking_lot::Mutex;
use std::fs;
use std::path::PathBuf;

type Handler = dyn Fn(&CommandSpec) -> Result<CommandResult, RunnerError> + Send + Sync;

/// Runner that records every spec and answers from a handler.
pub struct ScriptedRunner {
    calls: Mutex<Vec<CommandSpec>>,
    handler: Box<Handler>,
}

impl ScriptedRunner {
    pub fn new(
        handler: impl Fn(&CommandSpec) -> Result<CommandResult, RunnerError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    /// Runner where every command exits zero with no output.
    pub fn succeeding() -> Self {
        Self::new(|_| {
            Ok(CommandResult {
                status_code: Some(0),
                ..CommandResult::default()
            })
        })
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().clone()
    }

    /// Program names in call order.
    pub fn programs(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(CommandSpec::program_name)
            .collect()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run_command_streaming(
        &self,
        spec: CommandSpec,
        sink: &mut dyn CommandOutputSink,
    ) -> Result<CommandResult, RunnerError> {
        self.calls.lock().push(spec.clone());
        let result = (self.handler)(&spec)?;
        if !result.stdout.is_empty() {
            sink.stdout(&result.stdout);
        }
        if !result.stderr.is_empty() {
            sink.stderr(&result.stderr);
        }
        sink.finish();
        Ok(result)
    }
}

/// Handler imitating `fsl_anat`, `tree` and `zip` on the filesystem.
///
/// `fsl_anat` creates `<-o>.anat` with two images and exits with
/// `tool_exit`; `zip` writes an empty archive at its first path argument;
/// `tree` prints a short listing. Anything else is reported missing.
pub fn simulated_tools(
    tool_exit: i32,
) -> impl Fn(&CommandSpec) -> Result<CommandResult, RunnerError> + Send + Sync + 'static {
    move |spec: &CommandSpec| match spec.program_name().as_str() {
        "fsl_anat" => {
            let prefix = spec
                .args
                .iter()
                .position(|arg| arg == "-o")
                .and_then(|idx| spec.args.get(idx + 1))
                .ok_or_else(|| RunnerError::InvalidConfig("missing -o".to_string()))?;
            let result_dir = PathBuf::from(format!("{prefix}.anat"));
            fs::create_dir_all(&result_dir)?;
            fs::write(result_dir.join("T1.nii.gz"), b"image")?;
            fs::write(result_dir.join("T1_biascorr.nii.gz"), b"corrected")?;
            Ok(CommandResult {
                status_code: Some(tool_exit),
                stdout: "Reorienting image to standard\n".to_string(),
                stderr: if tool_exit == 0 {
                    String::new()
                } else {
                    "Image Exception : singular matrix\n".to_string()
                },
            })
        }
        "tree" => {
            let dir = spec.args.last().cloned().unwrap_or_default();
            Ok(CommandResult {
                status_code: Some(0),
                stdout: format!("{dir}\n[   5]  T1.nii.gz\n\n0 directories, 2 files\n"),
                stderr: String::new(),
            })
        }
        "zip" => {
            let archive = spec
                .args
                .get(1)
                .ok_or_else(|| RunnerError::InvalidConfig("missing archive".to_string()))?;
            let mut empty_zip = b"PK\x05\x06".to_vec();
            empty_zip.extend([0u8; 18]);
            fs::write(archive, empty_zip)?;
            Ok(CommandResult {
                status_code: Some(0),
                ..CommandResult::default()
            })
        }
        other => Err(RunnerError::DependencyMissing(other.to_string())),
    }
}
