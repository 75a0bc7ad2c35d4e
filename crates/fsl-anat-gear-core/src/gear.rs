//! The gear pipeline: configuration in, archived results out.

use crate::{
    ArchiveReport, FlagMap, GearError, ResultLayout, ValidationWarning, archive_results,
    build_command_list, build_params, stage_input, validate_params,
};
use fsl_anat_gear_config::{DEFAULT_INPUT_NAME, GearConfig, GearPaths};
use fsl_anat_gear_runner::{CommandSpec, LogSink, ProcessRunner};
use log::{debug, error, info};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// Program the gear wraps.
pub const DEFAULT_TOOL: &str = "fsl_anat";

/// Options controlling a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GearOptions {
    /// Program to invoke.
    pub tool: PathBuf,
    /// Name of the input holding the image.
    pub input_name: String,
    /// Assemble and log the command without running it.
    pub dry_run: bool,
}

impl Default for GearOptions {
    fn default() -> Self {
        Self {
            tool: PathBuf::from(DEFAULT_TOOL),
            input_name: DEFAULT_INPUT_NAME.to_string(),
            dry_run: false,
        }
    }
}

/// Everything decided before the tool is invoked.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRun {
    pub layout: ResultLayout,
    pub params: FlagMap,
    pub warnings: Vec<ValidationWarning>,
    /// Full argv, program first.
    pub command: Vec<String>,
}

/// How the pipeline ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The tool ran and exited with status zero.
    Succeeded,
    /// The command was assembled but not run.
    DryRun,
    /// The tool exited non-zero, or was killed by a signal.
    ToolFailed { status_code: Option<i32> },
    /// Configuration, validation, or launch failed before the tool finished.
    Aborted(GearError),
}

impl RunOutcome {
    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Succeeded | Self::DryRun => 0,
            Self::ToolFailed {
                status_code: Some(code),
            } => *code,
            Self::ToolFailed { status_code: None } | Self::Aborted(_) => 1,
        }
    }
}

/// Result of a full run, including the archiving step.
#[derive(Debug)]
pub struct GearReport {
    pub outcome: RunOutcome,
    /// `None` when archiving failed, or never ran because no result layout
    /// could be derived.
    pub archive: Option<ArchiveReport>,
}

impl GearReport {
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}

/// A configured gear ready to run.
pub struct Gear {
    paths: GearPaths,
    config: GearConfig,
    environ: BTreeMap<String, String>,
    options: GearOptions,
    runner: Arc<dyn ProcessRunner>,
}

impl Gear {
    pub fn new(
        paths: GearPaths,
        config: GearConfig,
        environ: BTreeMap<String, String>,
        options: GearOptions,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            paths,
            config,
            environ,
            options,
            runner,
        }
    }

    /// Result layout for the configured input.
    pub fn layout(&self) -> Result<ResultLayout, GearError> {
        let input = self.config.input(&self.options.input_name)?;
        Ok(ResultLayout::new(
            &input.location.name,
            &self.paths.work_dir,
            &self.paths.output_dir,
        ))
    }

    /// Stage the input, build and validate flags, and assemble the command.
    pub fn prepare(&self, layout: &ResultLayout) -> Result<PreparedRun, GearError> {
        let input_path = self.config.input_path(&self.options.input_name)?;
        let staged = stage_input(input_path)?;
        let mut params = build_params(&self.config.config, &staged, &layout.result_prefix());
        let warnings = validate_params(&mut params)?;
        let command = build_command_list(&self.options.tool.to_string_lossy(), &params);
        debug!(
            "run prepared (flags={}, warnings={})",
            params.len(),
            warnings.len()
        );
        Ok(PreparedRun {
            layout: layout.clone(),
            params,
            warnings,
            command,
        })
    }

    /// Invoke the tool for a prepared run.
    pub async fn execute(&self, prepared: &PreparedRun) -> RunOutcome {
        info!("fsl_anat command: {}", prepared.command.join(" "));
        if self.options.dry_run {
            info!("dry run; command not executed");
            return RunOutcome::DryRun;
        }
        if let Err(err) = fs::create_dir_all(&self.paths.work_dir) {
            return RunOutcome::Aborted(err.into());
        }

        let mut spec =
            CommandSpec::new(&self.options.tool).with_isolated_env(self.environ.clone());
        spec.args = prepared.command.iter().skip(1).cloned().collect();
        spec.cwd = Some(self.paths.work_dir.clone());
        let mut sink = LogSink::new(spec.program_name());
        let result = match self.runner.run_command_streaming(spec, &mut sink).await {
            Ok(result) => result,
            Err(err) => return RunOutcome::Aborted(err.into()),
        };

        info!("fsl_anat exited (status={:?})", result.status_code);
        if result.success() {
            return RunOutcome::Succeeded;
        }
        error!(
            "the command:\n {}\nfailed. see log for debugging.",
            prepared.command.join(" ")
        );
        if !result.stderr.trim().is_empty() {
            error!("{}", result.stderr.trim_end());
        }
        RunOutcome::ToolFailed {
            status_code: result.status_code,
        }
    }

    /// Run the whole pipeline. Archiving runs however the run ended.
    pub async fn run(&self) -> GearReport {
        let layout = match self.layout() {
            Ok(layout) => layout,
            Err(err) => {
                error!("{err}");
                error!("cannot execute fsl_anat commands");
                return GearReport {
                    outcome: RunOutcome::Aborted(err),
                    archive: None,
                };
            }
        };

        let outcome = match self.prepare(&layout) {
            Ok(prepared) => self.execute(&prepared).await,
            Err(err) => RunOutcome::Aborted(err),
        };
        match &outcome {
            RunOutcome::Succeeded => info!("commands successfully executed"),
            RunOutcome::DryRun => {}
            RunOutcome::ToolFailed { .. } => error!("fsl_anat did not complete successfully"),
            RunOutcome::Aborted(err) => {
                error!("{err}");
                error!("cannot execute fsl_anat commands");
            }
        }

        let archive = match archive_results(self.runner.as_ref(), &layout).await {
            Ok(report) => Some(report),
            Err(err) => {
                error!("archiving results failed: {err}");
                None
            }
        };
        GearReport { outcome, archive }
    }
}
