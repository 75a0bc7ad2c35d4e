//! Gear entry point: run `fsl_anat` for one Flywheel job.

use anyhow::Context;
use clap::Parser;
use fsl_anat_gear::config::{
    DEFAULT_BASE_DIR, DEFAULT_ENVIRON_PATH, DEFAULT_INPUT_NAME, GearConfig, GearPaths,
    load_environ,
};
use fsl_anat_gear::core::{DEFAULT_TOOL, Gear, GearOptions};
use fsl_anat_gear::runner::LocalProcessRunner;
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line options for the gear.
#[derive(Parser)]
#[command(name = "fsl-anat-gear", version)]
struct Cli {
    /// Gear root holding config.json, output/ and work/
    #[arg(long, env = "FLYWHEEL_BASE", default_value = DEFAULT_BASE_DIR)]
    base_dir: PathBuf,
    /// Job config path (defaults to <base-dir>/config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Runtime override files merged over the job config, in order
    #[arg(long = "override")]
    overrides: Vec<PathBuf>,
    /// Environment file the tool runs with
    #[arg(long, default_value = DEFAULT_ENVIRON_PATH)]
    environ: PathBuf,
    /// Output directory (defaults to <base-dir>/output)
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Work directory (defaults to <base-dir>/work)
    #[arg(long)]
    work_dir: Option<PathBuf>,
    /// Name of the input holding the anatomical image
    #[arg(long, default_value = DEFAULT_INPUT_NAME)]
    input_name: String,
    /// Program to invoke
    #[arg(long, default_value = DEFAULT_TOOL)]
    tool: PathBuf,
    /// Log the assembled command without running it
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn paths(&self) -> GearPaths {
        let mut paths = GearPaths::new(&self.base_dir).with_environ_path(&self.environ);
        if let Some(config) = &self.config {
            paths.config_path = config.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            paths.output_dir = output_dir.clone();
        }
        if let Some(work_dir) = &self.work_dir {
            paths.work_dir = work_dir.clone();
        }
        paths
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    fsl_anat_gear::init_logging();

    let cli = Cli::parse();
    let paths = cli.paths();
    info!(
        "starting gear (base_dir={}, overrides={}, dry_run={})",
        paths.base_dir.display(),
        cli.overrides.len(),
        cli.dry_run
    );

    let layered = GearConfig::load_layered(&paths.config_path, &cli.overrides)
        .with_context(|| format!("failed to load config {}", paths.config_path.display()))?;
    debug!("layered config loaded (layers={})", layered.layers.len());
    let environ = load_environ(&paths.environ_path)
        .with_context(|| format!("failed to load environ {}", paths.environ_path.display()))?;
    debug!("environment loaded (vars={})", environ.len());

    let options = GearOptions {
        tool: cli.tool,
        input_name: cli.input_name,
        dry_run: cli.dry_run,
    };
    let gear = Gear::new(
        paths,
        layered.config,
        environ,
        options,
        Arc::new(LocalProcessRunner::new()),
    );
    let report = gear.run().await;
    let code = report.exit_code();
    info!("gear finished (exit_code={code})");
    std::process::exit(code);
}
