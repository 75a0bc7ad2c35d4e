//! Archiving of the tool's result directory.

use crate::{GearError, result_basename};
use fsl_anat_gear_runner::{CommandSpec, ProcessRunner, RunnerError};
use log::{debug, error, info, warn};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Suffix the tool appends to the output prefix.
const RESULT_DIR_SUFFIX: &str = ".anat";
/// External directory-listing utility used for manifests.
const MANIFEST_PROGRAM: &str = "tree";
/// External archiver.
const ZIP_PROGRAM: &str = "zip";

/// Where one run's results live and where their artifacts go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLayout {
    /// Sanitized input file name.
    pub basename: String,
    /// Directory the tool writes into.
    pub work_dir: PathBuf,
    /// Directory the platform collects from.
    pub output_dir: PathBuf,
}

impl ResultLayout {
    /// Layout for an input file name.
    pub fn new(
        input_file_name: &str,
        work_dir: impl AsRef<Path>,
        output_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            basename: result_basename(input_file_name),
            work_dir: work_dir.as_ref().to_path_buf(),
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// Prefix passed to the tool as `-o`.
    pub fn result_prefix(&self) -> PathBuf {
        self.work_dir.join(format!("{}_result", self.basename))
    }

    /// Name of the directory the tool creates under the work dir.
    pub fn result_dir_name(&self) -> String {
        format!("{}_result{RESULT_DIR_SUFFIX}", self.basename)
    }

    /// Directory the tool creates.
    pub fn result_dir(&self) -> PathBuf {
        self.work_dir.join(self.result_dir_name())
    }

    /// Zip archive written to the output dir.
    pub fn archive_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.zip", self.result_dir_name()))
    }

    /// Manifest listing written to the output dir.
    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_output_manifest.txt", self.basename))
    }
}

/// What archiving produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Manifest written, if any.
    pub manifest: Option<PathBuf>,
    /// Archive written, if any.
    pub archive: Option<PathBuf>,
    /// Whether the raw result directory was removed.
    pub removed: bool,
}

/// Archive the result directory with a manifest, then remove it.
///
/// Does nothing when the tool produced no result directory. The directory is
/// only removed once the archiver reports success.
pub async fn archive_results(
    runner: &dyn ProcessRunner,
    layout: &ResultLayout,
) -> Result<ArchiveReport, GearError> {
    let result_dir = layout.result_dir();
    if !result_dir.is_dir() {
        info!(
            "no results directory to zip (path={})",
            result_dir.display()
        );
        return Ok(ArchiveReport::default());
    }
    info!("zipping results directory (path={})", result_dir.display());
    fs::create_dir_all(&layout.output_dir)?;

    let manifest = layout.manifest_path();
    write_manifest(runner, &result_dir, &manifest).await?;

    let archive = layout.archive_path();
    if archive.exists() {
        debug!("removing stale archive (path={})", archive.display());
        fs::remove_file(&archive)?;
    }
    let mut spec = CommandSpec::new(ZIP_PROGRAM);
    spec.args.extend([
        "-r".to_string(),
        archive.to_string_lossy().to_string(),
        layout.result_dir_name(),
    ]);
    spec.cwd = Some(layout.work_dir.clone());
    info!("{}", spec.command_line());
    let result = runner.run_command(spec).await?;
    debug!("zip output (bytes={})", result.stdout.len());
    if !result.success() {
        error!("zip failed (status={:?})", result.status_code);
        return Err(GearError::Archive(format!(
            "zip exited with status {:?}: {}",
            result.status_code,
            result.stderr.trim_end()
        )));
    }

    fs::remove_dir_all(&result_dir)?;
    info!(
        "results archived (archive={}, manifest={})",
        archive.display(),
        manifest.display()
    );
    Ok(ArchiveReport {
        manifest: Some(manifest),
        archive: Some(archive),
        removed: true,
    })
}

/// Write the manifest from the listing utility, falling back to a built-in
/// listing when the utility is unavailable or fails.
async fn write_manifest(
    runner: &dyn ProcessRunner,
    result_dir: &Path,
    manifest: &Path,
) -> Result<(), GearError> {
    let mut spec = CommandSpec::new(MANIFEST_PROGRAM);
    spec.args.extend([
        "-shD".to_string(),
        result_dir.to_string_lossy().to_string(),
    ]);
    let listing = match runner.run_command(spec).await {
        Ok(result) if result.success() => result.stdout,
        Ok(result) => {
            warn!(
                "manifest listing failed; using built-in listing (status={:?})",
                result.status_code
            );
            builtin_listing(result_dir)?
        }
        Err(RunnerError::DependencyMissing(message)) => {
            debug!("{MANIFEST_PROGRAM} unavailable ({message}); using built-in listing");
            builtin_listing(result_dir)?
        }
        Err(err) => {
            warn!("manifest listing failed; using built-in listing ({err})");
            builtin_listing(result_dir)?
        }
    };
    fs::write(manifest, listing)?;
    debug!("manifest written (path={})", manifest.display());
    Ok(())
}

/// Recursive listing of `root` with human-readable sizes.
fn builtin_listing(root: &Path) -> Result<String, GearError> {
    let mut listing = format!("{}\n", root.display());
    let mut directories = 0usize;
    let mut files = 0usize;
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|err| GearError::Archive(err.to_string()))?;
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let metadata = entry
            .metadata()
            .map_err(|err| GearError::Archive(err.to_string()))?;
        if metadata.is_dir() {
            directories += 1;
            let _ = writeln!(listing, "[{:>6}]  {}/", "-", relative.display());
        } else {
            files += 1;
            let _ = writeln!(
                listing,
                "[{:>6}]  {}",
                human_size(metadata.len()),
                relative.display()
            );
        }
    }
    let _ = writeln!(listing, "\n{directories} directories, {files} files");
    Ok(listing)
}

/// Format a byte count the way `tree -h` does.
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["K", "M", "G", "T", "P"];
    if bytes < 1024 {
        return bytes.to_string();
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1}{}", UNITS[unit])
}
