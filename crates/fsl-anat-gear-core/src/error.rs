//! Error types for the gear pipeline.

use fsl_anat_gear_config::ConfigError;
use fsl_anat_gear_runner::RunnerError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort the pipeline before or around the tool invocation.
#[derive(Debug, Error)]
pub enum GearError {
    /// The input image does not exist on disk.
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),
    /// A combination of flags the tool cannot run with.
    #[error("invalid flag combination: {0}")]
    InvalidFlagCombination(String),
    /// A flag the pipeline relies on is absent.
    #[error("missing flag: {0}")]
    MissingFlag(String),
    /// Job configuration error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Process runner error.
    #[error("runner error: {0}")]
    Runner(#[from] RunnerError),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Archiving the results failed.
    #[error("archive failed: {0}")]
    Archive(String),
}
