//! Core pipeline for the fsl-anat gear.
//!
//! Turns the job configuration into an `fsl_anat` command line, runs it, and
//! archives whatever results the tool produced.

pub mod command;
pub mod error;
pub mod gear;
pub mod params;
pub mod results;
pub mod validate;

pub use command::build_command_list;
pub use error::GearError;
pub use gear::{DEFAULT_TOOL, Gear, GearOptions, GearReport, PreparedRun, RunOutcome};
pub use params::{FlagMap, FlagValue, build_params, result_basename, sanitize_name, stage_input};
pub use results::{ArchiveReport, ResultLayout, archive_results};
pub use validate::{ValidationWarning, validate_params};
