//! Configuration schema for the fsl-anat gear.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default gear root inside the job container.
pub const DEFAULT_BASE_DIR: &str = "/flywheel/v0";
/// Default location of the environment side-channel file.
pub const DEFAULT_ENVIRON_PATH: &str = "/tmp/gear_environ.json";
/// Job configuration filename under the gear root.
pub const CONFIG_FILE: &str = "config.json";
/// Output directory name under the gear root.
pub const OUTPUT_DIR: &str = "output";
/// Work directory name under the gear root.
pub const WORK_DIR: &str = "work";
/// Input name the image is staged under.
pub const DEFAULT_INPUT_NAME: &str = "Image";

/// Parsed `config.json` for a single job.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GearConfig {
    /// Tool options in document order.
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Staged inputs keyed by input name.
    #[serde(default)]
    pub inputs: BTreeMap<String, GearInput>,
    /// Destination container, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Value>,
}

impl GearConfig {
    /// Look up a staged input by name.
    pub fn input(&self, name: &str) -> Result<&GearInput, ConfigError> {
        self.inputs
            .get(name)
            .ok_or_else(|| ConfigError::MissingInput(name.to_string()))
    }

    /// Resolved on-disk path of a staged input.
    pub fn input_path(&self, name: &str) -> Result<&Path, ConfigError> {
        Ok(self.input(name)?.location.path.as_path())
    }
}

/// A single staged input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GearInput {
    /// Platform input kind, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<Value>,
    pub location: InputLocation,
    /// Platform metadata for the file, unused by the gear.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
}

/// Where an input was staged and its original file name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputLocation {
    pub path: PathBuf,
    pub name: String,
}

/// Value type expected for a known tool option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    Number,
    /// String restricted to a fixed set of choices.
    Choice(&'static [&'static str]),
}

/// Options understood by `fsl_anat`, used for type checking.
///
/// Options not listed here are passed through to the tool unchecked.
pub const KNOWN_OPTIONS: &[(&str, OptionKind)] = &[
    ("clobber", OptionKind::Bool),
    ("strongbias", OptionKind::Bool),
    ("weakbias", OptionKind::Bool),
    ("noreorient", OptionKind::Bool),
    ("nocrop", OptionKind::Bool),
    ("nobias", OptionKind::Bool),
    ("noreg", OptionKind::Bool),
    ("nononlinreg", OptionKind::Bool),
    ("noseg", OptionKind::Bool),
    ("nosubcortseg", OptionKind::Bool),
    ("nosearch", OptionKind::Bool),
    ("nocleanup", OptionKind::Bool),
    ("betfparam", OptionKind::Number),
    ("s", OptionKind::Number),
    ("t", OptionKind::Choice(&["T1", "T2", "PD"])),
];

/// Expected kind for an option name, if it is a known option.
pub fn option_kind(name: &str) -> Option<OptionKind> {
    KNOWN_OPTIONS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, kind)| *kind)
}

/// Directory layout of a gear run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GearPaths {
    /// Gear root directory.
    pub base_dir: PathBuf,
    /// Job configuration file.
    pub config_path: PathBuf,
    /// Directory the platform collects results from.
    pub output_dir: PathBuf,
    /// Scratch directory the tool writes into.
    pub work_dir: PathBuf,
    /// Environment side-channel file.
    pub environ_path: PathBuf,
}

impl GearPaths {
    /// Standard layout rooted at `base_dir`.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        Self {
            config_path: base_dir.join(CONFIG_FILE),
            output_dir: base_dir.join(OUTPUT_DIR),
            work_dir: base_dir.join(WORK_DIR),
            environ_path: PathBuf::from(DEFAULT_ENVIRON_PATH),
            base_dir,
        }
    }

    /// Replace the environment side-channel file location.
    pub fn with_environ_path(mut self, path: impl AsRef<Path>) -> Self {
        self.environ_path = path.as_ref().to_path_buf();
        self
    }
}

impl Default for GearPaths {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_DIR)
    }
}
