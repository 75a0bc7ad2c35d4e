//! Flag dictionary construction from the job configuration.

use crate::GearError;
use log::{debug, info, warn};
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Characters the wrapped tool parses safely; everything else is replaced.
static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9a-zA-Z./]+").expect("valid sanitize pattern"));

/// Input image flag.
pub const INPUT_FLAG: &str = "i";
/// Output prefix flag.
pub const OUTPUT_FLAG: &str = "o";

/// Value of a single command-line flag.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagValue {
    Bool(bool),
    Number(Number),
    Text(String),
}

impl FlagValue {
    /// Convert a scalar JSON value; arrays, objects and null have no flag form.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(value) => Some(Self::Bool(*value)),
            Value::Number(value) => Some(Self::Number(value.clone())),
            Value::String(value) => Some(Self::Text(value.clone())),
            _ => None,
        }
    }

    /// Numeric view of the value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => value.as_f64(),
            _ => None,
        }
    }

    /// Whether the value is a numeric zero ("use the tool default").
    pub fn is_zero(&self) -> bool {
        self.as_f64() == Some(0.0)
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Insertion-ordered flag name to value mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagMap {
    entries: Vec<(String, FlagValue)>,
}

impl FlagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a flag, replacing an existing value in place.
    ///
    /// Returns the previous value when the key was already present.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<FlagValue>,
    ) -> Option<FlagValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&FlagValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlagValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<FlagValue>> FromIterator<(K, V)> for FlagMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// Replace every run of unsafe characters with a single underscore.
pub fn sanitize_name(name: &str) -> String {
    UNSAFE_CHARS.replace_all(name, "_").into_owned()
}

/// Sanitized input file name used to name the result artifacts.
pub fn result_basename(file_name: &str) -> String {
    sanitize_name(file_name)
}

/// Make the input reachable through a path the tool can parse.
///
/// When sanitizing changes the path, the file is copied (never moved) to the
/// sanitized location and that path is returned.
pub fn stage_input(input_path: &Path) -> Result<PathBuf, GearError> {
    if !input_path.exists() {
        return Err(GearError::InputNotFound(input_path.to_path_buf()));
    }
    let original = input_path.to_string_lossy();
    let sanitized = PathBuf::from(sanitize_name(&original));
    if sanitized.as_path() == input_path {
        debug!("input path needs no staging: {}", input_path.display());
        return Ok(sanitized);
    }
    if let Some(parent) = sanitized.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(input_path, &sanitized)?;
    info!(
        "staged input under a tool-safe path (from={}, to={})",
        input_path.display(),
        sanitized.display()
    );
    Ok(sanitized)
}

/// Build the flag dictionary for one invocation.
///
/// `i` comes first, configuration entries follow in document order, and the
/// output prefix `o` is appended last. Booleans are kept only when true;
/// single-character keys are kept verbatim, zero included; longer keys are
/// dropped when zero so the tool applies its own default.
pub fn build_params(
    config: &Map<String, Value>,
    input_path: &Path,
    output_prefix: &Path,
) -> FlagMap {
    let mut params = FlagMap::new();
    params.insert(INPUT_FLAG, input_path.to_string_lossy().to_string());

    for (key, value) in config {
        let Some(flag) = FlagValue::from_json(value) else {
            warn!("skipping option without a flag form (key={key})");
            continue;
        };
        let keep = match &flag {
            FlagValue::Bool(enabled) => *enabled,
            _ if key.chars().count() == 1 => true,
            other => !other.is_zero(),
        };
        if keep {
            params.insert(key.as_str(), flag);
        } else {
            debug!("option left at tool default (key={key})");
        }
    }

    params.insert(OUTPUT_FLAG, output_prefix.to_string_lossy().to_string());
    debug!("flag dictionary built (flags={})", params.len());
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    fn config(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn sanitize_collapses_unsafe_runs() {
        assert_eq!(sanitize_name("T1 (scan) #2.nii.gz"), "T1_scan_2.nii.gz");
        assert_eq!(sanitize_name("/flywheel/v0/input/a b.nii"), "/flywheel/v0/input/a_b.nii");
        assert_eq!(sanitize_name("plain.nii"), "plain.nii");
    }

    #[test]
    fn result_basename_keeps_extension() {
        assert_eq!(result_basename("T1 scan.nii.gz"), "T1_scan.nii.gz");
        assert_eq!(result_basename("brain (run 2).NII"), "brain_run_2_.NII");
        assert_eq!(result_basename("notes.txt"), "notes.txt");
    }

    #[test]
    fn single_character_zero_is_kept() {
        let params = build_params(
            &config(json!({ "s": 0 })),
            Path::new("/in/t1.nii.gz"),
            Path::new("/work/t1_result"),
        );
        assert_eq!(params.get("s"), Some(&FlagValue::from(0_i64)));
    }

    #[test]
    fn multi_character_zero_is_dropped() {
        let params = build_params(
            &config(json!({ "betfparam": 0, "bias_iters": 0.0 })),
            Path::new("/in/t1.nii.gz"),
            Path::new("/work/t1_result"),
        );
        assert!(!params.contains_key("betfparam"));
        assert!(!params.contains_key("bias_iters"));
    }

    #[test]
    fn only_true_booleans_are_kept() {
        let params = build_params(
            &config(json!({ "nobias": true, "noseg": false, "b": false })),
            Path::new("/in/t1.nii.gz"),
            Path::new("/work/t1_result"),
        );
        let keys: Vec<&str> = params.keys().collect();
        assert_eq!(keys, vec!["i", "nobias", "o"]);
    }

    #[test]
    fn input_first_options_in_order_output_last() {
        let params = build_params(
            &config(json!({ "t": "T2", "weakbias": true, "betfparam": 0.4, "s": 20 })),
            Path::new("/in/t1.nii.gz"),
            Path::new("/work/t1_result"),
        );
        let keys: Vec<&str> = params.keys().collect();
        assert_eq!(keys, vec!["i", "t", "weakbias", "betfparam", "s", "o"]);
        assert_eq!(params.get("i"), Some(&FlagValue::from("/in/t1.nii.gz")));
        assert_eq!(params.get("o"), Some(&FlagValue::from("/work/t1_result")));
    }

    #[test]
    fn non_scalar_values_are_skipped() {
        let params = build_params(
            &config(json!({ "extra": [1, 2], "other": null })),
            Path::new("/in/t1.nii.gz"),
            Path::new("/work/t1_result"),
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut params: FlagMap = [("a", FlagValue::from(1_i64)), ("b", FlagValue::from(2_i64))]
            .into_iter()
            .collect();
        let previous = params.insert("a", 5_i64);
        assert_eq!(previous, Some(FlagValue::from(1_i64)));
        let entries: Vec<(&str, String)> =
            params.iter().map(|(key, value)| (key, value.to_string())).collect();
        assert_eq!(entries, vec![("a", "5".to_string()), ("b", "2".to_string())]);
    }

    #[test]
    fn stage_input_copies_to_sanitized_path() {
        let temp = tempdir().expect("tempdir");
        let original = temp.path().join("T1 scan.nii.gz");
        fs::write(&original, b"nifti").expect("write");
        if sanitize_name(&temp.path().to_string_lossy()) != temp.path().to_string_lossy() {
            return;
        }

        let staged = stage_input(&original).expect("stage");
        assert_eq!(staged, temp.path().join("T1_scan.nii.gz"));
        assert_eq!(fs::read(&staged).expect("read staged"), b"nifti".to_vec());
        assert!(original.exists());
    }

    #[test]
    fn stage_input_keeps_safe_path() {
        let temp = tempdir().expect("tempdir");
        let original = temp.path().join("t1.nii.gz");
        fs::write(&original, b"nifti").expect("write");
        if sanitize_name(&original.to_string_lossy()) != original.to_string_lossy() {
            // Temp roots with unsafe characters cannot exercise this path.
            return;
        }
        assert_eq!(stage_input(&original).expect("stage"), original);
    }

    #[test]
    fn stage_input_reports_missing_input() {
        let temp = tempdir().expect("tempdir");
        let err = stage_input(&temp.path().join("missing.nii")).expect_err("missing");
        assert!(matches!(err, GearError::InputNotFound(_)));
    }
}
