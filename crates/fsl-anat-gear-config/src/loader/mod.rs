//! Job configuration loader with runtime override layers.
//!
//! Reads the platform's `config.json`, validates its schema, merges any
//! runtime override files over it in order, and produces the final
//! `GearConfig`.

mod merge;
mod schema;


use crate::{ConfigError, GearConfig};
use log::{debug, info};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: GearConfig,
    /// Metadata for each layer applied, in merge order.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// The job configuration written by the platform.
    Job,
    /// Runtime overrides (highest precedence).
    Runtime,
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    /// Layer origin.
    pub source: ConfigLayerSource,
    /// Location on disk.
    pub path: PathBuf,
}

/// Schema validation mode for config layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchemaMode {
    /// Partial validation for override layers.
    Partial,
    /// Full validation for the effective config.
    Full,
}

impl GearConfig {
    /// Load a single job config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading job config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a single job config from raw contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading job config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load the job config and merge runtime override files over it.
    ///
    /// Overrides are applied in the order given; later files win. Keys that
    /// already exist keep their position so option order stays stable.
    pub fn load_layered(
        job_path: impl AsRef<Path>,
        runtime_paths: &[PathBuf],
    ) -> Result<LayeredConfig, ConfigError> {
        let job_path = job_path.as_ref();
        let mut merged = load_layer_value(ConfigLayerSource::Job, job_path)?;
        let mut layers = vec![ConfigLayer {
            source: ConfigLayerSource::Job,
            path: job_path.to_path_buf(),
        }];

        for runtime_path in runtime_paths {
            let overlay = load_layer_value(ConfigLayerSource::Runtime, runtime_path)?;
            merge::merge_json_values(&mut merged, &overlay);
            debug!("merged runtime layer (path={})", runtime_path.display());
            layers.push(ConfigLayer {
                source: ConfigLayerSource::Runtime,
                path: runtime_path.clone(),
            });
        }

        let config = config_from_value(merged, "effective")?;
        info!(
            "job config loaded (layers={}, options={}, inputs={})",
            layers.len(),
            config.config.len(),
            config.inputs.len()
        );
        Ok(LayeredConfig { config, layers })
    }

    /// Validate invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, input) in &self.inputs {
            if input.location.name.trim().is_empty() {
                return Err(ConfigError::InvalidField {
                    path: format!("inputs.{name}.location.name"),
                    message: "input file name must not be empty".to_string(),
                });
            }
        }
        if self.config.keys().any(|key| key.is_empty()) {
            return Err(ConfigError::Invalid(
                "option names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Read and schema-check a single layer.
fn load_layer_value(source: ConfigLayerSource, path: &Path) -> Result<Value, ConfigError> {
    debug!(
        "loading config layer (source={:?}, path={})",
        source,
        path.display()
    );
    let contents = fs::read_to_string(path)?;
    let value: Value = json5::from_str(&contents)?;
    schema::validate_layer_schema(&value, SchemaMode::Partial, &layer_label(source, path))?;
    Ok(value)
}

/// Build a user-friendly label for schema validation errors.
fn layer_label(source: ConfigLayerSource, path: &Path) -> String {
    let name = match source {
        ConfigLayerSource::Job => "job",
        ConfigLayerSource::Runtime => "runtime",
    };
    format!("{name}({})", path.display())
}

fn config_from_value(value: Value, label: &str) -> Result<GearConfig, ConfigError> {
    schema::validate_layer_schema(&value, SchemaMode::Full, label)?;
    let config: GearConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
