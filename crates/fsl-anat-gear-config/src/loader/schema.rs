//! Schema validation helpers for the job configuration.

use super::SchemaMode;
use crate::{ConfigError, OptionKind, option_kind};
use serde_json::{Map, Value};

/// Validate a single config layer against the schema.
///
/// Only the tool options and the input fields the gear reads are checked.
/// Other platform-written keys pass through.
pub(super) fn validate_layer_schema(
    value: &Value,
    mode: SchemaMode,
    layer: &str,
) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, "")?;

    if let Some(value) = map.get("config") {
        validate_options(value, layer, "config")?;
    } else if mode == SchemaMode::Full {
        return Err(invalid_field(layer, "config", "missing required key"));
    }
    if let Some(value) = map.get("inputs") {
        validate_inputs(value, mode, layer, "inputs")?;
    }
    Ok(())
}

/// Validate the "config" block of tool options.
fn validate_options(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    for (key, value) in map {
        let option_path = join_path(path, key);
        match option_kind(key) {
            Some(OptionKind::Bool) => expect_bool(value, layer, &option_path)?,
            Some(OptionKind::Number) => expect_f64(value, layer, &option_path)?,
            Some(OptionKind::Choice(choices)) => {
                expect_choice(value, choices, layer, &option_path)?
            }
            None => expect_scalar(value, layer, &option_path)?,
        }
    }
    Ok(())
}

/// Validate the "inputs" block.
fn validate_inputs(
    value: &Value,
    mode: SchemaMode,
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    let map = expect_object(value, layer, path)?;
    for (name, entry) in map {
        let entry_path = join_path(path, name);
        let entry_map = expect_object(entry, layer, &entry_path)?;
        match entry_map.get("location") {
            Some(location) => validate_location(location, mode, layer, &entry_path)?,
            None if mode == SchemaMode::Full => {
                return Err(invalid_field(
                    layer,
                    &join_path(&entry_path, "location"),
                    "missing required key",
                ));
            }
            None => {}
        }
    }
    Ok(())
}

/// Validate an input's "location" block.
fn validate_location(
    value: &Value,
    mode: SchemaMode,
    layer: &str,
    entry_path: &str,
) -> Result<(), ConfigError> {
    let path = join_path(entry_path, "location");
    let map = expect_object(value, layer, &path)?;
    for key in ["path", "name"] {
        match map.get(key) {
            Some(value) => expect_string(value, layer, &join_path(&path, key))?,
            None if mode == SchemaMode::Full => {
                return Err(invalid_field(
                    layer,
                    &join_path(&path, key),
                    "missing required key",
                ));
            }
            None => {}
        }
    }
    Ok(())
}

/// Expect a JSON object or return a typed error.
fn expect_object<'a>(
    value: &'a Value,
    layer: &str,
    path: &str,
) -> Result<&'a Map<String, Value>, ConfigError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_field(layer, path, "expected object")),
    }
}

/// Expect a JSON string or return a typed error.
fn expect_string(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.as_str().is_some() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected string"))
    }
}

/// Expect a JSON boolean or return a typed error.
fn expect_bool(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if matches!(value, Value::Bool(_)) {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected bool"))
    }
}

/// Expect a JSON number or return a typed error.
fn expect_f64(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    if value.is_f64() || value.is_u64() || value.is_i64() {
        Ok(())
    } else {
        Err(invalid_field(layer, path, "expected number"))
    }
}

/// Expect one of a fixed set of strings.
fn expect_choice(
    value: &Value,
    choices: &[&str],
    layer: &str,
    path: &str,
) -> Result<(), ConfigError> {
    match value.as_str() {
        Some(choice) if choices.contains(&choice) => Ok(()),
        _ => Err(invalid_field(
            layer,
            path,
            &format!("expected one of {}", choices.join(", ")),
        )),
    }
}

/// Expect a value that can be rendered as a command-line flag.
fn expect_scalar(value: &Value, layer: &str, path: &str) -> Result<(), ConfigError> {
    match value {
        Value::Bool(_) | Value::Number(_) | Value::String(_) => Ok(()),
        _ => Err(invalid_field(layer, path, "expected bool, number, or string")),
    }
}

/// Join nested paths for better error messages.
fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Build a structured invalid-field error.
fn invalid_field(layer: &str, path: &str, message: &str) -> ConfigError {
    let normalized_path = if path.is_empty() { "root" } else { path };
    ConfigError::InvalidField {
        path: format!("{layer}:{normalized_path}"),
        message: message.to_string(),
    }
}
