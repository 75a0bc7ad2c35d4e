//! Environment side-channel file written by the container entrypoint.

use crate::ConfigError;
use log::{debug, info};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Load the environment mapping the wrapped tool runs with.
///
/// The file is a flat JSON object of variable name to value. Non-string
/// scalars are rendered to their string form; nested values are rejected.
pub fn load_environ(path: impl AsRef<Path>) -> Result<BTreeMap<String, String>, ConfigError> {
    let path = path.as_ref();
    info!("loading gear environment from path: {}", path.display());
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    let Value::Object(map) = value else {
        return Err(ConfigError::InvalidField {
            path: format!("environ({}):root", path.display()),
            message: "expected object".to_string(),
        });
    };

    let mut environ = BTreeMap::new();
    for (key, value) in map {
        let rendered = match value {
            Value::String(value) => value,
            Value::Number(value) => value.to_string(),
            Value::Bool(value) => value.to_string(),
            _ => {
                return Err(ConfigError::InvalidField {
                    path: format!("environ({}):{key}", path.display()),
                    message: "expected string".to_string(),
                });
            }
        };
        environ.insert(key, rendered);
    }
    debug!("gear environment loaded (keys={})", environ.len());
    Ok(environ)
}

#[cfg(test)]
mod tests {
    use super::load_environ;
    use crate::ConfigError;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn loads_flat_string_map() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("gear_environ.json");
        fs::write(
            &path,
            r#"{ "FSLDIR": "/usr/share/fsl", "PATH": "/usr/bin:/bin", "FSLMULTIFILEQUIT": true }"#,
        )
        .expect("write");

        let environ = load_environ(&path).expect("environ");
        assert_eq!(environ.get("FSLDIR"), Some(&"/usr/share/fsl".to_string()));
        assert_eq!(environ.get("PATH"), Some(&"/usr/bin:/bin".to_string()));
        assert_eq!(environ.get("FSLMULTIFILEQUIT"), Some(&"true".to_string()));
    }

    #[test]
    fn rejects_nested_values() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("gear_environ.json");
        fs::write(&path, r#"{ "PATH": ["/usr/bin"] }"#).expect("write");

        let err = load_environ(&path).unwrap_err();
        match err {
            ConfigError::InvalidField { path, message } => {
                assert!(path.ends_with(":PATH"));
                assert_eq!(message, "expected string");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_a_read_failure() {
        let temp = tempdir().expect("tempdir");
        let err = load_environ(temp.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFailed(_)));
    }
}
