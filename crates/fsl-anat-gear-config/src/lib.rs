//! Job configuration models and loading for the fsl-anat gear.
//!
//! This crate owns the `config.json` schema, runtime override layering, the
//! gear directory layout, and the environment side-channel file consumed
//! before the wrapped tool is invoked.

mod environ;
mod error;
mod loader;
mod model;

/// Environment side-channel loading.
pub use environ::load_environ;
/// Public error type returned by config loading and validation APIs.
pub use error::ConfigError;
/// Layered config types.
pub use loader::{ConfigLayer, ConfigLayerSource, LayeredConfig};
/// Configuration schema models.
pub use model::*;
