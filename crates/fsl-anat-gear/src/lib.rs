//! Public surface for the fsl-anat gear.
//!
//! Re-exports the building blocks and provides the logging setup shared by
//! the binary and anything embedding the pipeline.

/// Re-export for convenience.
pub use fsl_anat_gear_config as config;
pub use fsl_anat_gear_core as core;
/// Re-export for convenience.
pub use fsl_anat_gear_runner as runner;

use std::io::Write;

/// Tag prefixed to every log line.
pub const LOG_TAG: &str = "[flywheel:fsl-anat]";

/// Initialize env_logger with the gear's format.
///
/// Defaults to `info`; `RUST_LOG` overrides. Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format(|buf, record| {
            let timestamp = buf.timestamp_millis();
            writeln!(
                buf,
                "{LOG_TAG} {timestamp} {:<5} {}",
                record.level(),
                record.args()
            )
        })
        .try_init();
}
