//! Subprocess execution for the fsl-anat gear.

pub mod error;
pub mod runner;
pub mod types;

/// Runner error type.
pub use error::RunnerError;
/// Runner traits and helpers.
pub use runner::{
    BufferingSink, CommandOutputSink, LogSink, ProcessRunner, command_display,
    local::LocalProcessRunner, resolve_program,
};
/// Command execution types.
pub use types::{CommandResult, CommandSpec};
