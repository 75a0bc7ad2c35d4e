//! Process runner error types.

/// Errors returned by process runners.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Invalid command specification.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Program could not be found on the search path.
    #[error("dependency missing: {0}")]
    DependencyMissing(String),
}
