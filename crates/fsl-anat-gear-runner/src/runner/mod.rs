//! Process runner traits and shared helpers.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::error::RunnerError;
use crate::types::{CommandResult, CommandSpec};

pub mod local;

/// Process runner interface.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run a command with streaming output.
    async fn run_command_streaming(
        &self,
        spec: CommandSpec,
        sink: &mut dyn CommandOutputSink,
    ) -> Result<CommandResult, RunnerError>;

    /// Run a command, capturing output.
    async fn run_command(&self, spec: CommandSpec) -> Result<CommandResult, RunnerError> {
        let mut sink = BufferingSink::default();
        self.run_command_streaming(spec, &mut sink).await
    }
}

/// Streaming output sink for commands.
pub trait CommandOutputSink: Send {
    /// Handle stdout chunk.
    fn stdout(&mut self, chunk: &str);
    /// Handle stderr chunk.
    fn stderr(&mut self, chunk: &str);
    /// Called once after both streams are closed.
    fn finish(&mut self) {}
}

/// Buffering sink that captures stdout/stderr for non-streaming runs.
#[derive(Debug, Default)]
pub struct BufferingSink {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutputSink for BufferingSink {
    /// Append stdout chunk.
    fn stdout(&mut self, chunk: &str) {
        self.stdout.push_str(chunk);
    }

    /// Append stderr chunk.
    fn stderr(&mut self, chunk: &str) {
        self.stderr.push_str(chunk);
    }
}

/// Sink that forwards complete output lines to the log.
///
/// Stdout lines are logged at info and stderr lines at warn, each prefixed
/// with the program label.
#[derive(Debug)]
pub struct LogSink {
    label: String,
    stdout_pending: String,
    stderr_pending: String,
}

impl LogSink {
    /// Create a sink labelling lines with `label`.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            stdout_pending: String::new(),
            stderr_pending: String::new(),
        }
    }
}

impl CommandOutputSink for LogSink {
    fn stdout(&mut self, chunk: &str) {
        self.stdout_pending.push_str(chunk);
        for line in drain_lines(&mut self.stdout_pending) {
            info!("[{}] {}", self.label, line);
        }
    }

    fn stderr(&mut self, chunk: &str) {
        self.stderr_pending.push_str(chunk);
        for line in drain_lines(&mut self.stderr_pending) {
            warn!("[{}] {}", self.label, line);
        }
    }

    fn finish(&mut self) {
        if !self.stdout_pending.is_empty() {
            info!("[{}] {}", self.label, self.stdout_pending);
            self.stdout_pending.clear();
        }
        if !self.stderr_pending.is_empty() {
            warn!("[{}] {}", self.label, self.stderr_pending);
            self.stderr_pending.clear();
        }
    }
}

/// Remove and return every complete line from `pending`.
fn drain_lines(pending: &mut String) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(idx) = pending.find('\n') {
        let line: String = pending.drain(..=idx).collect();
        lines.push(line.trim_end_matches(['\n', '\r']).to_string());
    }
    lines
}

/// Resolve the program a spec will execute.
///
/// Bare names are looked up on the `PATH` the child will see, so a missing
/// tool is reported before anything is spawned.
pub fn resolve_program(spec: &CommandSpec) -> Result<PathBuf, RunnerError> {
    let cwd = match &spec.cwd {
        Some(cwd) => cwd.clone(),
        None => std::env::current_dir()?,
    };
    if spec.command.is_absolute() || spec.command.components().count() > 1 {
        let path = normalize_path(&cwd.join(&spec.command));
        if path.is_file() {
            return Ok(path);
        }
        return Err(RunnerError::DependencyMissing(path.display().to_string()));
    }

    let search_path: Option<OsString> = match spec.env.get("PATH") {
        Some(path) => Some(OsString::from(path)),
        None if spec.inherit_env => std::env::var_os("PATH"),
        None => None,
    };
    which::which_in(&spec.command, search_path, &cwd).map_err(|err| {
        RunnerError::DependencyMissing(format!("{}: {err}", spec.command.display()))
    })
}

/// Run a command locally, streaming output into the sink.
async fn run_local_process(
    spec: CommandSpec,
    sink: &mut dyn CommandOutputSink,
) -> Result<CommandResult, RunnerError> {
    let program = resolve_program(&spec)?;
    debug!(
        "running local process (program={}, args_len={}, has_cwd={}, inherit_env={})",
        program.display(),
        spec.args.len(),
        spec.cwd.is_some(),
        spec.inherit_env
    );
    let mut command = Command::new(&program);
    command.args(&spec.args);
    if !spec.inherit_env {
        command.env_clear();
    }
    for (key, value) in &spec.env {
        command.env(key, value);
    }
    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }
    command.stdin(std::process::Stdio::null());
    command.stdout(std::process::Stdio::piped());
    command.stderr(std::process::Stdio::piped());

    let mut child = command.spawn().map_err(RunnerError::Io)?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (stdout_buf, stderr_buf) = stream_child_output(stdout, stderr, sink).await?;
    sink.finish();

    let status = child.wait().await.map_err(RunnerError::Io)?;
    debug!("local process exited (program={}, status={status})", program.display());

    Ok(CommandResult {
        status_code: status.code(),
        stdout: stdout_buf,
        stderr: stderr_buf,
    })
}

/// Stream child stdout/stderr while capturing full buffers.
pub async fn stream_child_output(
    stdout: Option<tokio::process::ChildStdout>,
    stderr: Option<tokio::process::ChildStderr>,
    sink: &mut dyn CommandOutputSink,
) -> Result<(String, String), RunnerError> {
    let mut stdout_buf = String::new();
    let mut stderr_buf = String::new();

    let mut stdout_reader = stdout.map(tokio::io::BufReader::new);
    let mut stderr_reader = stderr.map(tokio::io::BufReader::new);

    let mut stdout_done = stdout_reader.is_none();
    let mut stderr_done = stderr_reader.is_none();

    let mut stdout_chunk = vec![0u8; 8192];
    let mut stderr_chunk = vec![0u8; 8192];
    let mut stdout_pending = Vec::new();
    let mut stderr_pending = Vec::new();

    while !stdout_done || !stderr_done {
        tokio::select! {
            read = async {
                if let Some(reader) = stdout_reader.as_mut() {
                    reader.read(&mut stdout_chunk).await
                } else {
                    Ok(0)
                }
            }, if !stdout_done => {
                let read = read.map_err(RunnerError::Io)?;
                let chunk = if read == 0 {
                    stdout_done = true;
                    String::from_utf8_lossy(&std::mem::take(&mut stdout_pending)).into_owned()
                } else {
                    stdout_pending.extend_from_slice(&stdout_chunk[..read]);
                    take_complete_utf8(&mut stdout_pending)
                };
                if !chunk.is_empty() {
                    stdout_buf.push_str(&chunk);
                    sink.stdout(&chunk);
                }
            }
            read = async {
                if let Some(reader) = stderr_reader.as_mut() {
                    reader.read(&mut stderr_chunk).await
                } else {
                    Ok(0)
                }
            }, if !stderr_done => {
                let read = read.map_err(RunnerError::Io)?;
                let chunk = if read == 0 {
                    stderr_done = true;
                    String::from_utf8_lossy(&std::mem::take(&mut stderr_pending)).into_owned()
                } else {
                    stderr_pending.extend_from_slice(&stderr_chunk[..read]);
                    take_complete_utf8(&mut stderr_pending)
                };
                if !chunk.is_empty() {
                    stderr_buf.push_str(&chunk);
                    sink.stderr(&chunk);
                }
            }
        }
    }

    Ok((stdout_buf, stderr_buf))
}

/// Decode the complete characters in `pending`, leaving a trailing partial
/// UTF-8 sequence in place for the next read.
fn take_complete_utf8(pending: &mut Vec<u8>) -> String {
    let tail = incomplete_utf8_tail(pending);
    let rest = pending.split_off(pending.len() - tail);
    let text = String::from_utf8_lossy(pending).into_owned();
    *pending = rest;
    text
}

/// Length of a multi-byte sequence cut off at the end of `bytes`.
fn incomplete_utf8_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xF0..=0xF7 => 4,
            0xE0..=0xEF => 3,
            0xC0..=0xDF => 2,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}

/// Build a displayable command string relative to working directory.
pub fn command_display(command: &Path, working_dir: &Path) -> String {
    if command.is_absolute() {
        return command.display().to_string();
    }
    if command.components().count() > 1 {
        let absolute = normalize_path(&working_dir.join(command));
        return absolute.display().to_string();
    }
    command.display().to_string()
}

/// Normalize a path by resolving components.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(Path::new("/")),
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::{
        BufferingSink, CommandOutputSink, command_display, drain_lines, normalize_path,
        resolve_program, run_local_process, take_complete_utf8,
    };
    use crate::{CommandSpec, RunnerError};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    #[test]
    fn normalize_path_resolves_components() {
        let path = Path::new("/tmp/dir/../file.txt");
        assert_eq!(normalize_path(path), PathBuf::from("/tmp/file.txt"));
    }

    #[test]
    fn command_display_resolves_relative_paths() {
        let display = command_display(Path::new("bin/run"), Path::new("/tmp"));
        assert_eq!(display, "/tmp/bin/run".to_string());
        assert_eq!(
            command_display(Path::new("fsl_anat"), Path::new("/tmp")),
            "fsl_anat".to_string()
        );
    }

    #[test]
    fn drain_lines_keeps_partial_tail() {
        let mut pending = "first\r\nsecond\nthi".to_string();
        let lines = drain_lines(&mut pending);
        assert_eq!(lines, vec!["first".to_string(), "second".to_string()]);
        assert_eq!(pending, "thi");
    }

    #[test]
    fn resolve_program_rejects_missing_relative_path() {
        let temp = tempdir().expect("tempdir");
        let mut spec = CommandSpec::new("bin/missing-tool");
        spec.cwd = Some(temp.path().to_path_buf());
        let err = resolve_program(&spec).expect_err("missing");
        assert!(matches!(err, RunnerError::DependencyMissing(_)));
    }

    #[test]
    fn resolve_program_uses_isolated_path() {
        let temp = tempdir().expect("tempdir");
        let spec = CommandSpec::new("sh").with_isolated_env(BTreeMap::from([(
            "PATH".to_string(),
            temp.path().display().to_string(),
        )]));
        let err = resolve_program(&spec).expect_err("sh is not in an empty dir");
        assert!(matches!(err, RunnerError::DependencyMissing(_)));
    }

    #[tokio::test]
    async fn run_local_process_streams_output() {
        let mut spec = CommandSpec::new("sh");
        spec.args.extend([
            "-c".to_string(),
            "printf 'out'; printf 'err' 1>&2".to_string(),
        ]);

        #[derive(Default)]
        struct RecordingSink {
            stdout: String,
            stderr: String,
            finished: bool,
        }

        impl CommandOutputSink for RecordingSink {
            fn stdout(&mut self, chunk: &str) {
                self.stdout.push_str(chunk);
            }

            fn stderr(&mut self, chunk: &str) {
                self.stderr.push_str(chunk);
            }

            fn finish(&mut self) {
                self.finished = true;
            }
        }

        let mut sink = RecordingSink::default();
        let result = run_local_process(spec, &mut sink).await.expect("run");
        assert_eq!(result.stdout, "out");
        assert_eq!(result.stderr, "err");
        assert_eq!(sink.stdout, "out");
        assert_eq!(sink.stderr, "err");
        assert!(sink.finished);
        assert_eq!(result.status_code, Some(0));
    }

    #[tokio::test]
    async fn run_local_process_clears_env_when_isolated() {
        let path = std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".to_string());
        let spec = CommandSpec {
            args: vec!["-c".to_string(), "printf '%s' \"$GEAR_MARKER|$HOME\"".to_string()],
            ..CommandSpec::new("sh").with_isolated_env(BTreeMap::from([
                ("PATH".to_string(), path),
                ("GEAR_MARKER".to_string(), "set".to_string()),
            ]))
        };

        let mut sink = BufferingSink::default();
        let result = run_local_process(spec, &mut sink).await.expect("run");
        assert_eq!(result.stdout, "set|");
    }

    #[test]
    fn split_character_is_held_until_complete() {
        let bytes = "caf\u{e9}!".as_bytes();
        let mut pending = bytes[..4].to_vec();
        assert_eq!(take_complete_utf8(&mut pending), "caf");
        assert_eq!(pending, vec![0xC3]);

        pending.extend_from_slice(&bytes[4..]);
        assert_eq!(take_complete_utf8(&mut pending), "\u{e9}!");
        assert!(pending.is_empty());
    }

    #[test]
    fn four_byte_character_split_three_ways() {
        let bytes = "\u{1F9E0}".as_bytes();
        let mut pending = bytes[..1].to_vec();
        assert_eq!(take_complete_utf8(&mut pending), "");
        pending.extend_from_slice(&bytes[1..3]);
        assert_eq!(take_complete_utf8(&mut pending), "");
        pending.extend_from_slice(&bytes[3..]);
        assert_eq!(take_complete_utf8(&mut pending), "\u{1F9E0}");
    }

    #[test]
    fn invalid_bytes_are_still_replaced() {
        let mut pending = vec![b'a', 0xFF, b'b'];
        assert_eq!(take_complete_utf8(&mut pending), "a\u{FFFD}b");
        assert!(pending.is_empty());
    }
}
