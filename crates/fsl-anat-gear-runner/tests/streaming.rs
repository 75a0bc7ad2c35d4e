//! Runner behaviour through the public API.

use fsl_anat_gear_runner::{
    CommandOutputSink, CommandSpec, LocalProcessRunner, LogSink, ProcessRunner,
};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

/// Sink recording every chunk it receives, in order.
#[derive(Default)]
struct ChunkRecorder {
    chunks: Vec<(&'static str, String)>,
}

impl CommandOutputSink for ChunkRecorder {
    fn stdout(&mut self, chunk: &str) {
        self.chunks.push(("stdout", chunk.to_string()));
    }

    fn stderr(&mut self, chunk: &str) {
        self.chunks.push(("stderr", chunk.to_string()));
    }
}

/// Streaming delivers the same bytes as the captured result.
#[tokio::test]
async fn streaming_output_matches_captured_result() {
    let runner = LocalProcessRunner::new();
    let mut spec = CommandSpec::new("sh");
    spec.args.extend([
        "-c".to_string(),
        "echo line1; echo line2; echo problem 1>&2".to_string(),
    ]);

    let mut sink = ChunkRecorder::default();
    let result = runner
        .run_command_streaming(spec, &mut sink)
        .await
        .expect("run");

    let streamed_stdout: String = sink
        .chunks
        .iter()
        .filter(|(stream, _)| *stream == "stdout")
        .map(|(_, chunk)| chunk.as_str())
        .collect();
    assert_eq!(streamed_stdout, result.stdout);
    assert_eq!(result.stdout, "line1\nline2\n");
    assert_eq!(result.stderr, "problem\n");
    assert!(result.success());
}

/// The log sink accepts partial lines and flushes them at the end.
#[tokio::test]
async fn log_sink_handles_unterminated_output() {
    let runner = LocalProcessRunner::new();
    let path = std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".to_string());
    let mut spec = CommandSpec::new("sh")
        .with_isolated_env(BTreeMap::from([("PATH".to_string(), path)]));
    spec.args
        .extend(["-c".to_string(), "printf 'no newline'".to_string()]);

    let mut sink = LogSink::new("sh");
    let result = runner
        .run_command_streaming(spec, &mut sink)
        .await
        .expect("run");
    assert_eq!(result.stdout, "no newline");
    assert_eq!(result.status_code, Some(0));
}

/// Multi-byte characters survive a read boundary.
#[tokio::test]
async fn multibyte_output_across_read_boundary() {
    let runner = LocalProcessRunner::new();
    let mut spec = CommandSpec::new("sh");
    spec.args.extend([
        "-c".to_string(),
        "head -c 8191 /dev/zero | tr '\\0' a; printf '\\303\\251\\n'".to_string(),
    ]);

    let mut sink = ChunkRecorder::default();
    let result = runner
        .run_command_streaming(spec, &mut sink)
        .await
        .expect("run");

    assert_eq!(result.stdout.len(), 8191 + 3);
    assert!(result.stdout.ends_with("a\u{e9}\n"));
    assert!(!result.stdout.contains('\u{FFFD}'));
    let streamed: String = sink.chunks.iter().map(|(_, chunk)| chunk.as_str()).collect();
    assert_eq!(streamed, result.stdout);
}
