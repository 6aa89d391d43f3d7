//! Internal utilities for streaming command output to logs.
//!
//! This module handles reading from stdout/stderr pipes and logging
//! the output in real-time during command execution, capturing stdout
//! when a caller needs to inspect it, and feeding stdin from a reader.

use std::io::{self, BufRead, BufReader, Read, Write};

/// Type of output stream for logging purposes.
#[derive(Clone, Copy)]
pub(super) enum StreamType {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Extracts a human-readable message from a thread panic.
pub(super) fn panic_message(err: &(dyn std::any::Any + Send)) -> &str {
    err.downcast_ref::<&str>()
        .copied()
        .or_else(|| err.downcast_ref::<String>().map(|s| s.as_str()))
        .unwrap_or("unknown panic")
}

/// Reads from a pipe and logs each line in real-time.
///
/// - stdout is logged at INFO level, stderr at WARN level, so git, mysql
///   and drush progress is visible while a step runs.
/// - Binary data uses lossy UTF-8 conversion
/// - I/O errors stop reading but don't fail command execution
///   (command success is determined by exit status)
pub(super) fn read_pipe_to_log<R: Read>(pipe: Option<R>, stream_type: StreamType) {
    let Some(pipe) = pipe else {
        tracing::error!(
            stream = %stream_type,
            "pipe was None (unexpected: Stdio::piped() was set), no output will be captured"
        );
        return;
    };

    let mut reader = BufReader::new(pipe);
    let mut line_buf = Vec::new();

    loop {
        line_buf.clear();
        match reader.read_until(b'\n', &mut line_buf) {
            Ok(0) => break, // EOF
            Ok(_) => {
                let log_content = line_buf.strip_suffix(b"\n").unwrap_or(&line_buf);
                log_line(log_content, stream_type);
            }
            Err(e) => {
                tracing::error!(stream = %stream_type, error = %e, "I/O error, stopping read");
                break;
            }
        }
    }
}

/// Reads a pipe to completion and returns its content.
///
/// Lines are also echoed at TRACE level. Returns an empty string if the pipe
/// is missing or a read fails; the caller decides what empty output means.
pub(super) fn read_pipe_to_string<R: Read>(pipe: Option<R>) -> String {
    let Some(mut pipe) = pipe else {
        tracing::error!("stdout pipe was None (unexpected: Stdio::piped() was set)");
        return String::new();
    };

    let mut buf = Vec::new();
    if let Err(e) = pipe.read_to_end(&mut buf) {
        tracing::error!(error = %e, "I/O error while capturing stdout");
    }
    let text = String::from_utf8_lossy(&buf).into_owned();
    for line in text.lines() {
        tracing::trace!(stream = "stdout", "{}", line);
    }
    text
}

/// Copies `source` into the child's stdin and closes it.
///
/// A child that exits before consuming all input closes the pipe; that
/// surfaces here as `BrokenPipe` and is reported like any other write error.
pub(super) fn feed_stdin<W: Write>(
    mut source: Box<dyn Read + Send>,
    sink: Option<W>,
) -> io::Result<u64> {
    let Some(mut sink) = sink else {
        return Err(io::Error::other("stdin pipe was None (unexpected: Stdio::piped() was set)"));
    };
    let copied = io::copy(&mut source, &mut sink)?;
    sink.flush()?;
    Ok(copied)
}

/// Logs a complete line at the appropriate level.
///
/// Trailing CR is trimmed to handle CRLF line endings.
fn log_line(line: &[u8], stream_type: StreamType) {
    let text = String::from_utf8_lossy(line);
    let trimmed = text.trim_end_matches('\r');
    match stream_type {
        StreamType::Stdout => tracing::info!(stream = %stream_type, "{}", trimmed),
        StreamType::Stderr => tracing::warn!(stream = %stream_type, "{}", trimmed),
    }
}
