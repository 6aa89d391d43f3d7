//! Real command executor implementation.
//!
//! This module provides [`RealCommandExecutor`], which executes commands
//! using `std::process::Command` with real-time output streaming, optional
//! stdout capture and optional stdin feeding.

use std::io;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::thread::JoinHandle;

use anyhow::Result;
use which::which;

use super::pipe::{StreamType, feed_stdin, panic_message, read_pipe_to_log, read_pipe_to_string};
use super::{CommandExecutor, CommandSpec, ExecutionResult};
use crate::error::RsdrupalError;

/// Joins a helper thread during cleanup, logging a panic instead of propagating it.
fn join_quietly<T>(handle: JoinHandle<T>) {
    if let Err(e) = handle.join() {
        tracing::warn!("helper thread panicked during cleanup: {}", panic_message(&*e));
    }
}

/// Kills a child process and waits for it so no zombie is left behind.
///
/// Called from error paths in [`RealCommandExecutor::execute()`] before the
/// helper threads are joined.
fn kill_child_process(child: &mut Child) {
    let pid = child.id();
    if let Err(e) = child.kill() {
        tracing::debug!(pid = pid, "kill returned error (process may have already exited): {}", e);
    }
    if let Err(e) = child.wait() {
        tracing::warn!(pid = pid, "failed to wait for child process after kill: {}", e);
    }
}

/// Command executor that runs actual system commands.
///
/// When `dry_run` is true, commands are logged but not executed,
/// and `execute()` returns `Ok(ExecutionResult { status: None, stdout: None })`.
pub struct RealCommandExecutor {
    pub dry_run: bool,
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        if self.dry_run {
            tracing::info!("dry run: {}", spec.display());
            return Ok(ExecutionResult::default());
        }

        let cmd = which(&spec.command).map_err(|_| RsdrupalError::CommandNotFound {
            command: spec.command.clone(),
        })?;
        tracing::trace!("command found: {}: {}", spec.command, cmd.to_string_lossy());

        // Open stdin before spawning so an unreadable file never starts the command
        let stdin_reader = spec.stdin.as_ref().map(|s| s.open()).transpose()?;

        let mut command = Command::new(cmd);
        command.args(&spec.args);

        if let Some(ref cwd) = spec.cwd {
            command.current_dir(cwd);
        }

        for (key, value) in &spec.env {
            command.env(key, value);
        }

        command.stdin(if stdin_reader.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| {
            RsdrupalError::execution(spec.display(), format!("failed to spawn: {}", e))
        })?;

        tracing::trace!("spawned command: {}: pid={}", spec.command, child.id());

        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let stdin_pipe = child.stdin.take();
        let capture = spec.capture_stdout;

        let stdout_handle = match thread::Builder::new()
            .name("stdout-reader".to_string())
            .spawn(move || {
                if capture {
                    Some(read_pipe_to_string(stdout_pipe))
                } else {
                    read_pipe_to_log(stdout_pipe, StreamType::Stdout);
                    None
                }
            }) {
            Ok(handle) => handle,
            Err(e) => {
                kill_child_process(&mut child);
                return Err(RsdrupalError::execution(
                    spec.display(),
                    format!("failed to spawn stdout reader thread: {}", e),
                )
                .into());
            }
        };

        let stderr_handle = match thread::Builder::new()
            .name("stderr-reader".to_string())
            .spawn(move || read_pipe_to_log(stderr_pipe, StreamType::Stderr))
        {
            Ok(handle) => handle,
            Err(e) => {
                kill_child_process(&mut child);
                join_quietly(stdout_handle);
                return Err(RsdrupalError::execution(
                    spec.display(),
                    format!("failed to spawn stderr reader thread: {}", e),
                )
                .into());
            }
        };

        let stdin_handle: Option<JoinHandle<io::Result<u64>>> = match stdin_reader {
            None => None,
            Some(reader) => match thread::Builder::new()
                .name("stdin-writer".to_string())
                .spawn(move || feed_stdin(reader, stdin_pipe))
            {
                Ok(handle) => Some(handle),
                Err(e) => {
                    kill_child_process(&mut child);
                    join_quietly(stdout_handle);
                    join_quietly(stderr_handle);
                    return Err(RsdrupalError::execution(
                        spec.display(),
                        format!("failed to spawn stdin writer thread: {}", e),
                    )
                    .into());
                }
            },
        };

        let status = match child.wait() {
            Ok(s) => s,
            Err(e) => {
                kill_child_process(&mut child);
                join_quietly(stdout_handle);
                join_quietly(stderr_handle);
                if let Some(handle) = stdin_handle {
                    join_quietly(handle);
                }
                return Err(RsdrupalError::execution(
                    spec.display(),
                    format!("failed to wait for command: {}", e),
                )
                .into());
            }
        };

        let mut panicked_streams = Vec::new();

        let stdout = match stdout_handle.join() {
            Ok(captured) => captured,
            Err(e) => {
                panicked_streams.push(format!("stdout: {}", panic_message(&*e)));
                None
            }
        };
        if let Err(e) = stderr_handle.join() {
            panicked_streams.push(format!("stderr: {}", panic_message(&*e)));
        }
        let stdin_outcome = match stdin_handle.map(JoinHandle::join) {
            None => None,
            Some(Ok(outcome)) => Some(outcome),
            Some(Err(e)) => {
                panicked_streams.push(format!("stdin: {}", panic_message(&*e)));
                None
            }
        };

        if !panicked_streams.is_empty() {
            tracing::error!(streams = ?panicked_streams, "helper thread panicked");
            return Err(RsdrupalError::execution(
                spec.display(),
                format!(
                    "helper thread(s) panicked during command execution: {}",
                    panicked_streams.join(", ")
                ),
            )
            .into());
        }

        // A failing exit status says more than the resulting broken pipe, so
        // stdin errors only matter when the command itself reported success.
        match stdin_outcome {
            Some(Err(e)) if status.success() => {
                return Err(RsdrupalError::execution(
                    spec.display(),
                    format!("failed to stream stdin: {}", e),
                )
                .into());
            }
            Some(Ok(bytes)) => {
                tracing::debug!("streamed {} byte(s) into {}", bytes, spec.command);
            }
            _ => {}
        }

        tracing::trace!("executed command: {}: success={}", spec.command, status.success());

        Ok(ExecutionResult {
            status: Some(status),
            stdout,
        })
    }
}
