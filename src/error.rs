//! Domain-specific error types for rsdrupal.
//!
//! This module defines `RsdrupalError`, a `thiserror`-based enum that
//! provides typed error variants for the failure modes of a provisioning
//! run. Validation and loading return `Result<T, RsdrupalError>` directly,
//! while step boundaries use `anyhow::Result` and add step context.
//!
//! `RsdrupalError` implements `Into<anyhow::Error>`, so the `?` operator
//! converts it automatically, and callers can recover the typed variant with
//! `downcast_ref::<RsdrupalError>()`.

use std::io;

/// Formats an IO error kind into a human-readable message.
///
/// Provides consistent, user-friendly messages for common IO error kinds
/// (e.g., "I/O error: not found") instead of the OS-level messages
/// (e.g., "No such file or directory (os error 2)"). For unrecognized
/// error kinds, falls back to including the OS-level error message
/// directly.
pub(crate) fn io_error_kind_message(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "I/O error: not found".to_string(),
        io::ErrorKind::PermissionDenied => "I/O error: permission denied".to_string(),
        io::ErrorKind::IsADirectory => "I/O error: is a directory".to_string(),
        _ => format!("I/O error: {}", err),
    }
}

/// Domain-specific error type for rsdrupal.
///
/// Every variant is fatal to a provisioning run. Steps gated by a false
/// predicate are skipped and never produce one of these.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RsdrupalError {
    /// A validation constraint on the profile was violated.
    #[error("validation error: {0}")]
    Validation(String),

    /// A profile could not be loaded, or a configured value is unusable
    /// when the action needing it is attempted (e.g., unknown template variable).
    #[error("configuration error: {0}")]
    Config(String),

    /// An external command could not be located in `PATH`.
    #[error("command not found in PATH: {command}")]
    CommandNotFound {
        /// The command name that was looked up.
        command: String,
    },

    /// An external command failed (non-zero exit, spawn failure, stdin streaming failure).
    #[error("command execution failed: {command}: {status}")]
    Execution {
        /// The command that was executed.
        command: String,
        /// Human-readable reason for the failure.
        status: String,
    },

    /// The database could not be reached while inspecting target state.
    #[error("database connectivity error: {0}")]
    Connectivity(String),

    /// Populating the database failed (unreadable dump, installer failure).
    #[error("seeding error: {0}")]
    Seeding(String),

    /// A filesystem operation failed with contextual information.
    #[error("{context}: {message}")]
    Io {
        /// What was being done when the error occurred, usually including a path.
        context: String,
        /// Human-readable description derived from [`io_error_kind_message`].
        message: String,
        /// The underlying I/O error, preserved for programmatic inspection.
        #[source]
        source: std::io::Error,
    },
}

impl RsdrupalError {
    /// Creates an `Io` variant with the `message` field derived from `source`.
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            message: io_error_kind_message(&source),
            source,
        }
    }

    /// Creates an `Execution` variant from a command line and a status description.
    pub(crate) fn execution(command: impl Into<String>, status: impl Into<String>) -> Self {
        Self::Execution {
            command: command.into(),
            status: status.into(),
        }
    }
}
