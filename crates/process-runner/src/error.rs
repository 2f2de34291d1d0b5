//! Error types for process execution

use std::fmt;
use std::sync::Arc;

use call_context::Cancelled;
use thiserror::Error;

use crate::process::ExitStatus;

/// Error type returned by [`Runner`](crate::Runner) implementations
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A cause that can be attached to any number of [`ProcessError`]s
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Causes originated by this crate
#[derive(Error, Debug)]
pub enum Error {
    /// The program could not be started
    #[error("failed to spawn {program}: {source}")]
    SpawnFailed {
        /// The program that failed to start
        program: String,
        /// The underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully
    #[error("{0}")]
    NonZeroExit(ExitStatus),

    /// The context was cancelled or timed out while the process ran
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// An empty argument vector was dispatched
    #[error("no command given")]
    EmptyCommand,

    /// Runner configuration could not be parsed
    #[error("invalid runner configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a spawn failed error
    pub fn spawn_failed(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            program: program.into(),
            source,
        }
    }

    /// Create a non-zero exit error from a raw exit code
    pub fn exit_code(code: i32) -> Self {
        Self::NonZeroExit(ExitStatus::from_code(code))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// A failed process invocation
///
/// Renders as `"<command line>: <cause>"`. Captured output never appears in the
/// message; it stays available in [`stdout`](Self::stdout) and
/// [`stderr`](Self::stderr).
#[derive(Debug, Clone)]
pub struct ProcessError {
    /// The space-joined command line
    pub command: String,
    /// Standard output captured before the failure
    pub stdout: String,
    /// Standard error captured before the failure
    pub stderr: String,
    cause: SharedError,
}

impl ProcessError {
    /// Create an error for `command` with no captured output
    pub fn new(command: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self::from_shared(command, SharedError::from(cause.into()))
    }

    /// Create an error whose cause is shared with other errors
    pub fn from_shared(command: impl Into<String>, cause: SharedError) -> Self {
        Self {
            command: command.into(),
            stdout: String::new(),
            stderr: String::new(),
            cause,
        }
    }

    /// Attach captured output
    pub fn with_output(mut self, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self.stderr = stderr.into();
        self
    }

    /// The underlying cause
    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.cause
    }

    /// The underlying cause as a shared handle
    pub fn shared_cause(&self) -> SharedError {
        Arc::clone(&self.cause)
    }

    /// Returns true if the process was stopped because its context ended
    pub fn is_cancelled(&self) -> bool {
        matches!(self.cause.downcast_ref::<Error>(), Some(Error::Cancelled(_)))
    }

    /// Exit status of the process, if it ran to completion
    pub fn exit_status(&self) -> Option<&ExitStatus> {
        match self.cause.downcast_ref::<Error>() {
            Some(Error::NonZeroExit(status)) => Some(status),
            _ => None,
        }
    }
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.command, self.cause)
    }
}

impl std::error::Error for ProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.cause)
    }
}
