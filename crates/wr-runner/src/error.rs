//! Error types for the wr-runner crate.
//!
//! This module provides the [`RunError`] type. A `RunError` never aborts a
//! run: it is attached to the [`RunResult`](crate::RunResult) of the command
//! that failed.

use std::io;
use std::time::Duration;

/// Why a command did not complete successfully.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use wr_runner::RunError;
///
/// let err = RunError::TimedOut(Duration::from_millis(100));
/// assert!(err.is_timeout());
/// assert_eq!(err.exit_code(), -1);
///
/// let err = RunError::NonZeroExit(2);
/// assert_eq!(err.exit_code(), 2);
/// ```
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The token list was empty after placeholder substitution.
    #[error("empty command")]
    EmptyCommand,

    /// The process could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// An output pipe could not be captured.
    #[error("failed to capture {0} pipe")]
    Pipe(&'static str),

    /// Waiting for the process failed.
    #[error("failed to wait for process: {0}")]
    Wait(#[source] io::Error),

    /// The process exited with a nonzero status.
    #[error("exited with status {0}")]
    NonZeroExit(i32),

    /// The process ended without an exit code (e.g. killed by a signal).
    #[error("terminated without an exit code")]
    Terminated,

    /// The command ran past its timeout and was killed.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// The session was cancelled while the command was running.
    #[error("cancelled")]
    Cancelled,
}

/// Exit code reported when a command could not produce its own.
pub const SENTINEL_EXIT_CODE: i32 = -1;

impl RunError {
    /// Returns `true` if the command was killed by its timeout.
    #[inline]
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    /// Returns the exit code to report for this error.
    ///
    /// The process's own code for [`RunError::NonZeroExit`], otherwise
    /// [`SENTINEL_EXIT_CODE`].
    #[inline]
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::NonZeroExit(code) => *code,
            _ => SENTINEL_EXIT_CODE,
        }
    }
}
