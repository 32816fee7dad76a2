//! Outcome of one command execution.

use std::time::Duration;

use crate::error::RunError;

/// Outcome of one command execution.
///
/// `exit_code` is 0 on success, the process's own code when it exited
/// nonzero, and [`SENTINEL_EXIT_CODE`](crate::SENTINEL_EXIT_CODE) when the
/// command never produced one. Every non-zero outcome carries an `error`.
#[derive(Debug)]
pub struct RunResult {
    /// Tokens after placeholder substitution.
    pub command: Vec<String>,
    /// Exit code, or the sentinel.
    pub exit_code: i32,
    /// Wall-clock time from the spawn attempt to completion or timeout.
    pub duration: Duration,
    /// Failure detail, if any.
    pub error: Option<RunError>,
}

impl RunResult {
    /// Creates a successful result.
    #[must_use]
    pub const fn success(command: Vec<String>, duration: Duration) -> Self {
        Self {
            command,
            exit_code: 0,
            duration,
            error: None,
        }
    }

    /// Creates a failed result; the exit code is derived from `error`.
    #[must_use]
    pub const fn failure(command: Vec<String>, duration: Duration, error: RunError) -> Self {
        Self {
            command,
            exit_code: error.exit_code(),
            duration,
            error: Some(error),
        }
    }

    /// Returns `true` if the command exited with status 0.
    #[inline]
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// Returns `true` if the command was killed by its timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.error.as_ref().is_some_and(RunError::is_timeout)
    }

    /// Returns the tokens joined with spaces.
    #[must_use]
    pub fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_result() {
        let result = RunResult::success(vec!["true".to_owned()], Duration::from_millis(3));
        assert!(result.is_success());
        assert!(!result.is_timeout());
        assert!(result.error.is_none());
    }

    #[test]
    fn test_failure_result_codes() {
        let result = RunResult::failure(vec![], Duration::ZERO, RunError::EmptyCommand);
        assert_eq!(result.exit_code, -1);
        assert!(!result.is_success());

        let result = RunResult::failure(
            vec!["make".to_owned(), "test".to_owned()],
            Duration::ZERO,
            RunError::NonZeroExit(2),
        );
        assert_eq!(result.exit_code, 2);
        assert_eq!(result.command_line(), "make test");
    }

    #[test]
    fn test_timeout_result() {
        let result = RunResult::failure(
            vec!["sleep".to_owned()],
            Duration::from_millis(100),
            RunError::TimedOut(Duration::from_millis(100)),
        );
        assert!(result.is_timeout());
        assert_eq!(result.exit_code, -1);
    }
}
