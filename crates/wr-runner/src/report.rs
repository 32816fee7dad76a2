//! Progress reporting for command runs.
//!
//! The executor and orchestrator never format output themselves; they call a
//! [`Reporter`]. [`TracingReporter`] maps every call onto a `tracing` event,
//! leaving styling to the installed subscriber.

use std::time::Duration;

use wr_core::{format_duration, ChangeEvent};

/// Receives progress notifications from the runner.
///
/// Implementations must be cheap and non-blocking: output lines are reported
/// from the tasks draining a child's pipes.
pub trait Reporter: Send + Sync + 'static {
    /// A change is about to trigger the configured commands.
    fn change_detected(&self, event: &ChangeEvent);

    /// A command is about to be spawned.
    fn command_started(&self, command: &str);

    /// A command would have been spawned, but this is a dry run.
    fn dry_run(&self, command: &str);

    /// One line of output; `is_error` marks stderr.
    fn command_output(&self, line: &str, is_error: bool);

    /// A command finished. `exit_code` is 0 on success.
    fn command_finished(&self, command: &str, exit_code: i32, duration: Duration);

    /// All commands for one change have finished.
    fn summary(&self, succeeded: usize, total: usize);
}

/// Reports through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn change_detected(&self, event: &ChangeEvent) {
        tracing::info!(path = %event.path, event = %event.kind, "File change detected");
    }

    fn command_started(&self, command: &str) {
        tracing::info!(command, "Starting command");
    }

    fn dry_run(&self, command: &str) {
        tracing::info!(command, "[dry-run] Would execute");
    }

    fn command_output(&self, line: &str, is_error: bool) {
        if is_error {
            tracing::warn!(stream = "stderr", "{line}");
        } else {
            tracing::info!(stream = "stdout", "{line}");
        }
    }

    fn command_finished(&self, command: &str, exit_code: i32, duration: Duration) {
        let elapsed = format_duration(duration);
        let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        if exit_code == 0 {
            tracing::info!(command, duration_ms, outcome = "success", "Command completed in {elapsed}");
        } else {
            tracing::error!(command, exit_code, duration_ms, "Command failed in {elapsed}");
        }
    }

    fn summary(&self, succeeded: usize, total: usize) {
        if succeeded == total {
            tracing::info!(succeeded, total, outcome = "success", "All commands completed successfully ({succeeded}/{total})");
        } else {
            tracing::error!(succeeded, total, "Some commands failed ({succeeded}/{total} succeeded)");
        }
    }
}
