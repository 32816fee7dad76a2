//! Running a single command.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use wr_core::{ChangeEvent, CommandSpec};

use crate::command::resolve_placeholders;
use crate::error::RunError;
use crate::launcher::{ProcessLauncher, SystemLauncher};
use crate::report::Reporter;
use crate::result::RunResult;

/// Runs one [`CommandSpec`] for one [`ChangeEvent`].
///
/// Placeholders are substituted first. An empty token list fails without
/// spawning. In dry-run mode nothing is launched and a synthetic success is
/// returned. A command is never started once the session is cancelled.
/// Otherwise the command runs under its timeout, layered over the session's
/// cancellation token; whichever fires first ends it.
pub struct CommandExecutor<L = SystemLauncher> {
    launcher: L,
    reporter: Arc<dyn Reporter>,
    dry_run: bool,
}

impl<L> std::fmt::Debug for CommandExecutor<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandExecutor")
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl CommandExecutor<SystemLauncher> {
    /// Creates an executor that spawns real processes.
    #[must_use]
    pub fn system(reporter: Arc<dyn Reporter>, dry_run: bool) -> Self {
        Self::new(SystemLauncher, reporter, dry_run)
    }
}

impl<L: ProcessLauncher> CommandExecutor<L> {
    /// Creates an executor with a custom launcher.
    #[must_use]
    pub fn new(launcher: L, reporter: Arc<dyn Reporter>, dry_run: bool) -> Self {
        Self {
            launcher,
            reporter,
            dry_run,
        }
    }

    /// Returns the reporter shared with the orchestrator.
    #[must_use]
    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    /// Returns `true` if commands are only logged, never launched.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Runs `spec` for `event`. Never fails: problems are recorded in the
    /// returned [`RunResult`].
    pub async fn execute(
        &self,
        spec: &CommandSpec,
        event: &ChangeEvent,
        cancel: &CancellationToken,
    ) -> RunResult {
        let tokens = resolve_placeholders(&spec.cmd, event.path.as_str(), event.kind_label());

        if tokens.is_empty() {
            tracing::error!(path = %event.path, "Empty command, nothing to run");
            return RunResult::failure(tokens, Duration::ZERO, RunError::EmptyCommand);
        }

        let command_line = tokens.join(" ");

        if self.dry_run {
            self.reporter.dry_run(&command_line);
            return RunResult::success(tokens, Duration::ZERO);
        }

        if cancel.is_cancelled() {
            tracing::debug!(command = %command_line, "Session cancelled, not starting command");
            return RunResult::failure(tokens, Duration::ZERO, RunError::Cancelled);
        }

        let timeout = spec.timeout_or_default();
        self.reporter.command_started(&command_line);
        let started = Instant::now();

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(RunError::Cancelled),
            finished = tokio::time::timeout(timeout, self.launcher.launch(&tokens, self.reporter.as_ref())) => {
                finished.unwrap_or(Err(RunError::TimedOut(timeout)))
            }
        };

        let duration = started.elapsed();
        let result = match outcome {
            Ok(()) => RunResult::success(tokens, duration),
            Err(error) => {
                tracing::debug!(command = %command_line, error = %error, "Command did not succeed");
                RunResult::failure(tokens, duration, error)
            }
        };

        self.reporter
            .command_finished(&command_line, result.exit_code, duration);
        result
    }
}
