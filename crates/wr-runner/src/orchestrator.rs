//! Running the configured command list for a change event.
//!
//! # Modes
//!
//! - **Sequential**: commands run in list order on the calling task; the first
//!   failure stops the chain and the partial results are returned.
//! - **Parallel**: every command is submitted at once and a counting semaphore
//!   keeps at most `max_concurrency` running. Results come back in command
//!   order. A command still waiting for a slot when the session is cancelled
//!   is abandoned and has no result.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use wr_core::{ChangeEvent, CommandSpec, Config, ExecutionMode};

use crate::executor::CommandExecutor;
use crate::launcher::{ProcessLauncher, SystemLauncher};
use crate::report::Reporter;
use crate::result::RunResult;

/// Runs every configured command for one change event.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use wr_core::{ChangeEvent, ChangeKind, Config};
/// use wr_runner::{Orchestrator, TracingReporter};
///
/// # async fn example(config: Config) {
/// let orchestrator = Orchestrator::from_config(&config, false, false, Arc::new(TracingReporter));
/// let event = ChangeEvent::new("/src/main.rs".into(), ChangeKind::Write);
///
/// let results = orchestrator.run(&event, &CancellationToken::new()).await;
/// println!("{} of {} succeeded", results.iter().filter(|r| r.is_success()).count(), results.len());
/// # }
/// ```
pub struct Orchestrator<L: ProcessLauncher = SystemLauncher> {
    executor: Arc<CommandExecutor<L>>,
    commands: Arc<[CommandSpec]>,
    mode: ExecutionMode,
    max_concurrency: usize,
}

impl<L: ProcessLauncher> std::fmt::Debug for Orchestrator<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("commands", &self.commands.len())
            .field("mode", &self.mode)
            .field("max_concurrency", &self.max_concurrency)
            .finish_non_exhaustive()
    }
}

impl Orchestrator<SystemLauncher> {
    /// Builds an orchestrator for the commands and concurrency ceiling of
    /// `config`.
    ///
    /// `sequential` selects the mode for the whole command list.
    #[must_use]
    pub fn from_config(
        config: &Config,
        sequential: bool,
        dry_run: bool,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let mode = if sequential {
            ExecutionMode::Sequential
        } else {
            ExecutionMode::Parallel
        };
        Self::new(
            CommandExecutor::system(reporter, dry_run),
            config.on_change.commands.clone(),
            mode,
            config.max_concurrency,
        )
    }
}

impl<L: ProcessLauncher> Orchestrator<L> {
    /// Creates an orchestrator. A ceiling of zero is treated as one.
    #[must_use]
    pub fn new(
        executor: CommandExecutor<L>,
        commands: Vec<CommandSpec>,
        mode: ExecutionMode,
        max_concurrency: usize,
    ) -> Self {
        Self {
            executor: Arc::new(executor),
            commands: commands.into(),
            mode,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Returns the scheduling mode.
    #[must_use]
    pub const fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Returns the configured commands.
    #[must_use]
    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// Runs every command for `event` and returns their results in command
    /// order.
    ///
    /// Abandoned commands (parallel mode, cancelled before a slot freed up) and
    /// commands skipped after a sequential failure are absent. No summary is
    /// reported when every command was abandoned.
    pub async fn run(&self, event: &ChangeEvent, cancel: &CancellationToken) -> Vec<RunResult> {
        if self.commands.is_empty() {
            tracing::warn!("No commands configured to run");
            return Vec::new();
        }

        let reporter = self.executor.reporter();
        reporter.change_detected(event);

        let results = match self.mode {
            ExecutionMode::Sequential => self.run_sequential(event, cancel).await,
            ExecutionMode::Parallel => self.run_parallel(event, cancel).await,
        };

        if results.is_empty() {
            tracing::warn!("Cancelled before any command started");
            return results;
        }

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        reporter.summary(succeeded, results.len());
        results
    }

    async fn run_sequential(&self, event: &ChangeEvent, cancel: &CancellationToken) -> Vec<RunResult> {
        let total = self.commands.len();
        let mut results = Vec::with_capacity(total);

        for (index, spec) in self.commands.iter().enumerate() {
            tracing::info!("Command {}/{}", index + 1, total);
            let result = self.executor.execute(spec, event, cancel).await;
            let failed = !result.is_success();
            results.push(result);
            if failed {
                tracing::error!("Command failed, stopping execution chain");
                break;
            }
        }

        results
    }

    async fn run_parallel(&self, event: &ChangeEvent, cancel: &CancellationToken) -> Vec<RunResult> {
        let total = self.commands.len();
        let slots_available = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = JoinSet::new();

        for index in 0..total {
            let executor = Arc::clone(&self.executor);
            let commands = Arc::clone(&self.commands);
            let semaphore = Arc::clone(&slots_available);
            let event = event.clone();
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    () = cancel.cancelled() => return (index, None),
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return (index, None),
                    },
                };

                let Some(spec) = commands.get(index) else {
                    return (index, None);
                };
                tracing::info!("Command {}/{} (parallel)", index + 1, total);
                let result = executor.execute(spec, &event, &cancel).await;
                drop(permit);
                (index, Some(result))
            });
        }

        let mut slots: Vec<Option<RunResult>> = std::iter::repeat_with(|| None).take(total).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = result;
                    }
                }
                Err(error) => tracing::error!(error = %error, "Command task failed"),
            }
        }

        let abandoned = slots.iter().filter(|s| s.is_none()).count();
        if abandoned > 0 {
            tracing::debug!(abandoned, "Commands abandoned before starting");
        }
        slots.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::error::RunError;
    use crate::testing::{event, CollectingReporter, RecordingLauncher};

    fn specs(commands: &[&[&str]]) -> Vec<CommandSpec> {
        commands
            .iter()
            .map(|tokens| CommandSpec::new(tokens.iter().copied()))
            .collect()
    }

    fn orchestrator(
        launcher: &RecordingLauncher,
        reporter: &Arc<CollectingReporter>,
        commands: Vec<CommandSpec>,
        mode: ExecutionMode,
        max_concurrency: usize,
    ) -> Orchestrator<RecordingLauncher> {
        let executor = CommandExecutor::new(launcher.clone(), reporter.shared(), false);
        Orchestrator::new(executor, commands, mode, max_concurrency)
    }

    #[tokio::test]
    async fn test_no_commands() {
        let launcher = RecordingLauncher::default();
        let reporter = Arc::new(CollectingReporter::default());
        let orch = orchestrator(&launcher, &reporter, Vec::new(), ExecutionMode::Parallel, 2);

        let results = orch.run(&event(), &CancellationToken::new()).await;
        assert!(results.is_empty());
        assert_eq!(reporter.changes(), 0);
        assert!(reporter.summaries().is_empty());
    }

    #[tokio::test]
    async fn test_sequential_runs_in_order() {
        let launcher = RecordingLauncher::default();
        let reporter = Arc::new(CollectingReporter::default());
        let commands = specs(&[&["echo", "first"], &["echo", "second"]]);
        let orch = orchestrator(&launcher, &reporter, commands, ExecutionMode::Sequential, 1);

        let results = orch.run(&event(), &CancellationToken::new()).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(RunResult::is_success));
        assert_eq!(
            launcher.calls(),
            vec![vec!["echo", "first"], vec!["echo", "second"]]
        );
        assert_eq!(reporter.changes(), 1);
        assert_eq!(reporter.summaries(), vec![(2, 2)]);
    }

    #[tokio::test]
    async fn test_sequential_stops_on_failure() {
        let launcher = RecordingLauncher::default();
        let reporter = Arc::new(CollectingReporter::default());
        let commands = specs(&[&["fail"], &["echo", "never"]]);
        let orch = orchestrator(&launcher, &reporter, commands, ExecutionMode::Sequential, 1);

        let results = orch.run(&event(), &CancellationToken::new()).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].exit_code, 1);
        assert_eq!(launcher.calls().len(), 1);
        assert_eq!(reporter.summaries(), vec![(0, 1)]);
    }

    #[tokio::test]
    async fn test_sequential_stops_on_real_failure() {
        let reporter: Arc<dyn Reporter> = Arc::new(CollectingReporter::default());
        let executor = CommandExecutor::system(reporter, false);
        let commands = specs(&[&["sh", "-c", "exit 1"], &["echo", "never"]]);
        let orch = Orchestrator::new(executor, commands, ExecutionMode::Sequential, 1);

        let results = orch.run(&event(), &CancellationToken::new()).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].exit_code, 1);
        assert!(results[0].error.is_some());
    }

    #[tokio::test]
    async fn test_parallel_respects_ceiling() {
        let launcher = RecordingLauncher::with_delay(Duration::from_millis(50));
        let reporter = Arc::new(CollectingReporter::default());
        let commands = specs(&[
            &["task", "0"],
            &["task", "1"],
            &["task", "2"],
            &["task", "3"],
            &["task", "4"],
        ]);
        let orch = orchestrator(&launcher, &reporter, commands, ExecutionMode::Parallel, 2);

        let results = orch.run(&event(), &CancellationToken::new()).await;

        assert!(launcher.peak() <= 2, "peak concurrency was {}", launcher.peak());
        assert_eq!(results.len(), 5);
        for (index, result) in results.iter().enumerate() {
            assert_eq!(result.command, vec!["task".to_owned(), index.to_string()]);
            assert!(result.is_success());
        }
        assert_eq!(reporter.summaries(), vec![(5, 5)]);
    }

    #[tokio::test]
    async fn test_parallel_failures_are_isolated() {
        let launcher = RecordingLauncher::default();
        let reporter = Arc::new(CollectingReporter::default());
        let commands = specs(&[&["fail"], &["echo", "ok"], &["fail"]]);
        let orch = orchestrator(&launcher, &reporter, commands, ExecutionMode::Parallel, 3);

        let results = orch.run(&event(), &CancellationToken::new()).await;
        let codes: Vec<_> = results.iter().map(|r| r.exit_code).collect();
        assert_eq!(codes, vec![1, 0, 1]);
        assert_eq!(reporter.summaries(), vec![(1, 3)]);
    }

    #[tokio::test]
    async fn test_parallel_cancel_abandons_waiting_commands() {
        let launcher = RecordingLauncher::with_delay(Duration::from_secs(5));
        let reporter = Arc::new(CollectingReporter::default());
        let commands = specs(&[&["slow", "0"], &["slow", "1"], &["slow", "2"]]);
        let orch = orchestrator(&launcher, &reporter, commands, ExecutionMode::Parallel, 1);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let results = tokio::time::timeout(Duration::from_secs(2), orch.run(&event(), &cancel))
            .await
            .expect("cancelled run should finish promptly");

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].error, Some(RunError::Cancelled)));
        assert_eq!(launcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_parallel_all_abandoned_skips_summary() {
        let launcher = RecordingLauncher::default();
        let reporter = Arc::new(CollectingReporter::default());
        let commands = specs(&[&["echo", "a"], &["echo", "b"]]);
        let orch = orchestrator(&launcher, &reporter, commands, ExecutionMode::Parallel, 2);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let results = orch.run(&event(), &cancel).await;

        assert!(results.is_empty());
        assert!(launcher.calls().is_empty());
        assert_eq!(reporter.changes(), 1);
        assert!(reporter.summaries().is_empty());
    }

    #[tokio::test]
    async fn test_sequential_cancelled_session_starts_nothing() {
        let launcher = RecordingLauncher::default();
        let reporter = Arc::new(CollectingReporter::default());
        let commands = specs(&[&["echo", "a"], &["echo", "b"]]);
        let orch = orchestrator(&launcher, &reporter, commands, ExecutionMode::Sequential, 1);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let results = orch.run(&event(), &cancel).await;

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].error, Some(RunError::Cancelled)));
        assert!(launcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_parallel() {
        let launcher = RecordingLauncher::default();
        let reporter: Arc<dyn Reporter> = Arc::new(CollectingReporter::default());
        let executor = CommandExecutor::new(launcher.clone(), reporter, true);
        let orch = Orchestrator::new(
            executor,
            specs(&[&["echo", "test"]]),
            ExecutionMode::Parallel,
            1,
        );

        let results = orch.run(&event(), &CancellationToken::new()).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].exit_code, 0);
        assert!(results[0].error.is_none());
        assert!(launcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_zero_ceiling_treated_as_one() {
        let launcher = RecordingLauncher::with_delay(Duration::from_millis(10));
        let reporter = Arc::new(CollectingReporter::default());
        let orch = orchestrator(
            &launcher,
            &reporter,
            specs(&[&["a"], &["b"]]),
            ExecutionMode::Parallel,
            0,
        );

        let results = orch.run(&event(), &CancellationToken::new()).await;
        assert_eq!(results.len(), 2);
        assert_eq!(launcher.peak(), 1);
    }
}
