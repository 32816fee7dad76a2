//! Test doubles shared by the executor and orchestrator tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use camino::Utf8PathBuf;
use parking_lot::Mutex;
use wr_core::{ChangeEvent, ChangeKind};

use crate::error::RunError;
use crate::launcher::ProcessLauncher;
use crate::report::Reporter;

/// A `WRITE` of `/tmp/test.go`.
pub fn event() -> ChangeEvent {
    ChangeEvent::with_timestamp(
        Utf8PathBuf::from("/tmp/test.go"),
        ChangeKind::Write,
        SystemTime::UNIX_EPOCH,
    )
}

#[derive(Default)]
struct LauncherState {
    calls: Mutex<Vec<Vec<String>>>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

/// Records launches instead of spawning processes.
///
/// Each launch sleeps for `delay`; a command whose first token is `fail`
/// exits with status 1.
#[derive(Clone, Default)]
pub struct RecordingLauncher {
    state: Arc<LauncherState>,
    delay: Duration,
}

impl RecordingLauncher {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            state: Arc::default(),
            delay,
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.state.calls.lock().clone()
    }

    pub fn peak(&self) -> usize {
        self.state.peak.load(Ordering::SeqCst)
    }
}

impl ProcessLauncher for RecordingLauncher {
    async fn launch(&self, tokens: &[String], _reporter: &dyn Reporter) -> Result<(), RunError> {
        self.state.calls.lock().push(tokens.to_vec());
        let running = self.state.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.peak.fetch_max(running, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.state.running.fetch_sub(1, Ordering::SeqCst);
        if tokens.first().is_some_and(|t| t == "fail") {
            Err(RunError::NonZeroExit(1))
        } else {
            Ok(())
        }
    }
}

/// Keeps every reporter call for inspection.
#[derive(Default)]
pub struct CollectingReporter {
    started: Mutex<Vec<String>>,
    dry_runs: Mutex<Vec<String>>,
    output: Mutex<Vec<(String, bool)>>,
    finished: Mutex<Vec<(String, i32)>>,
    summaries: Mutex<Vec<(usize, usize)>>,
    changes: AtomicUsize,
}

impl CollectingReporter {
    /// Returns a handle usable wherever the runner takes a reporter.
    pub fn shared(self: &Arc<Self>) -> Arc<dyn Reporter> {
        let reporter: Arc<Self> = Arc::clone(self);
        reporter
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().clone()
    }

    pub fn dry_runs(&self) -> Vec<String> {
        self.dry_runs.lock().clone()
    }

    pub fn output(&self) -> Vec<(String, bool)> {
        self.output.lock().clone()
    }

    pub fn finished(&self) -> Vec<(String, i32)> {
        self.finished.lock().clone()
    }

    pub fn summaries(&self) -> Vec<(usize, usize)> {
        self.summaries.lock().clone()
    }

    pub fn changes(&self) -> usize {
        self.changes.load(Ordering::SeqCst)
    }
}

impl Reporter for CollectingReporter {
    fn change_detected(&self, _event: &ChangeEvent) {
        self.changes.fetch_add(1, Ordering::SeqCst);
    }

    fn command_started(&self, command: &str) {
        self.started.lock().push(command.to_owned());
    }

    fn dry_run(&self, command: &str) {
        self.dry_runs.lock().push(command.to_owned());
    }

    fn command_output(&self, line: &str, is_error: bool) {
        self.output.lock().push((line.to_owned(), is_error));
    }

    fn command_finished(&self, command: &str, exit_code: i32, _duration: Duration) {
        self.finished.lock().push((command.to_owned(), exit_code));
    }

    fn summary(&self, succeeded: usize, total: usize) {
        self.summaries.lock().push((succeeded, total));
    }
}
