//! Process spawning.
//!
//! [`ProcessLauncher`] is the seam between the executor and the OS. The
//! executor layers placeholder substitution, timeouts and cancellation on top;
//! a launcher only has to start the program, stream its output and report how
//! it exited.

use std::future::Future;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;

use crate::error::RunError;
use crate::report::Reporter;
use crate::shell::program_and_args;

/// Starts a command and waits for it.
///
/// The returned future resolves to `Ok(())` when the command exited with
/// status 0. Dropping the future before it resolves must stop the command.
pub trait ProcessLauncher: Send + Sync + 'static {
    /// Runs `tokens` (program first) to completion, forwarding every output
    /// line to `reporter`.
    fn launch(
        &self,
        tokens: &[String],
        reporter: &dyn Reporter,
    ) -> impl Future<Output = Result<(), RunError>> + Send;
}

/// Launches real processes with `tokio::process`.
///
/// Children inherit the environment, get a null stdin and piped
/// stdout/stderr, and are killed when the launch future is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    async fn launch(&self, tokens: &[String], reporter: &dyn Reporter) -> Result<(), RunError> {
        let (program, args) = program_and_args(tokens, cfg!(windows)).ok_or(RunError::EmptyCommand)?;

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or(RunError::Pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(RunError::Pipe("stderr"))?;

        let (status, (), ()) = tokio::join!(
            child.wait(),
            forward_lines(stdout, false, reporter),
            forward_lines(stderr, true, reporter),
        );

        match status.map_err(RunError::Wait)?.code() {
            Some(0) => Ok(()),
            Some(code) => Err(RunError::NonZeroExit(code)),
            None => Err(RunError::Terminated),
        }
    }
}

/// Reports each line read from `reader` until EOF.
async fn forward_lines<R>(reader: R, is_error: bool, reporter: &dyn Reporter)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).split(b'\n');
    loop {
        match lines.next_segment().await {
            Ok(Some(mut line)) => {
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                reporter.command_output(&String::from_utf8_lossy(&line), is_error);
            }
            Ok(None) => break,
            Err(error) => {
                tracing::debug!(error = %error, is_error, "Output stream closed");
                break;
            }
        }
    }
}
