//! Command execution for watchrun.
//!
//! Given a change event and the configured command list, this crate:
//!
//! 1. Substitutes `{path}` and `{event}` placeholders ([`resolve_placeholders`])
//! 2. Spawns each command through a [`ProcessLauncher`], forwarding its output
//!    line by line to a [`Reporter`]
//! 3. Enforces per-command timeouts and session cancellation
//!    ([`CommandExecutor`])
//! 4. Schedules the list sequentially or in parallel under a concurrency
//!    ceiling ([`Orchestrator`])
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use wr_core::{ChangeEvent, ChangeKind, Config};
//! use wr_runner::{Orchestrator, TracingReporter};
//!
//! # async fn example() -> Result<(), wr_core::ConfigError> {
//! let config = Config::load(camino::Utf8Path::new("watchrun.yaml"))?;
//! let orchestrator = Orchestrator::from_config(&config, false, false, Arc::new(TracingReporter));
//!
//! let event = ChangeEvent::new("src/lib.rs".into(), ChangeKind::Write);
//! for result in orchestrator.run(&event, &CancellationToken::new()).await {
//!     println!("{} -> {}", result.command_line(), result.exit_code);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod executor;
pub mod launcher;
pub mod orchestrator;
pub mod report;
pub mod result;
pub mod shell;

#[cfg(test)]
mod testing;

pub use command::{resolve_placeholders, EVENT_PLACEHOLDER, PATH_PLACEHOLDER};
pub use error::{RunError, SENTINEL_EXIT_CODE};
pub use executor::CommandExecutor;
pub use launcher::{ProcessLauncher, SystemLauncher};
pub use orchestrator::Orchestrator;
pub use report::{Reporter, TracingReporter};
pub use result::RunResult;
pub use shell::{needs_shell_interpretation, program_and_args};
