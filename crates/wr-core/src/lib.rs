//! Core types, configuration, and errors for watchrun.
//!
//! This crate provides the foundational pieces shared across the workspace:
//!
//! - [`Config`] and its parts, loaded from YAML or JSON and validated up front
//! - [`ConfigError`] for every configuration failure
//! - Domain types ([`ChangeEvent`], [`ChangeKind`]) passed from the watcher to
//!   the runner
//! - Duration parsing for human-readable strings such as `250ms` or `1m30s`
//! - Project detection and configuration templates for `watchrun init`
//! - Type aliases for `FxHashMap`/`FxHashSet`
//!
//! # Crate Dependencies
//!
//! ```text
//! wr-cli ──► wr-runner ──► wr-core
//!        └─► wr-watcher ─►
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod duration;
pub mod error;
pub mod hash;
pub mod project;
pub mod types;

pub use config::{
    CommandSpec, Config, ExecutionMode, OnChange, WatchRoot, CONFIG_FILE_NAME,
    DEFAULT_DEBOUNCE, DEFAULT_MAX_CONCURRENCY, IGNORE_FILE_NAME,
};
pub use duration::{format_duration, parse_duration, DEFAULT_COMMAND_TIMEOUT};
pub use error::ConfigError;
pub use hash::{FxHashMap, FxHashSet};
pub use project::{write_example_ignore, write_template, ProjectKind};
pub use types::{ChangeEvent, ChangeKind};
