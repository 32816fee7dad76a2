//! Configuration structures for watchrun.
//!
//! This module provides the configuration model consumed by the watcher and the
//! runner:
//!
//! - [`WatchRoot`] - a path to observe, its recursion flag and ignore patterns
//! - [`CommandSpec`] - one command to run on change
//! - [`ExecutionMode`] - sequential or bounded-parallel scheduling
//! - [`Config`] - the root configuration, loaded from YAML or JSON
//!
//! Loading applies defaults and validates, so the watcher and runner can treat
//! a [`Config`] as well-formed.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::duration::{parse_duration, DEFAULT_COMMAND_TIMEOUT};
use crate::error::ConfigError;

/// File name looked up when no configuration path is given.
pub const CONFIG_FILE_NAME: &str = "watchrun.yaml";

/// Per-root ignore file, one pattern per line.
pub const IGNORE_FILE_NAME: &str = ".watchrunignore";

/// Debounce window used when the configuration leaves it empty.
pub const DEFAULT_DEBOUNCE: &str = "250ms";

/// Concurrency ceiling used when the configuration leaves it unset.
pub const DEFAULT_MAX_CONCURRENCY: usize = 2;

/// How the configured commands are scheduled for one change event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Run in list order and stop at the first failure.
    Sequential,
    /// Run concurrently, bounded by `max_concurrency`.
    #[default]
    Parallel,
}

impl ExecutionMode {
    /// Returns the lower-case name used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
        }
    }
}

/// A path to observe.
///
/// # Examples
///
/// ```
/// use wr_core::WatchRoot;
///
/// let root = WatchRoot::new("./src").recursive().with_ignore(["*.tmp"]);
/// assert!(root.recursive);
/// assert_eq!(root.ignore, vec!["*.tmp"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRoot {
    /// File or directory to watch, relative to the working directory or absolute.
    pub path: Utf8PathBuf,

    /// Whether subdirectories are watched too.
    #[serde(default)]
    pub recursive: bool,

    /// Ignore patterns that apply beneath this root.
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl WatchRoot {
    /// Creates a non-recursive root with no ignore patterns.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            recursive: false,
            ignore: Vec::new(),
        }
    }

    /// Marks the root as recursive.
    #[must_use]
    pub const fn recursive(mut self) -> Self {
        self.recursive = true;
        self
    }

    /// Adds ignore patterns.
    #[must_use]
    pub fn with_ignore<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(patterns.into_iter().map(Into::into));
        self
    }
}

/// One command to run when a change is detected.
///
/// Tokens may contain the `{path}` and `{event}` placeholders.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use wr_core::CommandSpec;
///
/// let spec = CommandSpec::new(["cargo", "test"]).with_timeout("90s");
/// assert_eq!(spec.timeout_or_default(), Duration::from_secs(90));
/// assert_eq!(spec.display(), "cargo test");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Program followed by its arguments.
    pub cmd: Vec<String>,

    /// Declared scheduling mode.
    ///
    /// Shown by `test-config`; scheduling itself is chosen once for the whole
    /// command list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<ExecutionMode>,

    /// Timeout such as `"30s"`. Defaults to 60 seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

impl CommandSpec {
    /// Creates a command with no timeout and no declared mode.
    #[must_use]
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd: tokens.into_iter().map(Into::into).collect(),
            run: None,
            timeout: None,
        }
    }

    /// Sets the timeout string.
    #[must_use]
    pub fn with_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = Some(timeout.into());
        self
    }

    /// Sets the declared mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.run = Some(mode);
        self
    }

    /// Returns the configured timeout, or [`DEFAULT_COMMAND_TIMEOUT`] when it
    /// is missing or cannot be parsed.
    #[must_use]
    pub fn timeout_or_default(&self) -> Duration {
        self.timeout
            .as_deref()
            .and_then(|t| parse_duration("timeout", t).ok())
            .unwrap_or(DEFAULT_COMMAND_TIMEOUT)
    }

    /// Returns the tokens joined with spaces, for display.
    #[must_use]
    pub fn display(&self) -> String {
        self.cmd.join(" ")
    }
}

/// Commands triggered by a change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnChange {
    /// Commands in configured order.
    #[serde(default)]
    pub commands: Vec<CommandSpec>,
}

/// Root configuration for watchrun.
///
/// # Examples
///
/// ```
/// use wr_core::Config;
///
/// let yaml = r#"
/// watch:
///   - path: "."
///     recursive: true
/// on_change:
///   commands:
///     - cmd: ["echo", "{path}"]
/// "#;
/// let config: Config = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(config.debounce, "250ms");
/// assert_eq!(config.max_concurrency, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Paths to observe.
    pub watch: Vec<WatchRoot>,

    /// Ignore patterns applied to every root.
    pub ignore: Vec<String>,

    /// Commands to run on change.
    pub on_change: OnChange,

    /// Quiet period before a change is released, e.g. `"250ms"`.
    pub debounce: String,

    /// Maximum commands running at once in parallel mode.
    pub max_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch: Vec::new(),
            ignore: Vec::new(),
            on_change: OnChange::default(),
            debounce: DEFAULT_DEBOUNCE.to_owned(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl Config {
    /// Loads, defaults and validates a configuration file.
    ///
    /// Files ending in `.json` are parsed as JSON, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, a parse error if
    /// it is malformed, or a validation error from [`validate`](Self::validate).
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(path, &contents)?;
        config.apply_defaults();
        config.validate()?;
        tracing::debug!(path = %path, roots = config.watch.len(), "Loaded configuration");
        Ok(config)
    }

    fn parse(path: &Utf8Path, contents: &str) -> Result<Self, ConfigError> {
        if path.extension() == Some("json") {
            Ok(serde_json::from_str(contents)?)
        } else {
            Ok(serde_yaml::from_str(contents)?)
        }
    }

    /// Builds the single-root configuration used when the CLI is given a path
    /// and a command instead of a file.
    ///
    /// The command string is handed to the platform shell (`sh -c` on Unix,
    /// `cmd /C` on Windows).
    #[must_use]
    pub fn from_command_line(
        path: impl Into<Utf8PathBuf>,
        command: &str,
        debounce: impl Into<String>,
        timeout: impl Into<String>,
        max_concurrency: usize,
    ) -> Self {
        let tokens = if cfg!(windows) {
            ["cmd", "/C", command]
        } else {
            ["sh", "-c", command]
        };
        Self {
            watch: vec![WatchRoot::new(path).recursive()],
            ignore: Vec::new(),
            on_change: OnChange {
                commands: vec![CommandSpec::new(tokens).with_timeout(timeout)],
            },
            debounce: debounce.into(),
            max_concurrency,
        }
    }

    /// Fills in empty or zero values left by a partial file.
    pub fn apply_defaults(&mut self) {
        if self.debounce.trim().is_empty() {
            DEFAULT_DEBOUNCE.clone_into(&mut self.debounce);
        }
        if self.max_concurrency == 0 {
            self.max_concurrency = DEFAULT_MAX_CONCURRENCY;
        }
    }

    /// Checks the configuration before any watching starts.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: no watch roots, an empty or missing
    /// root path, an unparsable debounce or timeout, no commands, an empty
    /// command, or a concurrency ceiling below one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.is_empty() {
            return Err(ConfigError::invalid_option(
                "watch",
                "at least one watch path is required",
            ));
        }

        self.debounce_duration()?;

        for (index, root) in self.watch.iter().enumerate() {
            if root.path.as_str().is_empty() {
                return Err(ConfigError::invalid_option(
                    format!("watch[{index}].path"),
                    "path is empty",
                ));
            }
            if !root.path.exists() {
                return Err(ConfigError::MissingPath {
                    index,
                    path: root.path.clone(),
                });
            }
        }

        if self.on_change.commands.is_empty() {
            return Err(ConfigError::invalid_option(
                "on_change.commands",
                "at least one command is required",
            ));
        }

        for (index, command) in self.on_change.commands.iter().enumerate() {
            if command.cmd.is_empty() {
                return Err(ConfigError::invalid_option(
                    format!("on_change.commands[{index}].cmd"),
                    "cmd is empty",
                ));
            }
            if let Some(timeout) = &command.timeout {
                parse_duration(&format!("on_change.commands[{index}].timeout"), timeout)?;
            }
        }

        if self.max_concurrency < 1 {
            return Err(ConfigError::invalid_option(
                "max_concurrency",
                "must be at least 1",
            ));
        }

        Ok(())
    }

    /// Returns the parsed debounce window.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDuration`] if `debounce` is not a duration.
    pub fn debounce_duration(&self) -> Result<Duration, ConfigError> {
        parse_duration("debounce", &self.debounce)
    }
}
