//! Error types for the wr-core crate.
//!
//! This module provides the [`ConfigError`] type for failures while loading,
//! validating, or generating configuration.

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// Every variant is a startup error: the watch session cannot begin until the
/// configuration is fixed, so callers surface these without retrying.
///
/// # Examples
///
/// ```
/// use wr_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::MissingPath {
///     index: 0,
///     path: Utf8PathBuf::from("/some/path"),
/// };
/// assert!(error.to_string().contains("/some/path"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The provided path is invalid or malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: Utf8PathBuf,
        /// Explanation of why the path is invalid.
        reason: String,
    },

    /// A configured watch path does not exist.
    #[error("watch path {index} does not exist: {path}")]
    MissingPath {
        /// Position of the watch root in the configuration.
        index: usize,
        /// The path that could not be found.
        path: Utf8PathBuf,
    },

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// A duration string could not be parsed.
    #[error("invalid duration for '{option}': '{value}' ({reason})")]
    InvalidDuration {
        /// The name of the option holding the duration.
        option: String,
        /// The raw value that failed to parse.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// An I/O error occurred while reading or writing configuration.
    #[error("failed to access configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a JSON configuration file.
    #[error("failed to parse JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to parse a YAML configuration file.
    #[error("failed to parse YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConfigError {
    /// Creates a [`ConfigError::InvalidOption`] error.
    #[must_use]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}
