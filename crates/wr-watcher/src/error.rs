//! Error types for the wr-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while registering watch roots and processing notifications.

use camino::Utf8PathBuf;
use wr_core::ConfigError;

/// Errors that can occur during file watching operations.
///
/// # Error Recovery Strategy
///
/// - **Notify errors** ([`WatchError::Notify`]): Fatal at startup, logged once running
/// - **Path not found** ([`WatchError::PathNotFound`]): Fatal - roots must exist
/// - **Walk errors** ([`WatchError::Walk`]): Fatal at startup, logged for new directories
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): Recoverable - skip and continue
/// - **Closed** ([`WatchError::Closed`]): Fatal - the watcher was stopped
///
/// # Examples
///
/// ```
/// use wr_watcher::WatchError;
///
/// fn handle_watch_error(err: &WatchError) {
///     if err.is_fatal() {
///         eprintln!("Fatal watcher error: {err}");
///     } else {
///         eprintln!("Warning: {err}");
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// A configured watch root does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// Walking a directory tree for registration failed.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] ignore::Error),

    /// A path is not valid UTF-8.
    ///
    /// Notifications for such paths are logged and skipped.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration could not be turned into a watcher.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The watcher was stopped and no longer accepts registrations.
    #[error("watcher is closed")]
    Closed,

    /// [`start`](crate::WatchManager::start) was called twice.
    #[error("watcher already started")]
    AlreadyStarted,
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::NonUtf8Path`] error.
    #[inline]
    pub fn non_utf8_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::NonUtf8Path(path.into())
    }

    /// Returns `true` if this error is recoverable (watching can continue).
    ///
    /// Only non-UTF-8 path errors are recoverable, as the offending
    /// notification can be skipped.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_))
    }

    /// Returns `true` if this error is fatal (watching should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) => Some(path),
            Self::Notify(_)
            | Self::Walk(_)
            | Self::NonUtf8Path(_)
            | Self::Io(_)
            | Self::Config(_)
            | Self::Closed
            | Self::AlreadyStarted => None,
        }
    }
}
