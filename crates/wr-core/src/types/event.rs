//! Change events published by the watcher.
//!
//! # Event Flow
//!
//! ```text
//! OS notification
//!        │
//!        ▼
//! filter (ignore rules, CHMOD)
//!        │
//!        ▼
//! debouncer (per-path quiet window)
//!        │
//!        ▼
//!   ChangeEvent created
//!        │
//!        ▼
//!   orchestrator runs commands
//! ```

use std::fmt;
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// The operation behind a change notification.
///
/// The label returned by [`as_str`](Self::as_str) is what `{event}` expands to
/// in command arguments.
///
/// # Examples
///
/// ```
/// use wr_core::ChangeKind;
///
/// assert_eq!(ChangeKind::Write.as_str(), "WRITE");
/// assert_eq!(ChangeKind::Create.to_string(), "CREATE");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ChangeKind {
    /// A file or directory was created.
    Create,
    /// File contents were written.
    Write,
    /// A file or directory was removed.
    Remove,
    /// A file or directory was renamed away from this path.
    Rename,
    /// Only permissions or other metadata changed.
    Chmod,
    /// The platform reported a change it could not classify.
    Other,
}

impl ChangeKind {
    /// Returns the upper-case label for this kind.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Write => "WRITE",
            Self::Remove => "REMOVE",
            Self::Rename => "RENAME",
            Self::Chmod => "CHMOD",
            Self::Other => "OTHER",
        }
    }

    /// Returns `true` for pure permission/metadata changes.
    #[inline]
    #[must_use]
    pub const fn is_chmod(self) -> bool {
        matches!(self, Self::Chmod)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One coalesced, user-visible filesystem change.
///
/// Created by the watcher only after the debounce window for its path has
/// elapsed, so a burst of notifications for one file yields a single event.
///
/// # Examples
///
/// ```
/// use wr_core::{ChangeEvent, ChangeKind};
/// use camino::Utf8PathBuf;
///
/// let event = ChangeEvent::new(Utf8PathBuf::from("/src/main.rs"), ChangeKind::Write);
/// assert_eq!(event.path.as_str(), "/src/main.rs");
/// assert_eq!(event.kind_label(), "WRITE");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Absolute path of the changed file or directory.
    pub path: Utf8PathBuf,

    /// The operation reported for the path.
    pub kind: ChangeKind,

    /// Wall-clock time the event was released by the debouncer.
    pub timestamp: SystemTime,
}

impl ChangeEvent {
    /// Creates an event stamped with the current time.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf, kind: ChangeKind) -> Self {
        Self {
            path,
            kind,
            timestamp: SystemTime::now(),
        }
    }

    /// Creates an event with an explicit timestamp.
    #[inline]
    #[must_use]
    pub const fn with_timestamp(path: Utf8PathBuf, kind: ChangeKind, timestamp: SystemTime) -> Self {
        Self {
            path,
            kind,
            timestamp,
        }
    }

    /// Returns the operation label (`CREATE`, `WRITE`, ...).
    #[inline]
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Returns the path as a borrowed [`Utf8Path`].
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}
