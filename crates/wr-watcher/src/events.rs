//! Classification of raw `notify` events.
//!
//! # Event Flow
//!
//! ```text
//! notify::Event (one kind, one or two paths)
//!        │
//!        ▼
//!   classify() -> (path, ChangeKind) pairs
//!        │
//!        ▼
//!   ignore rules, CHMOD dropped
//!        │
//!        ▼
//!   PendingChange queued in the debouncer
//! ```

use std::path::PathBuf;

use camino::Utf8PathBuf;
use notify::event::{ModifyKind, RenameMode};
use notify::EventKind;
use smallvec::SmallVec;
use wr_core::{ChangeEvent, ChangeKind};

/// Classified paths from a single raw event.
///
/// Almost every event carries one path; a rename with both sides carries two.
pub type Classified = SmallVec<[(PathBuf, ChangeKind); 2]>;

/// Maps a raw notification onto [`ChangeKind`]s, one per affected path.
///
/// Access notifications are not changes and yield nothing. A rename reported
/// with both sides yields `RENAME` for the old name and `CREATE` for the new
/// one.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use notify::event::{CreateKind, EventKind};
/// use wr_core::ChangeKind;
/// use wr_watcher::classify;
///
/// let event = notify::Event::new(EventKind::Create(CreateKind::File))
///     .add_path(PathBuf::from("/src/main.rs"));
/// let classified = classify(event);
/// assert_eq!(classified[0].1, ChangeKind::Create);
/// ```
#[must_use]
pub fn classify(event: notify::Event) -> Classified {
    let kind = match event.kind {
        EventKind::Access(_) => return SmallVec::new(),
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            ChangeKind::Create
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut paths = event.paths.into_iter();
            let mut out = SmallVec::new();
            if let Some(from) = paths.next() {
                out.push((from, ChangeKind::Rename));
            }
            if let Some(to) = paths.next() {
                out.push((to, ChangeKind::Create));
            }
            return out;
        }
        EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Rename,
        EventKind::Modify(ModifyKind::Metadata(_)) => ChangeKind::Chmod,
        EventKind::Modify(_) => ChangeKind::Write,
        EventKind::Remove(_) => ChangeKind::Remove,
        _ => ChangeKind::Other,
    };

    event.paths.into_iter().map(|path| (path, kind)).collect()
}

/// A change waiting out its debounce window.
///
/// Only the newest pending change for a path survives; when the window
/// elapses it becomes a [`ChangeEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    /// Absolute path of the changed file or directory.
    pub path: Utf8PathBuf,
    /// The most recent operation seen for the path.
    pub kind: ChangeKind,
}

impl PendingChange {
    /// Creates a pending change.
    #[inline]
    #[must_use]
    pub const fn new(path: Utf8PathBuf, kind: ChangeKind) -> Self {
        Self { path, kind }
    }

    /// Stamps the change with the current time.
    #[inline]
    #[must_use]
    pub fn into_event(self) -> ChangeEvent {
        ChangeEvent::new(self.path, self.kind)
    }
}
