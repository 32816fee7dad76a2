//! The set of directories registered with the OS notification facility.

use camino::{Utf8Path, Utf8PathBuf};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use wr_core::FxHashSet;

use crate::error::WatchError;

struct Registrations {
    watcher: Option<RecommendedWatcher>,
    watched: FxHashSet<Utf8PathBuf>,
}

/// Owns the `notify` watcher and the paths registered with it.
///
/// Every path is watched non-recursively; recursive roots are covered by
/// registering each directory of the tree. Registration is idempotent: the
/// membership check, the OS call and the insert happen under one lock, so a
/// startup walk and a live `CREATE` for the same directory register it once.
pub struct WatchRegistry {
    inner: Mutex<Registrations>,
}

impl std::fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("WatchRegistry")
            .field("watched", &inner.watched.len())
            .field("closed", &inner.watcher.is_none())
            .finish()
    }
}

impl WatchRegistry {
    /// Wraps an OS watcher with an empty registration set.
    #[must_use]
    pub fn new(watcher: RecommendedWatcher) -> Self {
        Self {
            inner: Mutex::new(Registrations {
                watcher: Some(watcher),
                watched: FxHashSet::default(),
            }),
        }
    }

    /// Registers `path` unless it is already registered.
    ///
    /// Returns `true` if the path was newly registered.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Closed`] after [`close`](Self::close), or
    /// [`WatchError::Notify`] if the OS rejects the registration.
    pub fn register(&self, path: &Utf8Path) -> Result<bool, WatchError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if inner.watched.contains(path) {
            return Ok(false);
        }

        let watcher = inner.watcher.as_mut().ok_or(WatchError::Closed)?;
        watcher.watch(path.as_std_path(), RecursiveMode::NonRecursive)?;
        inner.watched.insert(path.to_path_buf());

        tracing::trace!(path = %path, "Registered watch");
        Ok(true)
    }

    /// Returns `true` if `path` is registered.
    #[must_use]
    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.inner.lock().watched.contains(path)
    }

    /// Returns the number of registered paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().watched.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the registered paths, sorted.
    #[must_use]
    pub fn watched_paths(&self) -> Vec<Utf8PathBuf> {
        let mut paths: Vec<_> = self.inner.lock().watched.iter().cloned().collect();
        paths.sort_unstable();
        paths
    }

    /// Releases the OS watcher. Later registrations fail with
    /// [`WatchError::Closed`].
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.watcher.take().is_some() {
            tracing::debug!(paths = inner.watched.len(), "Closed OS watcher");
        }
        inner.watched.clear();
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().watcher.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry() -> WatchRegistry {
        let watcher = notify::recommended_watcher(|_: notify::Result<notify::Event>| {})
            .expect("Failed to create OS watcher");
        WatchRegistry::new(watcher)
    }

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("Invalid path")
    }

    #[test]
    fn test_register_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = utf8(&dir);
        let registry = registry();

        assert!(registry.register(&path).unwrap());
        assert!(!registry.register(&path).unwrap());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&path));
    }

    #[test]
    fn test_register_missing_path_fails() {
        let registry = registry();
        let result = registry.register(Utf8Path::new("/nonexistent/watchrun/dir"));
        assert!(matches!(result, Err(WatchError::Notify(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_watched_paths_sorted() {
        let dir = TempDir::new().unwrap();
        let root = utf8(&dir);
        std::fs::create_dir(root.join("b")).unwrap();
        std::fs::create_dir(root.join("a")).unwrap();

        let registry = registry();
        registry.register(&root.join("b")).unwrap();
        registry.register(&root.join("a")).unwrap();

        assert_eq!(
            registry.watched_paths(),
            vec![root.join("a"), root.join("b")]
        );
    }

    #[test]
    fn test_close_rejects_registration() {
        let dir = TempDir::new().unwrap();
        let registry = registry();
        registry.close();

        assert!(registry.is_closed());
        assert!(matches!(
            registry.register(&utf8(&dir)),
            Err(WatchError::Closed)
        ));
    }
}
