//! Watch tree management and the event loop.
//!
//! This module provides [`WatchManager`], which registers every configured
//! root with the OS, normalizes raw notifications and publishes debounced
//! [`ChangeEvent`]s on a bounded channel.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  unbounded   ┌──────────────────────────────────────┐
//! │ RecommendedWatcher│ ──────────► │ event loop (tokio task)              │
//! │ (notify callback)│   raw events │  classify ─► ignore ─► drop CHMOD    │
//! └──────────────────┘              │  new dir? ─► register subtree        │
//!                                   │  Debouncer::add(path, change)        │
//!                                   │                                      │
//!                                   │  released change ─► ChangeEvent      │
//!                                   └──────────────────┬───────────────────┘
//!                                                      │ mpsc (100)
//!                                                      ▼
//!                                               orchestrator loop
//! ```
//!
//! The loop ends when the cancellation token fires, when the consumer drops
//! the receiver, or when the OS watcher goes away.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wr_core::{ChangeEvent, ChangeKind, Config, WatchRoot};

use crate::debounce::Debouncer;
use crate::error::WatchError;
use crate::events::{classify, PendingChange};
use crate::filter::{FileFilter, IgnoreRules};
use crate::registry::WatchRegistry;

/// Capacity of the published event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

type RawEvent = notify::Result<notify::Event>;

/// Registers watch roots and streams debounced change events.
///
/// # Lifecycle
///
/// 1. **Creation**: [`from_config`](Self::from_config) or
///    [`with_filter`](Self::with_filter) resolves every root to an absolute
///    path. Missing roots fail here.
/// 2. **Start**: [`start`](Self::start) registers the roots (walking
///    recursive ones) and spawns the event loop.
/// 3. **Stop**: [`stop`](Self::stop), cancelling the token passed to
///    `start`, or dropping the manager ends the loop and releases the OS
///    watcher.
///
/// # Examples
///
/// ```no_run
/// use tokio_util::sync::CancellationToken;
/// use wr_core::Config;
/// use wr_watcher::WatchManager;
///
/// # async fn example(config: Config) -> Result<(), wr_watcher::WatchError> {
/// let cancel = CancellationToken::new();
/// let mut manager = WatchManager::from_config(&config)?;
/// let mut events = manager.start(&cancel)?;
///
/// while let Some(event) = events.recv().await {
///     println!("{} {}", event.kind, event.path);
/// }
/// # Ok(())
/// # }
/// ```
pub struct WatchManager<F: FileFilter = IgnoreRules> {
    roots: Vec<WatchRoot>,
    filter: Arc<F>,
    debounce: Duration,
    registry: Option<Arc<WatchRegistry>>,
    shutdown: CancellationToken,
}

impl<F: FileFilter> std::fmt::Debug for WatchManager<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchManager")
            .field("roots", &self.roots)
            .field("debounce", &self.debounce)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl WatchManager<IgnoreRules> {
    /// Creates a manager for the roots, ignore patterns and debounce window of
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if a root does not exist,
    /// [`WatchError::Config`] if the debounce window does not parse, or
    /// [`WatchError::Io`] if a root's ignore file cannot be read.
    pub fn from_config(config: &Config) -> Result<Self, WatchError> {
        let debounce = config.debounce_duration()?;
        let roots = resolve_roots(&config.watch)?;
        let rules = IgnoreRules::load(&roots, &config.ignore)?;
        Ok(Self::from_parts(roots, debounce, rules))
    }
}

impl<F: FileFilter> WatchManager<F> {
    /// Creates a manager with a custom filter.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if a root does not exist.
    pub fn with_filter(
        roots: &[WatchRoot],
        debounce: Duration,
        filter: F,
    ) -> Result<Self, WatchError> {
        let roots = resolve_roots(roots)?;
        Ok(Self::from_parts(roots, debounce, filter))
    }

    fn from_parts(roots: Vec<WatchRoot>, debounce: Duration, filter: F) -> Self {
        Self {
            roots,
            filter: Arc::new(filter),
            debounce,
            registry: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Registers every root and starts the event loop.
    ///
    /// Recursive directory roots are walked and every non-ignored directory is
    /// registered; an ignored directory prunes its subtree. Other roots are
    /// registered alone.
    ///
    /// The returned receiver yields events until `cancel` fires or
    /// [`stop`](Self::stop) is called.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::AlreadyStarted`] on a second call, or the first
    /// registration or walk failure.
    pub fn start(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<mpsc::Receiver<ChangeEvent>, WatchError> {
        if self.registry.is_some() {
            return Err(WatchError::AlreadyStarted);
        }

        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<RawEvent>();
        let watcher = notify::recommended_watcher(move |res: RawEvent| {
            // Closed only after the loop has exited.
            let _ = raw_tx.send(res);
        })?;
        let registry = Arc::new(WatchRegistry::new(watcher));

        for root in &self.roots {
            if root.recursive && root.path.is_dir() {
                let count = register_tree(&registry, &root.path, &self.filter)?;
                tracing::info!(path = %root.path, directories = count, "Watching recursively");
            } else {
                registry.register(&root.path)?;
                tracing::info!(path = %root.path, "Watching");
            }
        }

        self.shutdown = cancel.child_token();
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let event_loop = EventLoop {
            roots: self.roots.clone(),
            filter: Arc::clone(&self.filter),
            registry: Arc::clone(&registry),
            cancel: self.shutdown.clone(),
        };
        tokio::spawn(event_loop.run(self.debounce, raw_rx, event_tx));

        self.registry = Some(registry);
        Ok(event_rx)
    }

    /// Stops the event loop and releases the OS watcher.
    ///
    /// No events are published after this returns. Calling it more than once
    /// is harmless.
    pub fn stop(&self) {
        self.shutdown.cancel();
        if let Some(registry) = &self.registry {
            registry.close();
        }
    }

    /// Returns `true` if events for `path` would be dropped by the filter.
    #[must_use]
    pub fn should_ignore(&self, path: &Utf8Path) -> bool {
        !self.filter.should_process(path)
    }

    /// Returns the resolved roots.
    #[must_use]
    pub fn roots(&self) -> &[WatchRoot] {
        &self.roots
    }

    /// Returns the directories currently registered with the OS.
    #[must_use]
    pub fn watched_paths(&self) -> Vec<Utf8PathBuf> {
        self.registry
            .as_ref()
            .map(|r| r.watched_paths())
            .unwrap_or_default()
    }
}

impl<F: FileFilter> Drop for WatchManager<F> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Canonicalizes root paths, failing on the first one that does not exist.
fn resolve_roots(roots: &[WatchRoot]) -> Result<Vec<WatchRoot>, WatchError> {
    roots
        .iter()
        .map(|root| {
            let path = root
                .path
                .canonicalize_utf8()
                .map_err(|_| WatchError::path_not_found(root.path.clone()))?;
            Ok(WatchRoot {
                path,
                ..root.clone()
            })
        })
        .collect()
}

/// Registers `dir` and every directory beneath it that the filter accepts.
///
/// Returns the number of newly registered directories.
fn register_tree<F: FileFilter>(
    registry: &WatchRegistry,
    dir: &Utf8Path,
    filter: &Arc<F>,
) -> Result<usize, WatchError> {
    let entry_filter = Arc::clone(filter);
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            entry.depth() == 0
                || Utf8Path::from_path(entry.path()).is_some_and(|p| entry_filter.should_process(p))
        })
        .build();

    let mut count = 0;
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_some_and(|t| t.is_dir()) {
            continue;
        }
        let Some(path) = Utf8Path::from_path(entry.path()) else {
            tracing::warn!(path = %entry.path().display(), "Skipping non-UTF-8 directory");
            continue;
        };
        if registry.register(path)? {
            count += 1;
        }
    }
    Ok(count)
}

struct EventLoop<F> {
    roots: Vec<WatchRoot>,
    filter: Arc<F>,
    registry: Arc<WatchRegistry>,
    cancel: CancellationToken,
}

impl<F: FileFilter> EventLoop<F> {
    async fn run(
        self,
        debounce: Duration,
        mut raw_rx: mpsc::UnboundedReceiver<RawEvent>,
        event_tx: mpsc::Sender<ChangeEvent>,
    ) {
        let (release_tx, mut release_rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(debounce, release_tx);

        loop {
            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,

                raw = raw_rx.recv() => match raw {
                    Some(Ok(event)) => self.handle_raw(event, &debouncer).await,
                    Some(Err(error)) => tracing::warn!(error = %error, "File watcher error"),
                    None => {
                        tracing::debug!("OS watcher closed");
                        break;
                    }
                },

                Some(change) = release_rx.recv() => {
                    if !self.publish(&event_tx, change).await {
                        break;
                    }
                }
            }
        }

        debouncer.cancel_all();
        self.registry.close();
        tracing::debug!("Watch loop stopped");
    }

    /// Sends a released change; returns `false` once the loop should end.
    async fn publish(&self, event_tx: &mpsc::Sender<ChangeEvent>, change: PendingChange) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let event = change.into_event();
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            sent = event_tx.send(event) => {
                if sent.is_err() {
                    tracing::debug!("Event receiver dropped");
                }
                sent.is_ok()
            }
        }
    }

    async fn handle_raw(&self, event: notify::Event, debouncer: &Debouncer<Utf8PathBuf, PendingChange>) {
        for (path, kind) in classify(event) {
            let Some(path) = self.utf8_path(path) else {
                continue;
            };

            if !self.filter.should_process(&path) {
                tracing::trace!(path = %path, "Ignored change");
                continue;
            }
            if kind.is_chmod() {
                continue;
            }

            if kind == ChangeKind::Create && path.is_dir() && self.under_recursive_root(&path) {
                self.register_new_directory(&path).await;
            }

            debouncer.add(path.clone(), PendingChange::new(path, kind));
        }
    }

    /// Walks a new directory on the blocking pool and registers its subtree
    /// before the triggering change is debounced.
    async fn register_new_directory(&self, path: &Utf8Path) {
        let registry = Arc::clone(&self.registry);
        let filter = Arc::clone(&self.filter);
        let dir = path.to_path_buf();
        let walk = tokio::task::spawn_blocking(move || register_tree(&registry, &dir, &filter));

        match walk.await {
            Ok(Ok(count)) => tracing::debug!(path = %path, directories = count, "Watching new directory"),
            Ok(Err(error)) => tracing::warn!(path = %path, error = %error, "Failed to watch new directory"),
            Err(error) => tracing::error!(path = %path, error = %error, "Directory walk task failed"),
        }
    }

    fn utf8_path(&self, path: PathBuf) -> Option<Utf8PathBuf> {
        match Utf8PathBuf::try_from(path) {
            Ok(path) => Some(path),
            Err(error) => {
                let error = WatchError::non_utf8_path(error.into_path_buf());
                tracing::warn!(error = %error, "Skipping notification");
                None
            }
        }
    }

    fn under_recursive_root(&self, path: &Utf8Path) -> bool {
        self.roots
            .iter()
            .any(|root| root.recursive && path.starts_with(&root.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::AcceptAllFilter;
    use std::fs;
    use tempfile::TempDir;

    fn create_temp_dir() -> TempDir {
        TempDir::new().expect("Failed to create temp directory")
    }

    fn utf8(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("Invalid path")
    }

    fn manager(mut root: WatchRoot) -> WatchManager<IgnoreRules> {
        root.path = root.path.canonicalize_utf8().expect("Invalid root");
        let rules = IgnoreRules::new(
            std::slice::from_ref(&root),
            &[],
            crate::filter::Platform::current(),
        );
        WatchManager::with_filter(&[root], Duration::from_millis(50), rules)
            .expect("Failed to create manager")
    }

    /// Collects events until one matches or the deadline passes.
    async fn wait_for(
        events: &mut mpsc::Receiver<ChangeEvent>,
        mut pred: impl FnMut(&ChangeEvent) -> bool,
    ) -> Option<ChangeEvent> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        loop {
            match tokio::time::timeout_at(deadline, events.recv()).await {
                Ok(Some(event)) if pred(&event) => return Some(event),
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => return None,
            }
        }
    }

    struct LoopFixture {
        event_loop: EventLoop<IgnoreRules>,
        debouncer: Debouncer<Utf8PathBuf, PendingChange>,
        _release_rx: mpsc::UnboundedReceiver<PendingChange>,
    }

    /// Builds an event loop over `root` without spawning it. Only `root`
    /// itself is registered.
    fn loop_fixture(mut root: WatchRoot) -> LoopFixture {
        root.path = root.path.canonicalize_utf8().expect("Invalid root");
        let watcher = notify::recommended_watcher(|_: RawEvent| {}).expect("Failed to create watcher");
        let registry = Arc::new(WatchRegistry::new(watcher));
        registry.register(&root.path).expect("Failed to register root");

        let rules = IgnoreRules::new(std::slice::from_ref(&root), &[], crate::filter::Platform::current());
        let (release_tx, release_rx) = mpsc::unbounded_channel();

        LoopFixture {
            event_loop: EventLoop {
                roots: vec![root],
                filter: Arc::new(rules),
                registry,
                cancel: CancellationToken::new(),
            },
            debouncer: Debouncer::new(Duration::from_secs(60), release_tx),
            _release_rx: release_rx,
        }
    }

    fn raw_event(kind: notify::EventKind, path: &Utf8Path) -> notify::Event {
        notify::Event::new(kind).add_path(path.as_std_path().to_path_buf())
    }

    #[tokio::test]
    async fn test_chmod_never_reaches_debouncer() {
        use notify::event::{MetadataKind, ModifyKind};

        let dir = create_temp_dir();
        let fixture = loop_fixture(WatchRoot::new(utf8(&dir)).recursive());
        let file = fixture.event_loop.roots[0].path.join("script.sh");
        fs::write(&file, "#!/bin/sh\n").unwrap();

        let chmod = raw_event(
            notify::EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            &file,
        );
        fixture.event_loop.handle_raw(chmod, &fixture.debouncer).await;
        assert_eq!(fixture.debouncer.pending_len(), 0);

        let write = raw_event(
            notify::EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Content)),
            &file,
        );
        fixture.event_loop.handle_raw(write, &fixture.debouncer).await;
        assert_eq!(fixture.debouncer.pending_len(), 1);
    }

    #[tokio::test]
    async fn test_new_directory_under_non_recursive_root_not_registered() {
        let dir = create_temp_dir();
        let fixture = loop_fixture(WatchRoot::new(utf8(&dir)));
        let fresh = fixture.event_loop.roots[0].path.join("fresh");
        fs::create_dir(&fresh).unwrap();

        let before = fixture.event_loop.registry.len();
        let create = raw_event(
            notify::EventKind::Create(notify::event::CreateKind::Folder),
            &fresh,
        );
        fixture.event_loop.handle_raw(create, &fixture.debouncer).await;

        assert_eq!(fixture.event_loop.registry.len(), before);
        assert!(!fixture.event_loop.registry.contains(&fresh));
        assert_eq!(fixture.debouncer.pending_len(), 1);
    }

    #[tokio::test]
    async fn test_new_directory_under_recursive_root_registered_with_subtree() {
        let dir = create_temp_dir();
        let fixture = loop_fixture(WatchRoot::new(utf8(&dir)).recursive());
        let fresh = fixture.event_loop.roots[0].path.join("fresh");
        fs::create_dir_all(fresh.join("a/b")).unwrap();

        let create = raw_event(
            notify::EventKind::Create(notify::event::CreateKind::Folder),
            &fresh,
        );
        fixture.event_loop.handle_raw(create, &fixture.debouncer).await;

        let registry = &fixture.event_loop.registry;
        assert!(registry.contains(&fresh));
        assert!(registry.contains(&fresh.join("a")));
        assert!(registry.contains(&fresh.join("a/b")));
        assert_eq!(registry.len(), 4);
    }

    #[tokio::test]
    async fn test_missing_root() {
        let root = WatchRoot::new("/nonexistent/path/that/does/not/exist");
        let result = WatchManager::with_filter(&[root], Duration::from_millis(50), AcceptAllFilter);
        match result {
            Err(WatchError::PathNotFound(path)) => assert!(path.as_str().contains("nonexistent")),
            other => panic!("Expected PathNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_from_config_rejects_bad_debounce() {
        let dir = create_temp_dir();
        let config = Config {
            watch: vec![WatchRoot::new(utf8(&dir))],
            debounce: "soon".to_owned(),
            ..Config::default()
        };
        assert!(matches!(
            WatchManager::from_config(&config),
            Err(WatchError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_start_registers_tree_and_prunes_ignored() {
        let dir = create_temp_dir();
        let root = utf8(&dir);
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join("vendor/pkg")).unwrap();
        fs::create_dir_all(root.join(".git/objects")).unwrap();

        let mut manager = manager(WatchRoot::new(root).recursive().with_ignore(["vendor/**"]));
        let canonical = manager.roots()[0].path.clone();
        let cancel = CancellationToken::new();
        let _events = manager.start(&cancel).expect("Failed to start");

        let watched = manager.watched_paths();
        assert!(watched.contains(&canonical));
        assert!(watched.contains(&canonical.join("src")));
        assert!(watched.contains(&canonical.join("src/nested")));
        assert!(!watched.iter().any(|p| p.as_str().contains("vendor")));
        assert!(!watched.iter().any(|p| p.as_str().contains(".git")));

        manager.stop();
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let dir = create_temp_dir();
        let mut manager = manager(WatchRoot::new(utf8(&dir)));
        let cancel = CancellationToken::new();
        let _events = manager.start(&cancel).expect("Failed to start");
        assert!(matches!(
            manager.start(&cancel),
            Err(WatchError::AlreadyStarted)
        ));
    }

    #[tokio::test]
    async fn test_non_recursive_root_registers_only_itself() {
        let dir = create_temp_dir();
        let root = utf8(&dir);
        fs::create_dir(root.join("sub")).unwrap();

        let mut manager = manager(WatchRoot::new(root));
        let cancel = CancellationToken::new();
        let _events = manager.start(&cancel).expect("Failed to start");
        assert_eq!(manager.watched_paths().len(), 1);
    }

    #[tokio::test]
    async fn test_receives_write_event() {
        let dir = create_temp_dir();
        let mut manager = manager(WatchRoot::new(utf8(&dir)).recursive());
        let cancel = CancellationToken::new();
        let mut events = manager.start(&cancel).expect("Failed to start");

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(dir.path().join("test.txt"), "hello").unwrap();

        let event = wait_for(&mut events, |e| e.path.as_str().ends_with("test.txt")).await;
        manager.stop();

        let event = event.expect("Expected an event for test.txt");
        assert_ne!(event.kind, ChangeKind::Chmod);
    }

    #[tokio::test]
    async fn test_ignored_file_produces_no_event() {
        let dir = create_temp_dir();
        let mut manager = manager(WatchRoot::new(utf8(&dir)).recursive().with_ignore(["*.tmp"]));
        let cancel = CancellationToken::new();
        let mut events = manager.start(&cancel).expect("Failed to start");

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(dir.path().join("scratch.tmp"), "x").unwrap();
        fs::write(dir.path().join("marker.txt"), "x").unwrap();

        let mut seen = Vec::new();
        let marker = wait_for(&mut events, |e| {
            seen.push(e.path.clone());
            e.path.as_str().ends_with("marker.txt")
        })
        .await;
        manager.stop();

        assert!(marker.is_some());
        assert!(!seen.iter().any(|p| p.as_str().ends_with(".tmp")));
    }

    #[tokio::test]
    async fn test_new_directory_is_watched() {
        let dir = create_temp_dir();
        let mut manager = manager(WatchRoot::new(utf8(&dir)).recursive());
        let cancel = CancellationToken::new();
        let mut events = manager.start(&cancel).expect("Failed to start");

        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::create_dir(dir.path().join("fresh")).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        fs::write(dir.path().join("fresh/inner.txt"), "x").unwrap();

        let event = wait_for(&mut events, |e| e.path.as_str().ends_with("fresh/inner.txt")).await;
        manager.stop();

        assert!(event.is_some(), "Expected an event inside the new directory");
    }

    #[tokio::test]
    async fn test_cancel_closes_stream() {
        let dir = create_temp_dir();
        let mut manager = manager(WatchRoot::new(utf8(&dir)).recursive());
        let cancel = CancellationToken::new();
        let mut events = manager.start(&cancel).expect("Failed to start");

        cancel.cancel();
        let closed = tokio::time::timeout(Duration::from_secs(2), events.recv()).await;
        assert!(matches!(closed, Ok(None)));
    }

    #[tokio::test]
    async fn test_should_ignore_delegates_to_filter() {
        let dir = create_temp_dir();
        let manager = manager(WatchRoot::new(utf8(&dir)).with_ignore(["*.log"]));
        let root = manager.roots()[0].path.clone();
        assert!(manager.should_ignore(&root.join("debug.log")));
        assert!(manager.should_ignore(&root.join(".hidden")));
        assert!(!manager.should_ignore(&root.join("main.rs")));
    }
}
