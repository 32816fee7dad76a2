//! Per-key trailing-edge debouncing.
//!
//! Each key has at most one pending action. Adding an action for a key that is
//! already pending cancels the old timer and restarts the window, so only the
//! newest action is released once the key has been quiet for the full delay.
//!
//! Released actions are delivered on an unbounded channel handed to
//! [`Debouncer::new`].

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use wr_core::FxHashMap;

struct Pending<A> {
    generation: u64,
    action: A,
    timer: JoinHandle<()>,
}

struct Table<K, A> {
    next_generation: u64,
    pending: FxHashMap<K, Pending<A>>,
}

/// Coalesces bursts of actions per key.
///
/// Must be used from within a tokio runtime; every [`add`](Self::add) spawns a
/// timer task.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tokio::sync::mpsc;
/// use wr_watcher::Debouncer;
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// let (tx, mut rx) = mpsc::unbounded_channel();
/// let debouncer = Debouncer::new(Duration::from_millis(100), tx);
///
/// debouncer.add("main.rs", 1);
/// debouncer.add("main.rs", 2);
///
/// assert_eq!(rx.recv().await, Some(2));
/// # }
/// ```
pub struct Debouncer<K, A> {
    delay: Duration,
    table: Arc<Mutex<Table<K, A>>>,
    release_tx: mpsc::UnboundedSender<A>,
}

impl<K, A> std::fmt::Debug for Debouncer<K, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.table.lock().pending.len())
            .finish_non_exhaustive()
    }
}

impl<K, A> Debouncer<K, A>
where
    K: Eq + Hash + Clone + Send + 'static,
    A: Send + 'static,
{
    /// Creates a debouncer that releases actions on `release_tx` after `delay`
    /// of quiet per key.
    #[must_use]
    pub fn new(delay: Duration, release_tx: mpsc::UnboundedSender<A>) -> Self {
        Self {
            delay,
            table: Arc::new(Mutex::new(Table {
                next_generation: 0,
                pending: FxHashMap::default(),
            })),
            release_tx,
        }
    }

    /// Schedules `action` for `key`, replacing any pending action for it.
    pub fn add(&self, key: K, action: A) {
        let mut table = self.table.lock();
        table.next_generation += 1;
        let generation = table.next_generation;

        let timer = tokio::spawn(release_after(
            self.delay,
            Arc::clone(&self.table),
            key.clone(),
            generation,
            self.release_tx.clone(),
        ));

        let replaced = table.pending.insert(
            key,
            Pending {
                generation,
                action,
                timer,
            },
        );
        if let Some(old) = replaced {
            old.timer.abort();
        }
    }

    /// Drops every pending action without releasing it.
    pub fn cancel_all(&self) {
        let mut table = self.table.lock();
        for (_, pending) in table.pending.drain() {
            pending.timer.abort();
        }
    }

    /// Returns the number of keys waiting out their window.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.table.lock().pending.len()
    }

    /// Returns the configured quiet period.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

impl<K, A> Drop for Debouncer<K, A> {
    fn drop(&mut self) {
        let mut table = self.table.lock();
        for (_, pending) in table.pending.drain() {
            pending.timer.abort();
        }
    }
}

async fn release_after<K, A>(
    delay: Duration,
    table: Arc<Mutex<Table<K, A>>>,
    key: K,
    generation: u64,
    release_tx: mpsc::UnboundedSender<A>,
) where
    K: Eq + Hash,
{
    tokio::time::sleep(delay).await;

    let action = {
        let mut table = table.lock();
        match table.pending.get(&key) {
            Some(pending) if pending.generation == generation => {
                table.pending.remove(&key).map(|p| p.action)
            }
            _ => None,
        }
    };

    if let Some(action) = action {
        // Receiver gone means the watch loop has exited.
        let _ = release_tx.send(action);
    }
}
