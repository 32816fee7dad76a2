//! Recursive file watching with ignore rules and per-path debouncing.
//!
//! This crate turns the watch roots of a [`wr_core::Config`] into a stream of
//! [`wr_core::ChangeEvent`]s:
//!
//! - Recursive roots are walked at startup and every non-ignored directory is
//!   registered with the OS notification facility (`notify`)
//! - Directories created later under a recursive root are registered as they
//!   appear
//! - Raw notifications are classified, filtered by [`IgnoreRules`] and
//!   coalesced per path by a [`Debouncer`]
//!
//! # Crate Dependencies
//!
//! ```text
//! wr-cli ──► wr-runner ──► wr-core
//!        └─► wr-watcher ─►
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use wr_core::Config;
//! use wr_watcher::WatchManager;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(camino::Utf8Path::new("watchrun.yaml"))?;
//!     let cancel = CancellationToken::new();
//!
//!     let mut manager = WatchManager::from_config(&config)?;
//!     let mut events = manager.start(&cancel)?;
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{}: {}", event.kind, event.path);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! Startup failures (missing roots, registration errors) are returned as
//! [`WatchError`]. Once running, OS watcher errors are logged and the loop
//! continues.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod debounce;
pub mod error;
pub mod events;
pub mod filter;
pub mod registry;
pub mod watcher;

pub use debounce::Debouncer;
pub use error::WatchError;
pub use events::{classify, Classified, PendingChange};
pub use filter::{AcceptAllFilter, FileFilter, IgnoreRules, Platform};
pub use registry::WatchRegistry;
pub use watcher::{WatchManager, EVENT_CHANNEL_CAPACITY};
