//! Domain types shared between the watcher and the runner.
//!
//! - [`ChangeEvent`] - one coalesced filesystem change, released by the debouncer
//! - [`ChangeKind`] - the operation that produced it
//!
//! Both are re-exported at the crate root:
//!
//! ```
//! use wr_core::{ChangeEvent, ChangeKind};
//! ```

mod event;

pub use event::{ChangeEvent, ChangeKind};
