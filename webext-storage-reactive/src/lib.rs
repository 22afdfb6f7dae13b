//! Reactive primitives for webext-storage.
//!
//! - [`Cell`]: shared observable value with version tracking, deep or
//!   shallow change detection, and awaitable conditions
//! - [`WatchOptions`]: typed watcher configuration (immediate first call,
//!   [`Flush`] timing, deep comparison, [`EventFilter`] gate)
//! - [`Scope`]: lifecycle owner that runs cleanups once on disposal
//!
//! # Flush timing
//!
//! `Flush::Post` watchers run on a tokio task and observe only the latest
//! value: several synchronous `set` calls made before the task is polled
//! produce a single callback. `Flush::Sync` watchers run inline, once per
//! change, on the thread that changed the cell.

pub mod cell;
pub mod filter;
pub mod scope;
pub mod watch;

pub use cell::Cell;
pub use filter::{EventFilter, PausableFilter};
pub use scope::{Scope, try_on_scope_dispose};
pub use watch::{Flush, WatchHandle, WatchOptions};
