//! Source-tree watching for tscwatch.
//!
//! This crate scans a root directory for TypeScript sources and, in watch
//! mode, keeps reporting changes to them via the `notify` crate with
//! coalescing from `notify-debouncer-mini`. Everything is bridged to tokio
//! through a bounded channel of [`WatchEvent`]s.
//!
//! # Overview
//!
//! - The initial scan reports every existing source file as `Added`, then
//!   sends [`WatchEvent::Ready`].
//! - Bare notify paths are classified into `Added`, `Changed` or `Removed`
//!   against the set of files seen so far.
//! - Only `.ts` files that are not `.d.ts` declarations, and are not below
//!   `node_modules` or `.git`, are ever reported.
//! - A failing watcher, including the root being deleted, sends
//!   [`WatchEvent::Error`] and stops.
//!
//! # Crate Dependencies
//!
//! ```text
//! tw-cli ──► tw-build ──► tw-backend ──► tw-core
//!                     └─► tw-watcher ───►
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use tw_watcher::{FileEventKind, FileWatcher, WatchEvent, default_source_filter};
//! use tw_core::WatchConfig;
//! use camino::Utf8Path;
//!
//! # async fn example() -> Result<(), tw_watcher::WatchError> {
//! let mut watcher = FileWatcher::new(
//!     Utf8Path::new("./src"),
//!     &WatchConfig::default(),
//!     default_source_filter(),
//! ).await?;
//!
//! loop {
//!     tokio::select! {
//!         Some(event) = watcher.recv() => match event {
//!             WatchEvent::File(file) if file.kind == FileEventKind::Removed => {
//!                 println!("gone: {}", file.path);
//!             }
//!             WatchEvent::File(file) => println!("compile: {}", file.path),
//!             WatchEvent::Ready => println!("initial scan done"),
//!             WatchEvent::Error(err) => return Err(err),
//!         },
//!         _ = tokio::signal::ctrl_c() => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Performance Considerations
//!
//! - **Filtering at Source**: paths are filtered on the blocking thread
//!   before they reach the channel.
//! - **Bounded Channel**: 100 events by default, so a slow consumer applies
//!   backpressure instead of growing memory.
//! - **UTF-8 Paths**: non-UTF-8 paths are logged and skipped once, at the
//!   edge.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod walker;
pub mod watcher;

pub use error::WatchError;

pub use events::{FileEvent, FileEventKind, KnownFiles, WatchEvent};

pub use filter::{
    AcceptAllFilter, CompositeFilter, DEFAULT_EXCLUDED_DIRS, ExcludeDirsFilter, FileFilter,
    SourceFilter, default_source_filter,
};

pub use walker::FileWalker;

pub use watcher::FileWatcher;
