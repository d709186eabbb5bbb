//! Source-tree watcher with async event streaming.
//!
//! This module provides the [`FileWatcher`] type that bridges the synchronous
//! `notify` crate to the async tokio runtime.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                 Blocking Thread (spawn_blocking)                  │
//! │  ┌─────────────┐   ┌──────────────┐   ┌────────────────────────┐  │
//! │  │ FileWalker  │   │ Debouncer    │ ->│ Callback               │  │
//! │  │ (scan)      │   │ (coalescing) │   │ (filter + KnownFiles)  │  │
//! │  └──────┬──────┘   └──────────────┘   └───────────┬────────────┘  │
//! └─────────│─────────────────────────────────────────│───────────────┘
//!           │ Added..., Ready            blocking_send │ Added/Changed/Removed
//!           ▼                                          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │            mpsc::Receiver<WatchEvent>  ->  dispatcher loop        │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! In persistent mode the debouncer starts before the scan, so a file
//! created while scanning is reported at least once. The shared
//! [`KnownFiles`] set keeps that from turning into two `Added` events.

use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use parking_lot::Mutex;
use smallvec::SmallVec;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use tw_core::WatchConfig;

use crate::error::WatchError;
use crate::events::{FileEvent, FileEventKind, KnownFiles, WatchEvent};
use crate::filter::FileFilter;
use crate::walker::FileWalker;

/// Default channel capacity for watch events.
const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// Watches a source tree and streams classified events to async code.
///
/// # Lifecycle
///
/// 1. **Creation**: [`FileWatcher::new`] validates and canonicalizes the
///    root, then spawns a blocking task.
/// 2. **Scan**: the task reports every existing matching file as
///    [`FileEventKind::Added`], followed by [`WatchEvent::Ready`].
/// 3. **Watch**: with `persistent` set, changes keep arriving until
///    shutdown. Without it the channel closes right after `Ready`.
/// 4. **Failure**: a notify error, or the root disappearing, is sent as
///    [`WatchEvent::Error`] and no further events follow.
/// 5. **Shutdown**: call [`FileWatcher::shutdown`], or drop the watcher.
///
/// # Examples
///
/// ```no_run
/// use tw_watcher::{FileWatcher, WatchEvent, default_source_filter};
/// use tw_core::WatchConfig;
/// use camino::Utf8Path;
///
/// # async fn example() -> Result<(), tw_watcher::WatchError> {
/// let mut watcher = FileWatcher::new(
///     Utf8Path::new("./src"),
///     &WatchConfig::one_shot(),
///     default_source_filter(),
/// ).await?;
///
/// while let Some(event) = watcher.recv().await {
///     match event {
///         WatchEvent::File(file) => println!("{} {}", file.kind, file.path),
///         WatchEvent::Ready => println!("scan complete"),
///         WatchEvent::Error(err) => return Err(err),
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct FileWatcher {
    /// Signals the blocking task to stop. `None` once sent.
    shutdown_tx: Option<oneshot::Sender<()>>,

    /// Handle to the blocking watcher task.
    task_handle: Option<JoinHandle<()>>,

    /// Event receiver for async consumption.
    event_rx: mpsc::Receiver<WatchEvent>,

    /// Canonical root being watched.
    watch_path: Utf8PathBuf,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("watch_path", &self.watch_path)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Starts scanning and, if `config.persistent` is set, watching `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if the path doesn't exist and
    /// [`WatchError::NotADirectory`] if it is a file. Errors that happen
    /// after startup arrive as [`WatchEvent::Error`].
    pub async fn new<F: FileFilter>(
        path: &Utf8Path,
        config: &WatchConfig,
        filter: F,
    ) -> Result<Self, WatchError> {
        Self::with_capacity(path, config, filter, DEFAULT_CHANNEL_CAPACITY).await
    }

    /// Like [`FileWatcher::new`] with a custom channel capacity.
    #[allow(clippy::unused_async)] // Async for API consistency with shutdown()
    pub async fn with_capacity<F: FileFilter>(
        path: &Utf8Path,
        config: &WatchConfig,
        filter: F,
        channel_capacity: usize,
    ) -> Result<Self, WatchError> {
        if !path.exists() {
            return Err(WatchError::path_not_found(path));
        }
        if !path.is_dir() {
            return Err(WatchError::NotADirectory(path.to_owned()));
        }

        let watch_path = path.canonicalize_utf8().map_err(WatchError::Io)?;

        let (event_tx, event_rx) = mpsc::channel(channel_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task_path = watch_path.clone();
        let config = *config;

        let task_handle = tokio::task::spawn_blocking(move || {
            let error_tx = event_tx.clone();
            if let Err(error) = run_watcher_loop(&task_path, config, event_tx, shutdown_rx, filter) {
                tracing::debug!(path = %task_path, error = %error, "File watcher failed");
                let _ = error_tx.blocking_send(WatchEvent::Error(error));
            }
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
            event_rx,
            watch_path,
        })
    }

    /// Receives the next event.
    ///
    /// Returns `None` once the watcher has stopped and every event has been
    /// received. Cancel safe, so it can be used in `tokio::select!`.
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.event_rx.recv().await
    }

    /// Returns the canonical root being watched.
    #[must_use]
    pub fn watch_path(&self) -> &Utf8Path {
        &self.watch_path
    }

    /// Returns `true` while the blocking task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the watcher and waits for the blocking task to finish.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ChannelClosed`] if the task panicked.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        // Unblocks a scan waiting on a full channel.
        self.event_rx.close();

        if let Some(handle) = self.task_handle.take() {
            handle.await.map_err(|_join_error| WatchError::ChannelClosed)?;
        }

        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        // The task exits once it sees the signal; Drop can't await it.
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Runs the scan and, when persistent, the notify watcher.
fn run_watcher_loop<F: FileFilter>(
    root: &Utf8Path,
    config: WatchConfig,
    event_tx: mpsc::Sender<WatchEvent>,
    shutdown_rx: oneshot::Receiver<()>,
    filter: F,
) -> Result<(), WatchError> {
    let filter = Arc::new(filter);
    let known = Arc::new(Mutex::new(KnownFiles::new()));

    let debouncer = if config.persistent {
        Some(start_debouncer(
            root,
            config,
            event_tx.clone(),
            Arc::clone(&filter),
            Arc::clone(&known),
        )?)
    } else {
        None
    };

    let walker = FileWalker::new(root)?;
    let paths = if config.recursive {
        walker.collect_paths(&*filter)?
    } else {
        walker
            .collect_paths(&*filter)?
            .into_iter()
            .filter(|p| p.parent() == Some(root))
            .collect()
    };

    let mut scanned = 0_usize;
    for path in paths {
        if !known.lock().insert(path.clone()) {
            continue;
        }
        scanned += 1;
        let event = FileEvent::new(path, FileEventKind::Added);
        if event_tx.blocking_send(WatchEvent::File(event)).is_err() {
            tracing::debug!("Event channel closed during scan");
            return Ok(());
        }
    }

    tracing::debug!(path = %root, files = scanned, "Initial scan complete");
    if event_tx.blocking_send(WatchEvent::Ready).is_err() {
        return Ok(());
    }

    let Some(debouncer) = debouncer else {
        return Ok(());
    };
    drop(event_tx);

    tracing::info!(path = %root, recursive = config.recursive, "File watcher started");

    let _ = shutdown_rx.blocking_recv();
    drop(debouncer);

    tracing::info!(path = %root, "File watcher stopped");

    Ok(())
}

/// Creates the debouncer whose callback classifies and forwards events.
fn start_debouncer<F: FileFilter>(
    root: &Utf8Path,
    config: WatchConfig,
    tx: mpsc::Sender<WatchEvent>,
    filter: Arc<F>,
    known: Arc<Mutex<KnownFiles>>,
) -> Result<Debouncer<notify::RecommendedWatcher>, WatchError> {
    let timeout = Duration::from_millis(config.debounce_ms);
    let callback_root = root.to_owned();
    let recursive = config.recursive;
    let mut stopped = false;

    let mut debouncer = new_debouncer(timeout, move |res: DebounceEventResult| {
        if stopped {
            return;
        }

        let events = match res {
            Ok(events) => events,
            Err(error) => {
                stopped = true;
                let _ = tx.blocking_send(WatchEvent::Error(WatchError::Notify(error)));
                return;
            }
        };

        if !callback_root.is_dir() {
            stopped = true;
            let error = WatchError::path_not_found(callback_root.clone());
            let _ = tx.blocking_send(WatchEvent::Error(error));
            return;
        }

        for event in events {
            let path = match Utf8PathBuf::try_from(event.path) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(
                        path = %e.into_path_buf().display(),
                        "Skipping non-UTF-8 path in file event"
                    );
                    continue;
                }
            };

            let classified = classify_path(&callback_root, &path, recursive, &*filter, &known);
            for file_event in classified {
                if tx.blocking_send(WatchEvent::File(file_event)).is_err() {
                    tracing::debug!("Event channel closed, stopping watcher");
                    stopped = true;
                    return;
                }
            }
        }
    })?;

    let mode = if config.recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    debouncer.watcher().watch(root.as_std_path(), mode)?;

    Ok(debouncer)
}

/// Turns one debounced path into file events.
///
/// The filter sees `path` relative to `root`. A directory that appears in
/// one step, such as one moved in, is walked, and every source
/// file in it that is not yet known is reported as added.
fn classify_path<F: FileFilter>(
    root: &Utf8Path,
    path: &Utf8Path,
    recursive: bool,
    filter: &F,
    known: &Mutex<KnownFiles>,
) -> SmallVec<[FileEvent; 1]> {
    if path.is_dir() {
        if !recursive || path == root {
            return SmallVec::new();
        }
        let found = match FileWalker::new(root).and_then(|w| w.collect_paths_in(path, filter)) {
            Ok(found) => found,
            Err(error) => {
                tracing::warn!(path = %path, error = %error, "Cannot scan new directory");
                return SmallVec::new();
            }
        };
        let mut known = known.lock();
        return found
            .into_iter()
            .filter(|file| known.insert(file.clone()))
            .map(|file| FileEvent::new(file, FileEventKind::Added))
            .collect();
    }

    let exists = path.exists();
    let relative = path.strip_prefix(root).unwrap_or(path);
    if exists && (!path.is_file() || !filter.should_process(relative)) {
        tracing::trace!(path = %path, "Filtered out file event");
        return SmallVec::new();
    }

    known.lock().classify(path, exists)
}
