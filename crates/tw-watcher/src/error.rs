//! Error types for the tw-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while scanning or watching the source tree.

use camino::Utf8PathBuf;

/// Errors that can occur during file watching operations.
///
/// Every variant is fatal: the watcher stops after reporting one, and the
/// build tears down. Non-UTF-8 paths are not errors; they are logged and
/// skipped where they are found.
///
/// # Examples
///
/// ```
/// use tw_watcher::WatchError;
///
/// let err = WatchError::path_not_found("src");
/// assert_eq!(err.path().map(|p| p.as_str()), Some("src"));
/// assert_eq!(err.to_string(), "path does not exist: src");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The watched root does not exist, or disappeared while watching.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The watched root is not a directory.
    #[error("path is not a directory: {0}")]
    NotADirectory(Utf8PathBuf),

    /// The event channel was closed unexpectedly.
    #[error("event channel closed unexpectedly")]
    ChannelClosed,

    /// The initial directory scan failed.
    #[error("directory scan failed: {0}")]
    Walk(#[from] ignore::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) | Self::NotADirectory(path) => Some(path),
            Self::Notify(_) | Self::ChannelClosed | Self::Walk(_) | Self::Io(_) => None,
        }
    }
}
