//! Event types for source-tree notifications.
//!
//! `notify-debouncer-mini` reports a path and nothing else. This module
//! turns those bare paths into typed [`FileEvent`]s by remembering which
//! source files the watcher has already seen.
//!
//! # Event Flow
//!
//! ```text
//! initial scan ──► Added ... Added ──► Ready
//!                                        │
//! notify-debouncer-mini (coalesced)      ▼
//!        │                     KnownFiles::classify
//!        ▼                               │
//!   bare path ───────────────────────────┘──► Added | Changed | Removed
//! ```

use std::fmt;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use smallvec::SmallVec;
use tw_core::FxHashSet;

use crate::error::WatchError;

/// What happened to a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileEventKind {
    /// The file appeared, or existed when the watcher started.
    Added,
    /// A known file was written again.
    Changed,
    /// A known file is gone.
    Removed,
}

impl fmt::Display for FileEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Added => "added",
            Self::Changed => "changed",
            Self::Removed => "removed",
        })
    }
}

/// A classified change to one source file.
///
/// # Examples
///
/// ```
/// use tw_watcher::{FileEvent, FileEventKind};
/// use camino::Utf8PathBuf;
///
/// let event = FileEvent::new(Utf8PathBuf::from("/src/app.ts"), FileEventKind::Added);
/// assert_eq!(event.path.as_str(), "/src/app.ts");
/// assert_eq!(event.kind, FileEventKind::Added);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// Absolute path of the source file.
    pub path: Utf8PathBuf,

    /// How the file changed.
    pub kind: FileEventKind,

    /// When the event was produced.
    ///
    /// Monotonic, suitable for measuring latency but not for display.
    pub timestamp: Instant,
}

impl FileEvent {
    /// Creates an event stamped with the current instant.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf, kind: FileEventKind) -> Self {
        Self {
            path,
            kind,
            timestamp: Instant::now(),
        }
    }
}

/// Everything the watcher sends over its channel.
#[derive(Debug)]
pub enum WatchEvent {
    /// A classified change to a source file.
    File(FileEvent),

    /// The initial scan has finished.
    ///
    /// Sent exactly once, after the `Added` events for files that existed
    /// at startup.
    Ready,

    /// The watcher failed.
    ///
    /// The watcher stops after sending this.
    Error(WatchError),
}

impl From<FileEvent> for WatchEvent {
    fn from(event: FileEvent) -> Self {
        Self::File(event)
    }
}

/// The set of source files the watcher currently believes exist.
///
/// Seeded by the initial scan and updated on every classified event.
#[derive(Debug, Default)]
pub struct KnownFiles {
    paths: FxHashSet<Utf8PathBuf>,
}

impl KnownFiles {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `path` as known. Returns `true` if it was not known before.
    pub fn insert(&mut self, path: Utf8PathBuf) -> bool {
        self.paths.insert(path)
    }

    /// Number of known files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if no files are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Classifies a notification for `path`.
    ///
    /// `exists` is whether `path` is a file on disk right now. A path that
    /// no longer exists may have been a directory, in which case every known
    /// file below it is reported as removed.
    ///
    /// | on disk | known | result |
    /// |---------|-------|--------|
    /// | yes | no | `Added` |
    /// | yes | yes | `Changed` |
    /// | no | yes | `Removed` |
    /// | no | no | `Removed` for known files below it, if any |
    pub fn classify(&mut self, path: &Utf8Path, exists: bool) -> SmallVec<[FileEvent; 1]> {
        let mut events = SmallVec::new();

        if exists {
            let kind = if self.paths.insert(path.to_owned()) {
                FileEventKind::Added
            } else {
                FileEventKind::Changed
            };
            events.push(FileEvent::new(path.to_owned(), kind));
        } else if self.paths.remove(path) {
            events.push(FileEvent::new(path.to_owned(), FileEventKind::Removed));
        } else {
            let mut below: Vec<Utf8PathBuf> = self
                .paths
                .iter()
                .filter(|known| known.starts_with(path))
                .cloned()
                .collect();
            below.sort();
            for known in below {
                self.paths.remove(&known);
                events.push(FileEvent::new(known, FileEventKind::Removed));
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(events: &[FileEvent]) -> Vec<FileEventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(FileEventKind::Added.to_string(), "added");
        assert_eq!(FileEventKind::Changed.to_string(), "changed");
        assert_eq!(FileEventKind::Removed.to_string(), "removed");
    }

    #[test]
    fn test_classify_new_file_is_added() {
        let mut known = KnownFiles::new();
        let events = known.classify(Utf8Path::new("/src/a.ts"), true);
        assert_eq!(kinds(&events), vec![FileEventKind::Added]);
        assert_eq!(known.len(), 1);
        assert!(!known.insert(Utf8PathBuf::from("/src/a.ts")));
    }

    #[test]
    fn test_classify_known_file_is_changed() {
        let mut known = KnownFiles::new();
        known.insert(Utf8PathBuf::from("/src/a.ts"));
        let events = known.classify(Utf8Path::new("/src/a.ts"), true);
        assert_eq!(kinds(&events), vec![FileEventKind::Changed]);
    }

    #[test]
    fn test_classify_missing_known_file_is_removed() {
        let mut known = KnownFiles::new();
        known.insert(Utf8PathBuf::from("/src/a.ts"));
        let events = known.classify(Utf8Path::new("/src/a.ts"), false);
        assert_eq!(kinds(&events), vec![FileEventKind::Removed]);
        assert!(known.is_empty());

        // Re-creating it is an addition again
        let events = known.classify(Utf8Path::new("/src/a.ts"), true);
        assert_eq!(kinds(&events), vec![FileEventKind::Added]);
    }

    #[test]
    fn test_classify_missing_unknown_path_is_dropped() {
        let mut known = KnownFiles::new();
        known.insert(Utf8PathBuf::from("/src/a.ts"));
        let events = known.classify(Utf8Path::new("/src/other.ts"), false);
        assert!(events.is_empty());
        assert_eq!(known.len(), 1);
    }

    #[test]
    fn test_classify_removed_directory() {
        let mut known = KnownFiles::new();
        known.insert(Utf8PathBuf::from("/src/lib/b.ts"));
        known.insert(Utf8PathBuf::from("/src/lib/a.ts"));
        known.insert(Utf8PathBuf::from("/src/libs.ts"));

        let events = known.classify(Utf8Path::new("/src/lib"), false);
        let paths: Vec<&str> = events.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/src/lib/a.ts", "/src/lib/b.ts"]);
        assert!(events.iter().all(|e| e.kind == FileEventKind::Removed));
        assert_eq!(known.len(), 1);
        let events = known.classify(Utf8Path::new("/src/libs.ts"), true);
        assert_eq!(kinds(&events), vec![FileEventKind::Changed]);
    }

    #[test]
    fn test_file_event_into_watch_event() {
        let event = FileEvent::new(Utf8PathBuf::from("/src/a.ts"), FileEventKind::Changed);
        let watch: WatchEvent = event.clone().into();
        assert!(matches!(watch, WatchEvent::File(e) if e == event));
    }
}
