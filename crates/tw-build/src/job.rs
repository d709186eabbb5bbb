//! Compile jobs.

use std::time::Instant;

use camino::Utf8PathBuf;
use tw_watcher::{FileEvent, FileEventKind};

/// Why a file is being compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobReason {
    /// The file is new, or existed when the build started.
    Added,
    /// The file was modified.
    Changed,
}

/// One unit of work: compile a source file and write its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileJob {
    /// Absolute path of the source file.
    pub source_path: Utf8PathBuf,
    /// The event that triggered the job.
    pub reason: JobReason,
    /// When the triggering event was observed.
    pub timestamp: Instant,
}

impl CompileJob {
    /// Creates a job stamped with the current instant.
    #[must_use]
    pub fn new(source_path: impl Into<Utf8PathBuf>, reason: JobReason) -> Self {
        Self {
            source_path: source_path.into(),
            reason,
            timestamp: Instant::now(),
        }
    }

    /// Builds the job for a watch event. `Removed` events have none.
    #[must_use]
    pub fn from_event(event: &FileEvent) -> Option<Self> {
        let reason = match event.kind {
            FileEventKind::Added => JobReason::Added,
            FileEventKind::Changed => JobReason::Changed,
            FileEventKind::Removed => return None,
        };
        Some(Self {
            source_path: event.path.clone(),
            reason,
            timestamp: event.timestamp,
        })
    }
}
