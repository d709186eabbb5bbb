//! Run modes and process termination policy.
//!
//! | Error | Class | Effect |
//! |-------|-------|--------|
//! | [`ConfigError`](tw_core::ConfigError) | fatal | exit 1 before watching |
//! | [`WatchError`](tw_watcher::WatchError) | fatal | tear down, exit 1 |
//! | [`JobError`] | isolated | log, count, keep going |
//!
//! A one-shot build that finished with isolated failures exits with 2.

use tw_core::{CanonicalSettings, WatchConfig};
use tw_watcher::FileEventKind;

use crate::error::{FatalError, JobError};
use crate::stats::BuildSummary;

/// How long the process stays resident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunMode {
    /// Compile the files that exist now, then exit.
    Build,
    /// Keep compiling files as they change until stopped.
    Watch,
}

impl RunMode {
    /// The mode selected by `watchMode`.
    #[must_use]
    pub const fn from_settings(settings: &CanonicalSettings) -> Self {
        if settings.watch_mode() {
            Self::Watch
        } else {
            Self::Build
        }
    }

    /// Returns `true` for [`RunMode::Watch`].
    #[must_use]
    pub const fn is_persistent(self) -> bool {
        matches!(self, Self::Watch)
    }

    /// Whether events of `kind` are acted on in this mode.
    ///
    /// A one-shot build only reacts to files found by the initial scan.
    #[must_use]
    pub const fn handles(self, kind: FileEventKind) -> bool {
        match self {
            Self::Build => matches!(kind, FileEventKind::Added),
            Self::Watch => true,
        }
    }

    /// `base` with `persistent` set for this mode.
    #[must_use]
    pub fn watch_config(self, base: WatchConfig) -> WatchConfig {
        WatchConfig {
            persistent: self.is_persistent(),
            ..base
        }
    }
}

/// How the process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Everything that ran succeeded, or watching was stopped on request.
    Success,
    /// A one-shot build finished with at least one isolated failure.
    BuildFailures,
    /// A fatal error ended the run.
    Fatal,
}

impl ExitStatus {
    /// Exit status after the dispatcher returned `summary`.
    #[must_use]
    pub const fn from_summary(mode: RunMode, summary: &BuildSummary) -> Self {
        match mode {
            RunMode::Build if summary.has_failures() => Self::BuildFailures,
            RunMode::Build | RunMode::Watch => Self::Success,
        }
    }

    /// The process exit code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Fatal => 1,
            Self::BuildFailures => 2,
        }
    }
}

/// Logs an isolated failure.
///
/// One line per failure; compile failures add one line per diagnostic and,
/// at debug level, the source excerpt.
pub fn report_isolated(error: &JobError) {
    match error {
        JobError::Compile {
            diagnostics,
            rendered,
            ..
        } => {
            tracing::error!("{error}");
            for diagnostic in diagnostics {
                tracing::error!(
                    file = %diagnostic.source_unit,
                    offset = diagnostic.offset,
                    length = diagnostic.length,
                    "{}",
                    diagnostic.message
                );
            }
            for excerpt in rendered {
                tracing::debug!("\n{excerpt}");
            }
        }
        other => match other.path() {
            Some(path) => tracing::error!(path = %path, "{other}"),
            None => tracing::error!("{other}"),
        },
    }
}

/// Logs a fatal error and returns the status to exit with.
pub fn report_fatal(error: &FatalError) -> ExitStatus {
    tracing::error!("{error}");
    ExitStatus::Fatal
}
