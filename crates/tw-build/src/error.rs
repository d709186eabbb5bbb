//! Error types for the tw-build crate.
//!
//! Two classes, matching how far an error is allowed to travel:
//!
//! - [`JobError`]: confined to one source file. Logged, counted, and the
//!   build carries on.
//! - [`FatalError`]: tears the whole process down.

use camino::Utf8PathBuf;
use tw_backend::{BackendError, Diagnostic};
use tw_core::{ConfigError, PathError};
use tw_watcher::WatchError;

/// A failure while processing one source file.
///
/// Every variant is an isolated failure: it never stops the watcher or
/// affects other jobs.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    /// The source file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The source file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An output file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The output file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The backend reported diagnostics. Nothing was written.
    #[error("{path}: compilation failed with {} diagnostic(s)", diagnostics.len())]
    Compile {
        /// The source file.
        path: Utf8PathBuf,
        /// The diagnostics, in source order.
        diagnostics: Vec<Diagnostic>,
        /// Each diagnostic rendered with its source excerpt.
        rendered: Vec<String>,
    },

    /// The source file could not be mapped into the output tree.
    #[error(transparent)]
    Path(#[from] PathError),

    /// The backend failed internally.
    #[error("backend failed on {path}: {source}")]
    Backend {
        /// The source file.
        path: Utf8PathBuf,
        /// The backend error.
        #[source]
        source: BackendError,
    },

    /// The job task panicked.
    #[error("compile job panicked: {0}")]
    Panicked(String),
}

impl JobError {
    /// Creates a new [`JobError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`JobError::Write`] error.
    #[inline]
    pub fn write(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` for I/O failures.
    #[inline]
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Write { .. })
    }

    /// Returns the file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Read { path, .. }
            | Self::Write { path, .. }
            | Self::Compile { path, .. }
            | Self::Backend { path, .. } => Some(path),
            Self::Path(PathError::OutsideRoot { path, .. } | PathError::NotAFile(path)) => {
                Some(path)
            }
            Self::Panicked(_) => None,
        }
    }
}

/// An error that ends the process.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    /// Settings could not be loaded or resolved.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The watch primitive failed.
    #[error("watch error: {0}")]
    Watch(#[from] WatchError),
}

impl FatalError {
    /// Process exit code for this error.
    #[inline]
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        1
    }
}
