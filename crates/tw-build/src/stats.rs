//! Build summary counters.
//!
//! The dispatcher owns a single [`BuildSummary`] and updates it from its
//! event loop, so plain counters are enough.
//!
//! # Examples
//!
//! ```
//! use tw_build::BuildSummary;
//!
//! let mut summary = BuildSummary::default();
//! summary.record_job();
//! summary.record_failed();
//!
//! assert!(summary.has_failures());
//! assert_eq!(summary.in_flight(), 0);
//! ```

use serde::{Deserialize, Serialize};

use crate::runner::JobOutput;

/// What a dispatcher run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildSummary {
    /// Compile jobs dispatched.
    pub jobs: u64,
    /// Jobs that wrote their output.
    pub compiled: u64,
    /// Jobs that ended in an isolated failure.
    pub failed: u64,
    /// Source files reported as removed.
    pub removed: u64,
    /// Files written, counting source maps.
    pub files_written: u64,
}

impl BuildSummary {
    /// Counts a dispatched job.
    #[inline]
    pub fn record_job(&mut self) {
        self.jobs += 1;
    }

    /// Counts a successful job and the files it wrote.
    #[inline]
    pub fn record_compiled(&mut self, output: &JobOutput) {
        self.compiled += 1;
        self.files_written += output.files_written();
    }

    /// Counts a failed job.
    #[inline]
    pub fn record_failed(&mut self) {
        self.failed += 1;
    }

    /// Counts a removed source file.
    #[inline]
    pub fn record_removed(&mut self) {
        self.removed += 1;
    }

    /// Returns `true` if any job failed.
    #[inline]
    #[must_use]
    pub const fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Jobs dispatched but not yet finished.
    #[inline]
    #[must_use]
    pub const fn in_flight(&self) -> u64 {
        self.jobs.saturating_sub(self.compiled + self.failed)
    }
}
