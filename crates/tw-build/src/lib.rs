//! Build orchestration for tscwatch.
//!
//! This crate connects the pieces: it starts a [`tw_watcher::FileWatcher`]
//! on the configured root, turns file events into [`CompileJob`]s, runs each
//! job through a [`tw_backend::CompilationBackend`] and writes the results
//! into the output tree.
//!
//! # Modules
//!
//! | Module | Role |
//! |--------|------|
//! | [`dispatcher`] | event loop, one job per `Added`/`Changed` event |
//! | [`runner`] | read, compile, map, write for one file |
//! | [`lifecycle`] | run modes, fatal vs isolated errors, exit codes |
//! | [`stats`] | the [`BuildSummary`] returned when a run ends |
//!
//! # Crate Dependencies
//!
//! ```text
//! tw-cli ──► tw-build ──► tw-backend ──► tw-core
//!                     └─► tw-watcher ───►
//! ```
//!
//! # Error Handling
//!
//! Per-file problems are [`JobError`]s: they are logged through
//! [`lifecycle::report_isolated`] and counted, and the run continues.
//! Only [`FatalError`]s end a run.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod dispatcher;
pub mod error;
pub mod job;
pub mod lifecycle;
pub mod runner;
pub mod stats;
pub mod writer;

pub use dispatcher::Dispatcher;
pub use error::{FatalError, JobError};
pub use job::{CompileJob, JobReason};
pub use lifecycle::{ExitStatus, RunMode, report_fatal, report_isolated};
pub use runner::{JobOutput, JobReport, JobRunner};
pub use stats::BuildSummary;
