//! The compilation job runner.
//!
//! [`JobRunner::run`] takes one [`CompileJob`] through the whole pipeline:
//!
//! ```text
//! read source ─► backend.compile ─► diagnostics? ──yes──► JobError::Compile
//!                                        │ no
//!                                        ▼
//!                         map_output_path ─► write code ─► write map
//! ```
//!
//! Every failure comes back as a [`JobError`] inside the [`JobReport`]; the
//! runner never panics and never writes outside the output root.

use std::sync::Arc;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use tw_backend::CompilationBackend;
use tw_core::{CanonicalSettings, logical_path, map_output_path, normalize, source_map_path};

use crate::error::JobError;
use crate::job::CompileJob;
use crate::writer::write_output;

/// Files written by a successful job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutput {
    /// The emitted JavaScript file.
    pub code_path: Utf8PathBuf,
    /// The emitted source map, if one was written.
    pub source_map_path: Option<Utf8PathBuf>,
}

impl JobOutput {
    /// Number of files written.
    #[must_use]
    pub const fn files_written(&self) -> u64 {
        if self.source_map_path.is_some() { 2 } else { 1 }
    }
}

/// The outcome of one job.
#[derive(Debug)]
pub struct JobReport {
    /// The job that ran.
    pub job: CompileJob,
    /// What it produced.
    pub outcome: Result<JobOutput, JobError>,
    /// Time from the triggering event to completion.
    pub elapsed: Duration,
}

impl JobReport {
    /// Returns `true` if the job wrote its output.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Runs compile jobs against shared settings and a shared backend.
///
/// Cheap to clone; each spawned job gets its own clone.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tw_backend::TreeSitterBackend;
/// use tw_build::{CompileJob, JobReason, JobRunner};
/// use tw_core::{resolve, Schema, UserParams};
///
/// # async fn example() -> Result<(), tw_core::ConfigError> {
/// let params = UserParams {
///     root_path: Some("src".into()),
///     output_path: Some("out".into()),
///     ..UserParams::default()
/// };
/// let settings = Arc::new(resolve(Schema::standard(), &params)?);
/// let runner = JobRunner::new(settings, Arc::new(TreeSitterBackend::new()));
///
/// let report = runner.run(CompileJob::new("src/app.ts", JobReason::Added)).await;
/// if let Err(err) = &report.outcome {
///     eprintln!("{err}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct JobRunner {
    settings: Arc<CanonicalSettings>,
    backend: Arc<dyn CompilationBackend>,
    root: Utf8PathBuf,
}

impl std::fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner")
            .field("root", &self.root)
            .field("output", &self.settings.output_path())
            .finish_non_exhaustive()
    }
}

impl JobRunner {
    /// Creates a runner rooted at the settings' `rootPath`.
    #[must_use]
    pub fn new(settings: Arc<CanonicalSettings>, backend: Arc<dyn CompilationBackend>) -> Self {
        let root = normalize(settings.root_path());
        Self {
            settings,
            backend,
            root,
        }
    }

    /// Uses `root` instead of `rootPath` to relativize source paths.
    ///
    /// The watcher reports canonical absolute paths, so the dispatcher
    /// passes the watcher's canonical root here.
    #[must_use]
    pub fn with_root(mut self, root: &Utf8Path) -> Self {
        self.root = normalize(root);
        self
    }

    /// The root source paths are relativized against.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The settings this runner compiles with.
    #[must_use]
    pub fn settings(&self) -> &CanonicalSettings {
        &self.settings
    }

    /// Compiles one file and writes its output.
    pub async fn run(&self, job: CompileJob) -> JobReport {
        tracing::debug!(path = %job.source_path, reason = ?job.reason, "Starting compile job");
        let outcome = self.compile_and_write(&job.source_path).await;
        let elapsed = job.timestamp.elapsed();

        if let Ok(output) = &outcome {
            tracing::info!(
                path = %output.code_path,
                elapsed_ms = elapsed.as_millis(),
                "Compilation complete"
            );
        }

        JobReport {
            job,
            outcome,
            elapsed,
        }
    }

    async fn compile_and_write(&self, source_path: &Utf8Path) -> Result<JobOutput, JobError> {
        let source = tokio::fs::read_to_string(source_path)
            .await
            .map_err(|err| JobError::read(source_path, err))?;

        let logical = logical_path(source_path, &self.root)?;
        let options = self.settings.compiler_options();

        let started = Instant::now();
        let result = self
            .backend
            .compile(&source, &logical, options)
            .map_err(|source| JobError::Backend {
                path: source_path.to_owned(),
                source,
            })?;
        tracing::trace!(
            path = %logical,
            compile_us = started.elapsed().as_micros(),
            "Backend finished"
        );

        if !result.is_success() {
            let rendered = result.diagnostics.iter().map(|d| d.render(&source)).collect();
            return Err(JobError::Compile {
                path: source_path.to_owned(),
                diagnostics: result.diagnostics,
                rendered,
            });
        }

        let code_path = map_output_path(source_path, &self.root, self.settings.output_path())?;
        write_output(&code_path, &result.emitted_code).await?;

        let source_map_path = match result.emitted_source_map {
            Some(map) if options.sourcemap() => {
                let map_path = source_map_path(&code_path);
                write_output(&map_path, &map).await?;
                Some(map_path)
            }
            _ => None,
        };

        Ok(JobOutput {
            code_path,
            source_map_path,
        })
    }
}
