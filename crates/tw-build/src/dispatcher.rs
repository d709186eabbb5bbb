//! The watch dispatcher.
//!
//! [`Dispatcher`] owns the watcher for one run. A single `tokio::select!`
//! loop receives [`WatchEvent`]s, spawns one compile job per accepted
//! `Added`/`Changed` event into a [`JoinSet`], and reaps finished jobs.
//!
//! ```text
//!                 ┌──────────────────────── select! ───────────────────────┐
//! FileWatcher ──► │ File(Added|Changed) ─► JoinSet::spawn(runner.run(job)) │
//!                 │ File(Removed)       ─► log                             │
//!                 │ Ready               ─► build mode: stop receiving      │
//!                 │ Error               ─► fatal                           │
//! JoinSet     ──► │ join_next           ─► BuildSummary / report_isolated  │
//! shutdown    ──► │                     ─► drain, stop                     │
//!                 └────────────────────────────────────────────────────────┘
//! ```
//!
//! Jobs run on the same runtime as the loop. There is no ordering between
//! jobs and no per-path de-duplication; for the same path the last write
//! wins.

use std::future::Future;
use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};
use tw_backend::CompilationBackend;
use tw_core::{CanonicalSettings, WatchConfig};
use tw_watcher::{FileEvent, FileWatcher, WatchError, WatchEvent, default_source_filter};

use crate::error::{FatalError, JobError};
use crate::job::CompileJob;
use crate::lifecycle::{RunMode, report_isolated};
use crate::runner::{JobReport, JobRunner};
use crate::stats::BuildSummary;

/// Drives one build or watch run.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tw_backend::TreeSitterBackend;
/// use tw_build::{Dispatcher, ExitStatus};
/// use tw_core::{resolve, Schema, UserParams};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let params = UserParams {
///     watch_mode: Some(false),
///     root_path: Some("src".into()),
///     output_path: Some("out".into()),
///     ..UserParams::default()
/// };
/// let settings = Arc::new(resolve(Schema::standard(), &params)?);
/// let dispatcher = Dispatcher::new(settings, Arc::new(TreeSitterBackend::new()));
/// let mode = dispatcher.mode();
///
/// let summary = dispatcher.run().await?;
/// println!("{} compiled, {} failed", summary.compiled, summary.failed);
/// std::process::exit(ExitStatus::from_summary(mode, &summary).code().into());
/// # }
/// ```
#[derive(Debug)]
pub struct Dispatcher {
    settings: Arc<CanonicalSettings>,
    runner: JobRunner,
    mode: RunMode,
    watch: WatchConfig,
}

impl Dispatcher {
    /// Creates a dispatcher for `settings`, compiling with `backend`.
    #[must_use]
    pub fn new(settings: Arc<CanonicalSettings>, backend: Arc<dyn CompilationBackend>) -> Self {
        let mode = RunMode::from_settings(&settings);
        let runner = JobRunner::new(Arc::clone(&settings), backend);
        Self {
            settings,
            runner,
            mode,
            watch: mode.watch_config(WatchConfig::default()),
        }
    }

    /// Overrides the watcher tuning. `persistent` always follows the mode.
    #[must_use]
    pub fn with_watch_config(mut self, config: WatchConfig) -> Self {
        self.watch = self.mode.watch_config(config);
        self
    }

    /// The run mode selected by the settings.
    #[must_use]
    pub const fn mode(&self) -> RunMode {
        self.mode
    }

    /// Runs until the build completes or, in watch mode, forever.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::Watch`] if the watcher fails to start or fails
    /// while running.
    pub async fn run(self) -> Result<BuildSummary, FatalError> {
        self.run_until(std::future::pending()).await
    }

    /// Like [`Dispatcher::run`], but also stops when `shutdown` completes.
    ///
    /// On shutdown the watcher stops first, then in-flight jobs are allowed
    /// to finish.
    pub async fn run_until<S>(self, shutdown: S) -> Result<BuildSummary, FatalError>
    where
        S: Future<Output = ()>,
    {
        let Self {
            settings,
            runner,
            mode,
            watch,
        } = self;

        let mut watcher = FileWatcher::new(settings.root_path(), &watch, default_source_filter()).await?;
        let runner = runner.with_root(watcher.watch_path());

        tracing::info!(
            root = %watcher.watch_path(),
            output = %settings.output_path(),
            mode = ?mode,
            "Starting"
        );

        let mut state = DispatchState::new(mode, runner);
        let mut receiving = true;
        tokio::pin!(shutdown);

        loop {
            if !receiving && state.jobs.is_empty() {
                break;
            }

            tokio::select! {
                event = watcher.recv(), if receiving => match event {
                    Some(WatchEvent::File(event)) => state.handle_file(event),
                    Some(WatchEvent::Ready) => {
                        tracing::info!(jobs = state.summary.jobs, "Initial scan complete");
                        if !mode.is_persistent() {
                            receiving = false;
                        }
                    }
                    Some(WatchEvent::Error(error)) => return Err(FatalError::Watch(error)),
                    None if mode.is_persistent() => {
                        return Err(FatalError::Watch(WatchError::ChannelClosed));
                    }
                    None => receiving = false,
                },
                Some(joined) = state.jobs.join_next() => state.handle_joined(joined),
                () = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
            }
        }

        if let Err(error) = watcher.shutdown().await {
            tracing::warn!(error = %error, "Error shutting down watcher");
        }
        state.drain().await;

        tracing::info!(
            compiled = state.summary.compiled,
            failed = state.summary.failed,
            files_written = state.summary.files_written,
            "Build finished"
        );
        Ok(state.summary)
    }
}

/// In-flight jobs and running totals for one run.
struct DispatchState {
    mode: RunMode,
    runner: JobRunner,
    jobs: JoinSet<JobReport>,
    summary: BuildSummary,
}

impl DispatchState {
    fn new(mode: RunMode, runner: JobRunner) -> Self {
        Self {
            mode,
            runner,
            jobs: JoinSet::new(),
            summary: BuildSummary::default(),
        }
    }

    fn handle_file(&mut self, event: FileEvent) {
        if !self.mode.handles(event.kind) {
            tracing::trace!(path = %event.path, kind = %event.kind, "Ignoring event in build mode");
            return;
        }

        tracing::info!(path = %event.path, "File has been {}", event.kind);

        match CompileJob::from_event(&event) {
            Some(job) => {
                self.summary.record_job();
                let runner = self.runner.clone();
                self.jobs.spawn(async move { runner.run(job).await });
            }
            None => self.summary.record_removed(),
        }
    }

    fn handle_joined(&mut self, joined: Result<JobReport, JoinError>) {
        match joined {
            Ok(report) => match report.outcome {
                Ok(output) => self.summary.record_compiled(&output),
                Err(error) => {
                    report_isolated(&error);
                    self.summary.record_failed();
                }
            },
            Err(join_error) => {
                report_isolated(&JobError::Panicked(join_error.to_string()));
                self.summary.record_failed();
            }
        }
    }

    async fn drain(&mut self) {
        while let Some(joined) = self.jobs.join_next().await {
            self.handle_joined(joined);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use camino::{Utf8Path, Utf8PathBuf};
    use tempfile::TempDir;
    use tokio::sync::oneshot;
    use tw_backend::TreeSitterBackend;
    use tw_core::{Schema, UserParams, resolve};
    use tw_watcher::FileEventKind;

    struct Project {
        _dir: TempDir,
        src: Utf8PathBuf,
        base: Utf8PathBuf,
    }

    impl Project {
        fn new() -> Self {
            Self::with_root("src")
        }

        fn with_root(relative: &str) -> Self {
            let dir = TempDir::new().unwrap();
            let base = Utf8Path::from_path(dir.path()).unwrap().canonicalize_utf8().unwrap();
            let src = base.join(relative);
            std::fs::create_dir_all(&src).unwrap();
            Self {
                _dir: dir,
                src,
                base,
            }
        }

        fn write(&self, relative: &str, contents: &str) -> Utf8PathBuf {
            let path = self.src.join(relative);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, contents).unwrap();
            path
        }

        fn settings(&self, watch: bool, out: &str) -> Arc<CanonicalSettings> {
            let params = UserParams {
                watch_mode: Some(watch),
                root_path: Some(self.src.clone()),
                output_path: Some(self.base.join(out)),
                ..UserParams::default()
            }
            .with_option(tw_core::OptionName::Sourcemap, serde_json::json!(true));
            Arc::new(resolve(Schema::standard(), &params).unwrap())
        }

        fn dispatcher(&self, watch: bool, out: &str) -> Dispatcher {
            Dispatcher::new(self.settings(watch, out), Arc::new(TreeSitterBackend::new())).with_watch_config(
                WatchConfig {
                    debounce_ms: 50,
                    ..WatchConfig::default()
                },
            )
        }
    }

    fn read_tree(root: &Utf8Path) -> Vec<(String, String)> {
        let mut files = Vec::new();
        let mut stack = vec![root.to_owned()];
        while let Some(dir) = stack.pop() {
            for entry in std::fs::read_dir(&dir).unwrap() {
                let path = Utf8PathBuf::try_from(entry.unwrap().path()).unwrap();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    let relative = path.strip_prefix(root).unwrap().to_string();
                    files.push((relative, std::fs::read_to_string(&path).unwrap()));
                }
            }
        }
        files.sort();
        files
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..60 {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        condition()
    }

    #[tokio::test]
    async fn test_build_compiles_existing_sources_only() {
        let project = Project::new();
        project.write("a.ts", "let a: number = 1;\n");
        project.write("lib/b.ts", "export const b = 2;\n");
        project.write("lib/c.ts", "enum C { X }\n");
        project.write("lib/types.d.ts", "declare const t: number;\n");
        project.write("notes.md", "# notes\n");

        let summary = project.dispatcher(false, "out").run().await.unwrap();

        assert_eq!(summary.jobs, 3);
        assert_eq!(summary.compiled, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.files_written, 6);

        let out = project.base.join("out");
        let names: Vec<String> = read_tree(&out).into_iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec!["a.js", "a.js.map", "lib/b.js", "lib/b.js.map", "lib/c.js", "lib/c.js.map"]
        );
    }

    #[tokio::test]
    async fn test_build_isolates_failures() {
        let project = Project::new();
        project.write("bad.ts", "let x = ;\n");
        project.write("good.ts", "let y: string = \"ok\";\n");

        let dispatcher = project.dispatcher(false, "out");
        let mode = dispatcher.mode();
        let summary = dispatcher.run().await.unwrap();

        assert_eq!(summary.jobs, 2);
        assert_eq!(summary.compiled, 1);
        assert_eq!(summary.failed, 1);
        assert!(project.base.join("out/good.js").exists());
        assert!(!project.base.join("out/bad.js").exists());
        assert_eq!(crate::ExitStatus::from_summary(mode, &summary).code(), 2);
    }

    #[tokio::test]
    async fn test_builds_are_byte_identical() {
        let project = Project::new();
        project.write("a.ts", "import { b } from \"./lib/b\";\nexport let a: number = b + 1;\n");
        project.write("lib/b.ts", "export const b = 2;\n");
        project.write("lib/e.ts", "export enum E { A = 1, B, C = \"c\" }\n");

        project.dispatcher(false, "out1").run().await.unwrap();
        project.dispatcher(false, "out2").run().await.unwrap();

        let first = read_tree(&project.base.join("out1"));
        let second = read_tree(&project.base.join("out2"));
        assert_eq!(first.len(), 6);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_build_missing_root_is_fatal() {
        let project = Project::new();
        let params = UserParams {
            watch_mode: Some(false),
            root_path: Some(project.base.join("missing")),
            output_path: Some(project.base.join("out")),
            ..UserParams::default()
        };
        let settings = Arc::new(resolve(Schema::standard(), &params).unwrap());

        let result = Dispatcher::new(settings, Arc::new(TreeSitterBackend::new())).run().await;
        assert!(matches!(result, Err(FatalError::Watch(WatchError::PathNotFound(_)))));
    }

    #[tokio::test]
    async fn test_removed_never_deletes_output() {
        let project = Project::new();
        let source = project.write("a.ts", "let a = 1;\n");
        let out = project.base.join("out");

        let runner = JobRunner::new(project.settings(true, "out"), Arc::new(TreeSitterBackend::new()))
            .with_root(&project.src);
        let mut state = DispatchState::new(RunMode::Watch, runner);

        state.handle_file(FileEvent::new(source.clone(), FileEventKind::Added));
        state.drain().await;
        assert!(out.join("a.js").exists());

        std::fs::remove_file(&source).unwrap();
        state.handle_file(FileEvent::new(source, FileEventKind::Removed));
        state.drain().await;

        assert_eq!(state.summary.removed, 1);
        assert_eq!(state.summary.jobs, 1);
        assert!(out.join("a.js").exists());
        assert!(out.join("a.js.map").exists());
    }

    #[tokio::test]
    async fn test_build_mode_ignores_changes() {
        let project = Project::new();
        let source = project.write("a.ts", "let a = 1;\n");
        let runner = JobRunner::new(project.settings(false, "out"), Arc::new(TreeSitterBackend::new()))
            .with_root(&project.src);
        let mut state = DispatchState::new(RunMode::Build, runner);

        state.handle_file(FileEvent::new(source.clone(), FileEventKind::Changed));
        state.handle_file(FileEvent::new(source, FileEventKind::Removed));
        state.drain().await;

        assert_eq!(state.summary, BuildSummary::default());
    }

    #[tokio::test]
    async fn test_failure_does_not_block_later_changes() {
        let project = Project::new();
        project.write("x.ts", "let x = ;\n");
        let y = project.write("y.ts", "let y = 1;\n");
        let y_out = project.base.join("out/y.js");

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let dispatcher = project.dispatcher(true, "out");
        let handle = tokio::spawn(dispatcher.run_until(async {
            let _ = stop_rx.await;
        }));

        assert!(wait_for(|| y_out.exists()).await);

        std::fs::write(&y, "let y = 2;\n").unwrap();
        let updated = wait_for(|| {
            std::fs::read_to_string(&y_out).is_ok_and(|code| code == "let y = 2;\n//# sourceMappingURL=y.js.map\n")
        })
        .await;

        stop_tx.send(()).unwrap();
        let summary = handle.await.unwrap().unwrap();

        assert!(updated);
        assert!(summary.failed >= 1);
        assert!(summary.compiled >= 2);
        assert!(!project.base.join("out/x.js").exists());
    }

    #[tokio::test]
    async fn test_build_root_below_node_modules() {
        let project = Project::with_root("node_modules/pkg/src");
        project.write("a.ts", "let a = 1;\n");
        project.write("node_modules/dep/b.ts", "let b = 2;\n");

        let summary = project.dispatcher(false, "out").run().await.unwrap();

        assert_eq!(summary.jobs, 1);
        assert_eq!(summary.compiled, 1);
        assert!(project.base.join("out/a.js").exists());
        assert!(!project.base.join("out/node_modules").exists());
    }

    #[tokio::test]
    async fn test_watch_compiles_directory_moved_into_root() {
        let project = Project::new();
        let staging = project.base.join("staging/pkg");
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join("m.ts"), "let m = 1;\n").unwrap();
        let m_out = project.base.join("out/pkg/m.js");

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let dispatcher = project.dispatcher(true, "out");
        let handle = tokio::spawn(dispatcher.run_until(async {
            let _ = stop_rx.await;
        }));

        // Give the watcher time to finish the empty initial scan
        tokio::time::sleep(Duration::from_millis(300)).await;
        std::fs::rename(&staging, project.src.join("pkg")).unwrap();

        let compiled = wait_for(|| m_out.exists()).await;

        stop_tx.send(()).unwrap();
        let summary = handle.await.unwrap().unwrap();

        assert!(compiled);
        assert!(summary.compiled >= 1);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_watch_root_removed_is_fatal() {
        let project = Project::new();
        project.write("a.ts", "let a = 1;\n");
        let a_out = project.base.join("out/a.js");

        let (_stop_tx, stop_rx) = oneshot::channel::<()>();
        let dispatcher = project.dispatcher(true, "out");
        let handle = tokio::spawn(dispatcher.run_until(async {
            let _ = stop_rx.await;
        }));

        assert!(wait_for(|| a_out.exists()).await);
        std::fs::remove_dir_all(&project.src).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("watch run did not stop after its root was removed")
            .unwrap();

        match result {
            Err(FatalError::Watch(WatchError::PathNotFound(path))) => assert_eq!(path, project.src),
            other => panic!("Expected PathNotFound, got {other:?}"),
        }
    }
}
