//! Initial directory scan.
//!
//! [`FileWalker`] uses the `ignore` crate to list the source files that
//! already exist under the watched root. Unlike a repository scan it does
//! not honour `.gitignore` or skip hidden files: the watcher reports every
//! matching file regardless, so the scan must agree with it.
//!
//! Filters see paths relative to the walker's root, so a root that itself
//! lives below `node_modules` is still scanned.
//!
//! # Examples
//!
//! ```no_run
//! use tw_watcher::{FileWalker, default_source_filter};
//! use camino::Utf8Path;
//!
//! let walker = FileWalker::new(Utf8Path::new("./src"))?;
//! for path in walker.collect_paths(&default_source_filter())? {
//!     println!("found {path}");
//! }
//! # Ok::<(), tw_watcher::WatchError>(())
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;

use crate::error::WatchError;
use crate::filter::{DEFAULT_EXCLUDED_DIRS, FileFilter};

/// Lists matching files under a root directory.
#[derive(Debug)]
pub struct FileWalker {
    /// The root directory to walk.
    root: Utf8PathBuf,
    /// Directory names pruned during traversal.
    skip_dirs: Vec<String>,
}

impl FileWalker {
    /// Creates a walker for `root`.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if `root` does not exist and
    /// [`WatchError::NotADirectory`] if it is not a directory.
    pub fn new(root: &Utf8Path) -> Result<Self, WatchError> {
        if !root.exists() {
            return Err(WatchError::path_not_found(root));
        }
        if !root.is_dir() {
            return Err(WatchError::NotADirectory(root.to_owned()));
        }

        Ok(Self {
            root: root.to_owned(),
            skip_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(ToString::to_string).collect(),
        })
    }

    /// Returns the root directory being walked.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Collects every file accepted by `filter`, sorted by path.
    ///
    /// Non-UTF-8 paths are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Walk`] if traversal fails.
    pub fn collect_paths<F: FileFilter + ?Sized>(
        &self,
        filter: &F,
    ) -> Result<Vec<Utf8PathBuf>, WatchError> {
        self.collect_paths_in(&self.root, filter)
    }

    /// Like [`FileWalker::collect_paths`], but only walks `dir`.
    ///
    /// `filter` still sees paths relative to the walker's root, so a `dir`
    /// below an excluded directory yields nothing.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Walk`] if traversal fails.
    pub fn collect_paths_in<F: FileFilter + ?Sized>(
        &self,
        dir: &Utf8Path,
        filter: &F,
    ) -> Result<Vec<Utf8PathBuf>, WatchError> {
        let mut paths = Vec::new();

        for result in self.build_walker(dir) {
            let entry = result?;

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let Some(path) = Utf8Path::from_path(entry.path()) else {
                tracing::warn!(
                    path = %entry.path().display(),
                    "Skipping non-UTF-8 path during scan"
                );
                continue;
            };

            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            if filter.should_process(relative) {
                paths.push(path.to_owned());
            } else {
                tracing::trace!(path = %path, "Filtered out during scan");
            }
        }

        paths.sort();
        Ok(paths)
    }

    fn build_walker(&self, start: &Utf8Path) -> ignore::Walk {
        let skip_dirs = self.skip_dirs.clone();
        WalkBuilder::new(start)
            .standard_filters(false)
            .follow_links(false)
            .threads(1)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                !(is_dir
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| skip_dirs.iter().any(|d| d == name)))
            })
            .build()
    }
}
