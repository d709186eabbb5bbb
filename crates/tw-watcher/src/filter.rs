//! Path filtering for the scan and for watch events.
//!
//! Filtering happens at the source: the initial scan and the notify
//! callback both consult the same [`FileFilter`], so the consumer only
//! ever sees accepted paths. Both pass paths relative to the watched
//! root, so directories above the root never affect the result.
//!
//! # Examples
//!
//! ```
//! use tw_watcher::{FileFilter, default_source_filter};
//! use camino::Utf8Path;
//!
//! let filter = default_source_filter();
//!
//! assert!(filter.should_process(Utf8Path::new("src/app.ts")));
//! assert!(filter.should_process(Utf8Path::new("src/App.TS")));
//!
//! assert!(!filter.should_process(Utf8Path::new("src/types.d.ts")));
//! assert!(!filter.should_process(Utf8Path::new("src/app.js")));
//! assert!(!filter.should_process(Utf8Path::new("node_modules/pkg/index.ts")));
//! ```

use camino::Utf8Path;
use smallvec::SmallVec;

/// Directory names never scanned or watched.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &["node_modules", ".git"];

/// Extension of compilable source files, compared case-insensitively.
const SOURCE_EXTENSION: &str = "ts";

/// Suffix of declaration files, compared case-insensitively.
const DECLARATION_SUFFIX: &str = ".d.ts";

/// A predicate deciding which paths reach the consumer.
///
/// `path` is relative to the watched root.
///
/// # Thread Safety
///
/// Filters run inside the notify callback on the blocking watcher thread,
/// so they must be [`Send`], [`Sync`] and `'static`.
///
/// # Examples
///
/// ```
/// use tw_watcher::FileFilter;
/// use camino::Utf8Path;
///
/// struct OnlySrc;
///
/// impl FileFilter for OnlySrc {
///     fn should_process(&self, path: &Utf8Path) -> bool {
///         path.components().any(|c| c.as_str() == "src")
///     }
/// }
/// ```
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if `path` should be reported.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// A filter that accepts every path.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// Accepts `.ts` files (any case) that are not `.d.ts` declaration files.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceFilter;

impl SourceFilter {
    fn has_source_extension(path: &Utf8Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SOURCE_EXTENSION))
    }

    fn is_declaration_file(path: &Utf8Path) -> bool {
        path.file_name().is_some_and(|name| {
            name.len() > DECLARATION_SUFFIX.len()
                && name
                    .get(name.len() - DECLARATION_SUFFIX.len()..)
                    .is_some_and(|tail| tail.eq_ignore_ascii_case(DECLARATION_SUFFIX))
        })
    }
}

impl FileFilter for SourceFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        Self::has_source_extension(path) && !Self::is_declaration_file(path)
    }
}

/// Rejects paths with a component naming an excluded directory.
///
/// Only the components it is given count; the watcher hands it
/// root-relative paths.
///
/// # Examples
///
/// ```
/// use tw_watcher::{ExcludeDirsFilter, FileFilter};
/// use camino::Utf8Path;
///
/// let filter = ExcludeDirsFilter::default().with_dir("vendor");
/// assert!(!filter.should_process(Utf8Path::new("node_modules/a.ts")));
/// assert!(!filter.should_process(Utf8Path::new("vendor/a.ts")));
/// assert!(filter.should_process(Utf8Path::new("src/a.ts")));
/// ```
#[derive(Debug, Clone)]
pub struct ExcludeDirsFilter {
    dirs: SmallVec<[String; 4]>,
}

impl ExcludeDirsFilter {
    /// Creates a filter excluding exactly `dirs`.
    #[must_use]
    pub fn new(dirs: &[&str]) -> Self {
        Self {
            dirs: dirs.iter().map(|d| (*d).to_owned()).collect(),
        }
    }

    /// Adds another directory name to exclude.
    #[must_use]
    pub fn with_dir(mut self, dir: impl Into<String>) -> Self {
        let dir = dir.into();
        if !self.dirs.contains(&dir) {
            self.dirs.push(dir);
        }
        self
    }

    /// The excluded directory names.
    #[must_use]
    pub fn dirs(&self) -> &[String] {
        &self.dirs
    }

    /// Returns `true` if `name` is an excluded directory name.
    #[must_use]
    pub fn is_excluded(&self, name: &str) -> bool {
        self.dirs.iter().any(|d| d == name)
    }
}

impl Default for ExcludeDirsFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED_DIRS)
    }
}

impl FileFilter for ExcludeDirsFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        !path.components().any(|c| self.is_excluded(c.as_str()))
    }
}

/// Combines filters with AND logic.
///
/// An empty composite accepts everything.
pub struct CompositeFilter {
    filters: Vec<Box<dyn FileFilter>>,
}

impl CompositeFilter {
    /// Creates an empty composite.
    #[must_use]
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Adds a filter that must also accept the path.
    #[must_use]
    pub fn and<F: FileFilter>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl Default for CompositeFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CompositeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeFilter")
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl FileFilter for CompositeFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        self.filters.iter().all(|f| f.should_process(path))
    }
}

impl<F: FileFilter + ?Sized> FileFilter for Box<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

impl<F: FileFilter + ?Sized> FileFilter for std::sync::Arc<F> {
    fn should_process(&self, path: &Utf8Path) -> bool {
        (**self).should_process(path)
    }
}

/// The filter used by the build: [`SourceFilter`] and the default
/// [`ExcludeDirsFilter`].
#[must_use]
pub fn default_source_filter() -> CompositeFilter {
    CompositeFilter::new()
        .and(SourceFilter)
        .and(ExcludeDirsFilter::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_accept_all_filter() {
        assert!(AcceptAllFilter.should_process(Utf8Path::new("anything.txt")));
        assert!(AcceptAllFilter.should_process(Utf8Path::new("")));
    }

    #[test]
    fn test_source_filter_extensions() {
        let filter = SourceFilter;
        assert!(filter.should_process(Utf8Path::new("src/app.ts")));
        assert!(filter.should_process(Utf8Path::new("src/APP.TS")));
        assert!(filter.should_process(Utf8Path::new("src/app.Ts")));

        assert!(!filter.should_process(Utf8Path::new("src/app.tsx")));
        assert!(!filter.should_process(Utf8Path::new("src/app.js")));
        assert!(!filter.should_process(Utf8Path::new("src/ts")));
        assert!(!filter.should_process(Utf8Path::new("README.md")));
    }

    #[test]
    fn test_source_filter_declarations() {
        let filter = SourceFilter;
        assert!(!filter.should_process(Utf8Path::new("src/types.d.ts")));
        assert!(!filter.should_process(Utf8Path::new("src/TYPES.D.TS")));
        // Only the file name counts
        assert!(filter.should_process(Utf8Path::new("src/x.d/app.ts")));
        assert!(filter.should_process(Utf8Path::new("src/d.ts")));
    }

    #[test]
    fn test_exclude_dirs_filter() {
        let filter = ExcludeDirsFilter::default();
        assert!(!filter.should_process(Utf8Path::new("node_modules/a.ts")));
        assert!(!filter.should_process(Utf8Path::new("/p/src/node_modules/pkg/a.ts")));
        assert!(!filter.should_process(Utf8Path::new("/p/.git/hooks/a.ts")));
        assert!(filter.should_process(Utf8Path::new("/p/src/node_modules_old/a.ts")));
        assert_eq!(filter.dirs().len(), 2);
    }

    #[test]
    fn test_exclude_dirs_with_dir_deduplicates() {
        let filter = ExcludeDirsFilter::new(&[]).with_dir("out").with_dir("out");
        assert_eq!(filter.dirs(), ["out".to_owned()]);
        assert!(!filter.should_process(Utf8Path::new("/p/out/a.ts")));
    }

    #[test]
    fn test_composite_filter() {
        let filter = default_source_filter();
        assert!(filter.should_process(Utf8Path::new("/p/src/a.ts")));
        assert!(!filter.should_process(Utf8Path::new("/p/node_modules/a.ts")));
        assert!(!filter.should_process(Utf8Path::new("/p/src/a.d.ts")));

        assert!(CompositeFilter::new().should_process(Utf8Path::new("anything")));
    }

    #[test]
    fn test_boxed_and_shared_filters() {
        let boxed: Box<dyn FileFilter> = Box::new(SourceFilter);
        assert!(boxed.should_process(Utf8Path::new("a.ts")));

        let shared = Arc::new(default_source_filter());
        let clone = Arc::clone(&shared);
        assert!(clone.should_process(Utf8Path::new("a.ts")));
        assert!(!shared.should_process(Utf8Path::new("a.js")));
    }
}
