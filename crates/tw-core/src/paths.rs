//! Output path derivation.
//!
//! The output tree mirrors the source tree: a source file's path relative to
//! the source root is re-rooted under the output root and its extension is
//! replaced with `js`. Source maps sit next to the code file with a `.map`
//! suffix appended.
//!
//! All functions here are pure and purely lexical: nothing touches the file
//! system, so callers must pass source and root paths in the same form
//! (both absolute or both relative to the same directory).
//!
//! ```
//! use camino::Utf8Path;
//! use tw_core::{map_output_path, source_map_path};
//!
//! let out = map_output_path(
//!     Utf8Path::new("/root/a/b.ts"),
//!     Utf8Path::new("/root"),
//!     Utf8Path::new("/out"),
//! )?;
//! assert_eq!(out, "/out/a/b.js");
//! assert_eq!(source_map_path(&out), "/out/a/b.js.map");
//! # Ok::<(), tw_core::PathError>(())
//! ```

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

use crate::error::PathError;

/// Extension given to emitted code files.
pub const OUTPUT_EXTENSION: &str = "js";

/// Suffix appended to a code file path to name its source map.
pub const SOURCE_MAP_SUFFIX: &str = ".map";

/// Normalizes a path lexically.
///
/// `.` components are dropped and `..` removes the preceding normal
/// component where there is one. A `..` directly below the root is dropped,
/// so `/..` is `/`. Symlinks are not consulted.
#[must_use]
pub fn normalize(path: &Utf8Path) -> Utf8PathBuf {
    let mut normalized = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match normalized.components().next_back() {
                Some(Utf8Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Utf8Component::RootDir | Utf8Component::Prefix(_)) => {}
                Some(Utf8Component::CurDir | Utf8Component::ParentDir) | None => {
                    normalized.push(component.as_str());
                }
            },
            other => normalized.push(other.as_str()),
        }
    }
    normalized
}

/// Returns `source` relative to `root`.
///
/// This is the logical path handed to the compilation backend and used to
/// label diagnostics.
///
/// # Errors
///
/// [`PathError::OutsideRoot`] if `source` is not below `root`, and
/// [`PathError::NotAFile`] if it is `root` itself.
pub fn logical_path(source: &Utf8Path, root: &Utf8Path) -> Result<Utf8PathBuf, PathError> {
    let source = normalize(source);
    let root = normalize(root);

    let relative = source
        .strip_prefix(&root)
        .map_err(|_| PathError::OutsideRoot {
            path: source.clone(),
            root: root.clone(),
        })?;

    if relative.as_str().is_empty() {
        return Err(PathError::NotAFile(source.clone()));
    }
    Ok(relative.to_owned())
}

/// Maps a source file to its code file in the output tree.
///
/// # Errors
///
/// Same as [`logical_path`].
pub fn map_output_path(
    source: &Utf8Path,
    root: &Utf8Path,
    output: &Utf8Path,
) -> Result<Utf8PathBuf, PathError> {
    let relative = logical_path(source, root)?;
    Ok(normalize(output).join(relative.with_extension(OUTPUT_EXTENSION)))
}

/// Returns the source map path for an emitted code file.
#[must_use]
pub fn source_map_path(code_file: &Utf8Path) -> Utf8PathBuf {
    let mut path = code_file.as_str().to_owned();
    path.push_str(SOURCE_MAP_SUFFIX);
    Utf8PathBuf::from(path)
}
