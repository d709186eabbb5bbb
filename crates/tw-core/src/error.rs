//! Error types for the tw-core crate.
//!
//! [`ConfigError`] covers everything that can go wrong before a build starts:
//! loading a settings file, resolving compiler options and validating the
//! root and output paths. [`PathError`] is returned by the path mapper.

use camino::Utf8PathBuf;

/// Errors that can occur while loading or resolving settings.
///
/// Every variant is fatal: a process that fails to resolve its settings never
/// starts watching.
///
/// # Examples
///
/// ```
/// use tw_core::ConfigError;
///
/// let error = ConfigError::unknown_alias("moduleType", "xyz");
/// assert!(error.to_string().contains("moduleType"));
/// assert!(error.to_string().contains("xyz"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An aliased option received a token that is not in its alias table.
    #[error("unrecognized value '{token}' for compiler option '{option}'")]
    UnknownAlias {
        /// The option name as written by the user.
        option: String,
        /// The rejected token.
        token: String,
    },

    /// A compiler option has a value of the wrong type.
    #[error("invalid value for compiler option '{option}': {reason}")]
    InvalidOption {
        /// The option name as written by the user.
        option: String,
        /// Explanation of why the value was rejected.
        reason: String,
    },

    /// `rootPath` or `outputPath` is missing or empty.
    #[error("'{field}' is required and must not be empty")]
    MissingPath {
        /// The settings field that was missing.
        field: &'static str,
    },

    /// The settings file could not be read.
    #[error("failed to read settings file {path}: {source}")]
    Read {
        /// The settings file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON or has the wrong shape.
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        /// The settings file path.
        path: Utf8PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Creates a new [`ConfigError::UnknownAlias`] error.
    #[inline]
    pub fn unknown_alias(option: impl Into<String>, token: impl Into<String>) -> Self {
        Self::UnknownAlias {
            option: option.into(),
            token: token.into(),
        }
    }

    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new [`ConfigError::MissingPath`] error.
    #[inline]
    pub const fn missing_path(field: &'static str) -> Self {
        Self::MissingPath { field }
    }

    /// Returns the settings file path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => Some(path),
            Self::UnknownAlias { .. } | Self::InvalidOption { .. } | Self::MissingPath { .. } => {
                None
            }
        }
    }
}

/// Errors returned by the path mapper.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The source file does not live under the watched root.
    #[error("{path} is not inside the source root {root}")]
    OutsideRoot {
        /// The offending source path.
        path: Utf8PathBuf,
        /// The configured source root.
        root: Utf8PathBuf,
    },

    /// The source path names the root itself rather than a file below it.
    #[error("{0} does not name a file below the source root")]
    NotAFile(Utf8PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_unknown_alias_display() {
        let error = ConfigError::unknown_alias("target", "es2099");
        assert_eq!(
            error.to_string(),
            "unrecognized value 'es2099' for compiler option 'target'"
        );
        assert!(error.path().is_none());
    }

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::invalid_option("comments", "expected a boolean, got \"yes\"");
        let msg = error.to_string();
        assert!(msg.contains("comments"));
        assert!(msg.contains("expected a boolean"));
    }

    #[test]
    fn test_missing_path_display() {
        let error = ConfigError::missing_path("outputPath");
        assert_eq!(error.to_string(), "'outputPath' is required and must not be empty");
    }

    #[test]
    fn test_read_error_has_path() {
        let error = ConfigError::Read {
            path: Utf8PathBuf::from("tscwatch.json"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(error.path().map(|p| p.as_str()), Some("tscwatch.json"));
        assert!(error.to_string().contains("tscwatch.json"));
    }

    #[test]
    fn test_path_error_display() {
        let error = PathError::OutsideRoot {
            path: Utf8PathBuf::from("/elsewhere/a.ts"),
            root: Utf8PathBuf::from("/root"),
        };
        assert_eq!(error.to_string(), "/elsewhere/a.ts is not inside the source root /root");
    }
}
