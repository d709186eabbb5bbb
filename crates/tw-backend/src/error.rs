//! Error types for the tw-backend crate.
//!
//! [`BackendError`] describes failures of the backend itself. Problems in
//! the compiled source are not errors at this level: they are reported as
//! [`Diagnostic`](crate::Diagnostic)s inside an
//! [`EmitResult`](crate::EmitResult).

use camino::Utf8PathBuf;

/// Internal failures of a compilation backend.
///
/// # Examples
///
/// ```
/// use tw_backend::BackendError;
///
/// fn describe(err: &BackendError) -> String {
///     match err {
///         BackendError::LanguageInit => "grammar unavailable".to_owned(),
///         BackendError::QueryCompile { offset, .. } => format!("bad query at {offset}"),
///         BackendError::Parse(path) => format!("no tree for {path}"),
///         BackendError::SourceMap(e) => e.to_string(),
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Failed to set the TypeScript language on the parser.
    #[error("failed to set TypeScript language")]
    LanguageInit,

    /// Failed to compile a tree-sitter query.
    #[error("failed to compile query at offset {offset}: {kind:?}")]
    QueryCompile {
        /// The byte offset in the query string where the error occurred.
        offset: usize,
        /// The kind of query error.
        kind: tree_sitter::QueryError,
    },

    /// The parser returned no syntax tree.
    #[error("failed to parse {0}")]
    Parse(Utf8PathBuf),

    /// The source map could not be serialized.
    #[error("failed to serialize source map: {0}")]
    SourceMap(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_init_display() {
        assert_eq!(
            BackendError::LanguageInit.to_string(),
            "failed to set TypeScript language"
        );
    }

    #[test]
    fn test_parse_display() {
        let err = BackendError::Parse(Utf8PathBuf::from("a/b.ts"));
        assert_eq!(err.to_string(), "failed to parse a/b.ts");
    }
}
