//! Pre-compiled tree-sitter query for module analysis.
//!
//! [`MODULE_QUERY`] finds top-level import and export statements and every
//! identifier that could be a value reference. The emitter uses the result
//! to decide whether a file is a module and which imported bindings are
//! referenced at runtime.

use std::sync::OnceLock;

use tree_sitter::{Language, Query};

use crate::error::BackendError;
use crate::parser::typescript_language;

/// Tree-sitter query for module analysis.
///
/// # Capture Names
///
/// - `module.import` - A top-level `import_statement`
/// - `module.export` - A top-level `export_statement`
/// - `value.name` - An identifier, possibly in a value position
pub const MODULE_QUERY: &str = r"
; Top-level imports
(program (import_statement) @module.import)

; Top-level exports
(program (export_statement) @module.export)

; Identifier references, filtered by ancestry afterwards
(identifier) @value.name
(shorthand_property_identifier) @value.name
";

/// Capture index for `module.import`.
pub const CAPTURE_MODULE_IMPORT: u32 = 0;

/// Capture index for `module.export`.
pub const CAPTURE_MODULE_EXPORT: u32 = 1;

/// Capture index for `value.name`.
pub const CAPTURE_VALUE_NAME: u32 = 2;

static COMPILED_MODULE_QUERY: OnceLock<Query> = OnceLock::new();

/// Returns the compiled module query.
///
/// The query is compiled once and cached for all subsequent calls.
pub fn get_module_query() -> Result<&'static Query, BackendError> {
    if let Some(query) = COMPILED_MODULE_QUERY.get() {
        return Ok(query);
    }

    let query = compile_query(&typescript_language())?;
    Ok(COMPILED_MODULE_QUERY.get_or_init(|| query))
}

fn compile_query(language: &Language) -> Result<Query, BackendError> {
    Query::new(language, MODULE_QUERY).map_err(|e| BackendError::QueryCompile {
        offset: e.offset,
        kind: e,
    })
}
