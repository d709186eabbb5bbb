//! Tree-sitter parser setup and syntax error collection.

use camino::Utf8Path;
use tree_sitter::{Language, Node, Parser, Tree};

use crate::diagnostic::Diagnostic;
use crate::error::BackendError;

/// Returns the TypeScript grammar.
pub(crate) fn typescript_language() -> Language {
    tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
}

/// Parses `source` as TypeScript.
///
/// A fresh parser is created per call, so concurrent compilations share no
/// parser state.
pub(crate) fn parse(source: &str, logical_path: &Utf8Path) -> Result<Tree, BackendError> {
    let mut parser = Parser::new();
    parser
        .set_language(&typescript_language())
        .map_err(|_| BackendError::LanguageInit)?;

    parser
        .parse(source, None)
        .ok_or_else(|| BackendError::Parse(logical_path.to_owned()))
}

/// Collects `ERROR` and `MISSING` nodes as diagnostics.
pub(crate) fn syntax_diagnostics(tree: &Tree, source: &str, unit: &Utf8Path) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    if tree.root_node().has_error() {
        collect_errors(tree.root_node(), source, unit, &mut diagnostics);
    }
    diagnostics
}

fn collect_errors(node: Node<'_>, source: &str, unit: &Utf8Path, out: &mut Vec<Diagnostic>) {
    if node.is_missing() {
        out.push(Diagnostic::new(
            format!("'{}' expected.", node.kind()),
            unit,
            node.start_byte(),
            0,
        ));
        return;
    }

    if node.is_error() {
        let text = source.get(node.byte_range()).unwrap_or_default();
        let excerpt: String = text.chars().take_while(|c| *c != '\n').take(40).collect();
        out.push(Diagnostic::new(
            format!("Unexpected token '{}'.", excerpt.trim()),
            unit,
            node.start_byte(),
            node.end_byte() - node.start_byte(),
        ));
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            collect_errors(child, source, unit, out);
        }
    }
}
