//! ES module syntax lowered to CommonJS `require` / `exports`.
//!
//! [`ModuleInfo`] is computed once per file from the module query. It tells
//! the emitter whether the file is a module at all and which names are
//! referenced as values, so imports used only in type positions can be
//! dropped. [`ModuleLowering`] turns individual `import` and `export`
//! statements into edits and records the required module specifiers for
//! the AMD dependency list.

use std::fmt::Write as _;

use smallvec::SmallVec;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, QueryCursor, Tree};
use tw_core::{FxHashSet, ModuleKind, ScriptTarget};

use crate::error::BackendError;
use crate::output::EditList;
use crate::queries::{
    CAPTURE_MODULE_EXPORT, CAPTURE_MODULE_IMPORT, CAPTURE_VALUE_NAME, get_module_query,
};

/// Ancestors under which an identifier is never a runtime reference.
const TYPE_CONTEXTS: &[&str] = &[
    "type_annotation",
    "type_arguments",
    "type_parameters",
    "type_query",
    "asserts_annotation",
    "type_predicate_annotation",
    "interface_declaration",
    "type_alias_declaration",
    "implements_clause",
    "ambient_declaration",
    "function_signature",
    "method_signature",
    "abstract_method_signature",
    "index_signature",
    "import_statement",
];

/// Declarations that produce no runtime value.
const TYPE_DECLARATIONS: &[&str] = &[
    "interface_declaration",
    "type_alias_declaration",
    "ambient_declaration",
    "function_signature",
];

/// Expressions that can carry their own name.
const NAMED_EXPRESSIONS: &[&str] = &["class", "function_expression", "generator_function"];

/// Marks CommonJS output of an ES module.
pub(crate) fn es_module_marker(target: ScriptTarget) -> &'static str {
    match target {
        ScriptTarget::Es3 => "exports.__esModule = true;",
        ScriptTarget::Es5 => "Object.defineProperty(exports, \"__esModule\", { value: true });",
    }
}

/// Copies every own export of the required module except `default`.
const EXPORT_STAR_HELPER: &str = "(function (m) { for (var p in m) if (p !== \"default\" && !exports.hasOwnProperty(p)) exports[p] = m[p]; })";

/// What the emitter should do after an `export` statement was lowered.
#[derive(Debug)]
pub(crate) enum AfterExport<'t> {
    /// The statement was fully handled.
    Done,
    /// The given child still needs the ordinary type-erasing pass.
    Visit(Node<'t>),
}

/// Module facts about one source file.
#[derive(Debug, Default)]
pub(crate) struct ModuleInfo {
    is_module: bool,
    has_es_exports: bool,
    value_refs: FxHashSet<String>,
    type_only: FxHashSet<String>,
    all_names: FxHashSet<String>,
}

impl ModuleInfo {
    /// Analyzes `tree`.
    pub(crate) fn analyze(tree: &Tree, source: &str) -> Result<Self, BackendError> {
        let query = get_module_query()?;
        let mut info = Self::default();
        let text = |node: Node<'_>| source.get(node.byte_range()).unwrap_or_default().to_owned();

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, tree.root_node(), source.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let node = capture.node;
                match capture.index {
                    CAPTURE_MODULE_IMPORT => info.is_module = true,
                    CAPTURE_MODULE_EXPORT => {
                        info.is_module = true;
                        if !is_export_assignment(node) && !is_global_alias(node) {
                            info.has_es_exports = true;
                        }
                    }
                    CAPTURE_VALUE_NAME => {
                        let name = text(node);
                        if !in_type_context(node) {
                            info.value_refs.insert(name.clone());
                        }
                        info.all_names.insert(name);
                    }
                    _ => {}
                }
            }
        }

        info.type_only = top_level_type_names(tree.root_node(), source);
        Ok(info)
    }

    /// Whether the file contains top-level `import` or `export` syntax.
    pub(crate) const fn is_module(&self) -> bool {
        self.is_module
    }

    /// Whether the output needs the `__esModule` marker.
    pub(crate) const fn has_es_exports(&self) -> bool {
        self.has_es_exports
    }

    fn is_value_referenced(&self, name: &str) -> bool {
        self.value_refs.contains(name)
    }

    fn is_type_only(&self, name: &str) -> bool {
        self.type_only.contains(name)
    }
}

fn in_type_context(node: Node<'_>) -> bool {
    let mut current = node.parent();
    while let Some(parent) = current {
        if TYPE_CONTEXTS.contains(&parent.kind()) {
            return true;
        }
        current = parent.parent();
    }
    false
}

/// Whether `node` has an anonymous child token `token`.
pub(crate) fn has_token(node: Node<'_>, token: &str) -> bool {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token)
}

fn is_export_assignment(node: Node<'_>) -> bool {
    has_token(node, "=")
}

fn is_global_alias(node: Node<'_>) -> bool {
    has_token(node, "namespace")
}

/// Names declared only as types at the top level.
fn top_level_type_names(root: Node<'_>, source: &str) -> FxHashSet<String> {
    let mut types = FxHashSet::default();
    let mut values = FxHashSet::default();

    let mut cursor = root.walk();
    for statement in root.named_children(&mut cursor) {
        let declaration = if statement.kind() == "export_statement" {
            statement.child_by_field_name("declaration")
        } else {
            Some(statement)
        };
        let Some(declaration) = declaration else { continue };
        let names = declared_names(declaration, source);
        match declaration.kind() {
            "interface_declaration" | "type_alias_declaration" => types.extend(names),
            _ => values.extend(names),
        }
    }

    types.retain(|name| !values.contains(name));
    types
}

/// Names bound by a declaration statement.
pub(crate) fn declared_names(declaration: Node<'_>, source: &str) -> SmallVec<[String; 2]> {
    let mut names = SmallVec::new();
    match declaration.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = declaration.walk();
            for declarator in declaration.named_children(&mut cursor) {
                if let Some(pattern) = declarator.child_by_field_name("name") {
                    collect_pattern_names(pattern, source, &mut names);
                }
            }
        }
        _ => {
            if let Some(name) = declaration.child_by_field_name("name") {
                if let Some(text) = source.get(name.byte_range()) {
                    names.push(text.to_owned());
                }
            }
        }
    }
    names
}

fn collect_pattern_names(pattern: Node<'_>, source: &str, out: &mut SmallVec<[String; 2]>) {
    match pattern.kind() {
        "identifier" | "shorthand_property_identifier_pattern" => {
            if let Some(text) = source.get(pattern.byte_range()) {
                out.push(text.to_owned());
            }
        }
        "assignment_pattern" | "object_assignment_pattern" => {
            if let Some(left) = pattern.child_by_field_name("left") {
                collect_pattern_names(left, source, out);
            }
        }
        "pair_pattern" => {
            if let Some(value) = pattern.child_by_field_name("value") {
                collect_pattern_names(value, source, out);
            }
        }
        _ => {
            let mut cursor = pattern.walk();
            for child in pattern.named_children(&mut cursor) {
                collect_pattern_names(child, source, out);
            }
        }
    }
}

/// One local binding introduced by an import clause.
#[derive(Debug)]
struct ImportBinding {
    local: String,
    /// Property read from the module object; `None` for a namespace import.
    imported: Option<String>,
}

/// Lowers import and export statements of one file.
#[derive(Debug)]
pub(crate) struct ModuleLowering<'a> {
    source: &'a str,
    info: &'a ModuleInfo,
    kind: ModuleKind,
    target: ScriptTarget,
    temps: FxHashSet<String>,
    dependencies: SmallVec<[String; 4]>,
}

impl<'a> ModuleLowering<'a> {
    pub(crate) fn new(
        source: &'a str,
        info: &'a ModuleInfo,
        kind: ModuleKind,
        target: ScriptTarget,
    ) -> Self {
        Self {
            source,
            info,
            kind,
            target,
            temps: FxHashSet::default(),
            dependencies: SmallVec::new(),
        }
    }

    /// Module specifiers required so far, in first-use order.
    pub(crate) fn into_dependencies(self) -> SmallVec<[String; 4]> {
        self.dependencies
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }

    /// Renders `require("m")` and records `m` as a dependency.
    fn require(&mut self, specifier: Node<'_>) -> String {
        let module = string_value(self.text(specifier));
        if !self.dependencies.iter().any(|d| *d == module) {
            self.dependencies.push(module.clone());
        }
        format!("require(\"{module}\")")
    }

    /// A fresh temporary named after the module, such as `math_1`.
    fn temp_name(&mut self, specifier: Node<'_>) -> String {
        let module = string_value(self.text(specifier));
        let base: String = module
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '$' { c } else { '_' })
            .collect();
        let base = if base.is_empty() || base.starts_with(|c: char| c.is_ascii_digit()) {
            format!("_{base}")
        } else {
            base
        };

        let mut n = 1;
        loop {
            let candidate = format!("{base}_{n}");
            if !self.info.all_names.contains(&candidate) && self.temps.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    /// `.name`, or `["name"]` when `name` is not a valid dotted property
    /// for the target.
    fn property(&self, name: &str) -> String {
        let reserved = self.target == ScriptTarget::Es3 && RESERVED_WORDS.contains(&name);
        if reserved || !is_identifier(name) {
            format!("[\"{name}\"]")
        } else {
            format!(".{name}")
        }
    }

    /// Lowers an `import_statement`.
    pub(crate) fn lower_import(&mut self, node: Node<'_>, edits: &mut EditList) {
        if has_token(node, "type") || has_token(node, "typeof") {
            edits.erase(node.byte_range());
            return;
        }

        let specifier = node.child_by_field_name("source");
        let mut cursor = node.walk();
        let clause = node
            .named_children(&mut cursor)
            .find(|c| matches!(c.kind(), "import_clause" | "import_require_clause"));

        match (clause, specifier) {
            (None, Some(specifier)) => {
                let require = self.require(specifier);
                edits.replace(node.byte_range(), format!("{require};"));
            }
            (Some(clause), _) if clause.kind() == "import_require_clause" => {
                self.lower_import_require(node, clause, edits);
            }
            (Some(clause), Some(specifier)) => {
                let bindings = self.import_bindings(clause);
                self.lower_import_clause(node, specifier, &bindings, edits);
            }
            (Some(_) | None, None) => {}
        }
    }

    fn lower_import_require(&mut self, node: Node<'_>, clause: Node<'_>, edits: &mut EditList) {
        let mut cursor = clause.walk();
        let name = clause
            .named_children(&mut cursor)
            .find(|c| c.kind() == "identifier")
            .map(|n| self.text(n));
        let specifier = clause.child_by_field_name("source");

        match (name, specifier) {
            (Some(name), Some(specifier)) if self.info.is_value_referenced(name) => {
                let require = self.require(specifier);
                edits.replace(node.byte_range(), format!("var {name} = {require};"));
            }
            _ => edits.erase(node.byte_range()),
        }
    }

    fn import_bindings(&self, clause: Node<'_>) -> SmallVec<[ImportBinding; 4]> {
        let mut bindings = SmallVec::new();
        let mut cursor = clause.walk();
        for part in clause.named_children(&mut cursor) {
            match part.kind() {
                "identifier" => bindings.push(ImportBinding {
                    local: self.text(part).to_owned(),
                    imported: Some("default".to_owned()),
                }),
                "namespace_import" => {
                    let mut inner = part.walk();
                    if let Some(name) = part.named_children(&mut inner).find(|c| c.kind() == "identifier") {
                        bindings.push(ImportBinding {
                            local: self.text(name).to_owned(),
                            imported: None,
                        });
                    }
                }
                "named_imports" => {
                    let mut inner = part.walk();
                    for spec in part.named_children(&mut inner) {
                        if spec.kind() != "import_specifier" || has_token(spec, "type") {
                            continue;
                        }
                        let Some(name) = spec.child_by_field_name("name") else { continue };
                        let imported = string_value(self.text(name));
                        let local = spec
                            .child_by_field_name("alias")
                            .map_or_else(|| imported.clone(), |alias| self.text(alias).to_owned());
                        bindings.push(ImportBinding {
                            local,
                            imported: Some(imported),
                        });
                    }
                }
                _ => {}
            }
        }
        bindings
    }

    fn lower_import_clause(
        &mut self,
        node: Node<'_>,
        specifier: Node<'_>,
        bindings: &[ImportBinding],
        edits: &mut EditList,
    ) {
        let used: SmallVec<[&ImportBinding; 4]> = bindings
            .iter()
            .filter(|b| self.info.is_value_referenced(&b.local))
            .collect();
        if used.is_empty() {
            tracing::trace!(statement = self.text(node), "Eliding unused import");
            edits.erase(node.byte_range());
            return;
        }

        let require = self.require(specifier);
        let namespace = bindings.iter().find(|b| b.imported.is_none());
        let named: SmallVec<[&ImportBinding; 4]> =
            used.iter().copied().filter(|b| b.imported.is_some()).collect();

        let mut out = String::from("var ");
        match (namespace, named.as_slice()) {
            (_, [single]) if namespace.is_none_or(|ns| !self.info.is_value_referenced(&ns.local)) => {
                let property = self.property(single.imported.as_deref().unwrap_or_default());
                let _ = write!(out, "{} = {require}{property}", single.local);
            }
            _ => {
                let object = match namespace {
                    Some(ns) => ns.local.clone(),
                    None => self.temp_name(specifier),
                };
                let _ = write!(out, "{object} = {require}");
                for binding in &named {
                    let property = self.property(binding.imported.as_deref().unwrap_or_default());
                    let _ = write!(out, ", {} = {object}{property}", binding.local);
                }
            }
        }
        out.push(';');
        edits.replace(node.byte_range(), out);
    }

    /// Lowers an `export_statement`.
    pub(crate) fn lower_export<'t>(&mut self, node: Node<'t>, edits: &mut EditList) -> AfterExport<'t> {
        if has_token(node, "type") || is_global_alias(node) {
            edits.erase(node.byte_range());
            return AfterExport::Done;
        }

        if is_export_assignment(node) {
            return self.lower_export_assignment(node, edits);
        }

        if let Some(declaration) = node.child_by_field_name("declaration") {
            return self.lower_export_declaration(node, declaration, edits);
        }

        if let Some(value) = node.child_by_field_name("value") {
            let default = self.property("default");
            // `export default class C {}` may parse as a named class expression.
            if NAMED_EXPRESSIONS.contains(&value.kind()) {
                if let Some(name) = value.child_by_field_name("name") {
                    edits.erase(node.start_byte()..value.start_byte());
                    let name = self.text(name);
                    edits.insert(value.end_byte(), format!(" exports{default} = {name};"));
                    return AfterExport::Visit(value);
                }
            }
            let prefix = format!("exports{default} = ");
            edits.replace(node.start_byte()..value.start_byte(), prefix);
            if !self.text(node).ends_with(';') {
                edits.insert(node.end_byte(), ";");
            }
            return AfterExport::Visit(value);
        }

        let specifier = node.child_by_field_name("source");
        let mut cursor = node.walk();
        let children: SmallVec<[Node<'t>; 8]> = node.named_children(&mut cursor).collect();
        let clause = children.iter().copied().find(|c| c.kind() == "export_clause");
        let namespace = children.iter().copied().find(|c| c.kind() == "namespace_export");

        match (clause, namespace, specifier) {
            (Some(clause), _, Some(specifier)) => self.lower_reexport(node, clause, specifier, edits),
            (Some(clause), _, None) => self.lower_export_clause(node, clause, edits),
            (None, Some(namespace), Some(specifier)) => {
                let mut inner = namespace.walk();
                let name = namespace
                    .named_children(&mut inner)
                    .next()
                    .map(|n| string_value(self.text(n)))
                    .unwrap_or_default();
                let require = self.require(specifier);
                let property = self.property(&name);
                edits.replace(node.byte_range(), format!("exports{property} = {require};"));
            }
            (None, None, Some(specifier)) => {
                let require = self.require(specifier);
                edits.replace(node.byte_range(), format!("{EXPORT_STAR_HELPER}({require});"));
            }
            _ => {}
        }
        AfterExport::Done
    }

    fn lower_export_assignment<'t>(&self, node: Node<'t>, edits: &mut EditList) -> AfterExport<'t> {
        let mut cursor = node.walk();
        let Some(value) = node.named_children(&mut cursor).find(|c| c.kind() != "comment") else {
            return AfterExport::Done;
        };
        let prefix = match self.kind {
            ModuleKind::CommonJs => "module.exports = ",
            ModuleKind::Amd => "return ",
        };
        edits.replace(node.start_byte()..value.start_byte(), prefix);
        AfterExport::Visit(value)
    }

    fn lower_export_declaration<'t>(
        &self,
        node: Node<'t>,
        declaration: Node<'t>,
        edits: &mut EditList,
    ) -> AfterExport<'t> {
        let kind = declaration.kind();
        if TYPE_DECLARATIONS.contains(&kind) {
            edits.erase(node.byte_range());
            return AfterExport::Done;
        }

        if kind == "import_alias" {
            let mut cursor = declaration.walk();
            let parts: SmallVec<[Node<'_>; 2]> = declaration
                .named_children(&mut cursor)
                .filter(|c| c.kind() != "comment")
                .collect();
            if let [name, value] = parts.as_slice() {
                let property = self.property(self.text(*name));
                let value = self.text(*value);
                edits.replace(node.byte_range(), format!("exports{property} = {value};"));
            }
            return AfterExport::Done;
        }

        edits.erase(node.start_byte()..declaration.start_byte());

        let is_default = has_token(node, "default");
        let mut assignments = String::new();
        for name in declared_names(declaration, self.source) {
            let exported = if is_default { "default" } else { name.as_str() };
            let _ = write!(assignments, " exports{} = {name};", self.property(exported));
        }
        if !assignments.is_empty() {
            edits.insert(declaration.end_byte(), assignments);
        }
        AfterExport::Visit(declaration)
    }

    fn export_specifiers(&self, clause: Node<'_>) -> SmallVec<[(String, String); 4]> {
        let mut cursor = clause.walk();
        clause
            .named_children(&mut cursor)
            .filter(|spec| spec.kind() == "export_specifier" && !has_token(*spec, "type"))
            .filter_map(|spec| {
                let local = string_value(self.text(spec.child_by_field_name("name")?));
                let exported = spec
                    .child_by_field_name("alias")
                    .map_or_else(|| local.clone(), |alias| string_value(self.text(alias)));
                Some((local, exported))
            })
            .collect()
    }

    fn lower_export_clause(&self, node: Node<'_>, clause: Node<'_>, edits: &mut EditList) {
        let mut out = String::new();
        for (local, exported) in self.export_specifiers(clause) {
            if self.info.is_type_only(&local) {
                continue;
            }
            if !out.is_empty() {
                out.push(' ');
            }
            let _ = write!(out, "exports{} = {local};", self.property(&exported));
        }
        edits.replace(node.byte_range(), out);
    }

    fn lower_reexport(
        &mut self,
        node: Node<'_>,
        clause: Node<'_>,
        specifier: Node<'_>,
        edits: &mut EditList,
    ) {
        let specifiers = self.export_specifiers(clause);
        let require = self.require(specifier);
        let out = match specifiers.as_slice() {
            [] => format!("{require};"),
            [(local, exported)] => format!(
                "exports{} = {require}{};",
                self.property(exported),
                self.property(local)
            ),
            _ => {
                let temp = self.temp_name(specifier);
                let mut out = format!("var {temp} = {require};");
                for (local, exported) in &specifiers {
                    let _ = write!(
                        out,
                        " exports{} = {temp}{};",
                        self.property(exported),
                        self.property(local)
                    );
                }
                out
            }
        };
        edits.replace(node.byte_range(), out);
    }
}

/// The contents of a string literal, re-quoted safely for `"..."`.
fn string_value(literal: &str) -> String {
    let quoted = literal.len() >= 2
        && (literal.starts_with('"') || literal.starts_with('\''))
        && literal.ends_with(&literal[..1]);
    if !quoted {
        return literal.to_owned();
    }
    let inner = &literal[1..literal.len() - 1];
    if literal.starts_with('\'') {
        inner.replace("\\'", "'").replace('"', "\\\"")
    } else {
        inner.to_owned()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Words ES3 does not allow after a `.`.
const RESERVED_WORDS: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete", "do",
    "else", "enum", "export", "extends", "false", "finally", "for", "function", "if", "import",
    "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw", "true",
    "try", "typeof", "var", "void", "while", "with",
];
