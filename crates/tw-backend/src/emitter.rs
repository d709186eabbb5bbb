//! Type-erasing tree walk.
//!
//! [`Emitter`] visits the syntax tree once and records edits that remove
//! TypeScript-only syntax, lower enums and parameter properties, and hand
//! `import`/`export` statements to [`ModuleLowering`]. Constructs it cannot
//! express in JavaScript become diagnostics.

use camino::Utf8Path;
use smallvec::SmallVec;
use tree_sitter::Node;
use tw_core::CompilerOptions;

use crate::diagnostic::Diagnostic;
use crate::enums::lower_enum;
use crate::modules::{AfterExport, ModuleInfo, ModuleLowering, has_token};
use crate::output::{EditList, LineIndex};

/// Nodes erased together with everything below them.
const ERASED_NODES: &[&str] = &[
    "interface_declaration",
    "type_alias_declaration",
    "ambient_declaration",
    "function_signature",
    "type_annotation",
    "type_arguments",
    "type_parameters",
    "asserts_annotation",
    "type_predicate_annotation",
];

/// Class members erased with their terminating `;` or `,`.
const ERASED_MEMBERS: &[&str] = &["method_signature", "abstract_method_signature", "index_signature"];

pub(crate) const ACCESSOR_DIAGNOSTIC: &str =
    "Accessors are only available when targeting ECMAScript 5 and higher.";
pub(crate) const NAMESPACE_DIAGNOSTIC: &str = "Namespaces are not supported.";
pub(crate) const DECORATOR_DIAGNOSTIC: &str = "Decorators are not supported.";

/// Everything the walk produced.
#[derive(Debug)]
pub(crate) struct Emitted {
    pub(crate) edits: EditList,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) dependencies: SmallVec<[String; 4]>,
}

/// Records the edits turning one TypeScript file into JavaScript.
pub(crate) struct Emitter<'a> {
    source: &'a str,
    unit: &'a Utf8Path,
    options: &'a CompilerOptions,
    lines: LineIndex,
    modules: ModuleLowering<'a>,
    edits: EditList,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(
        source: &'a str,
        unit: &'a Utf8Path,
        options: &'a CompilerOptions,
        info: &'a ModuleInfo,
    ) -> Self {
        Self {
            source,
            unit,
            options,
            lines: LineIndex::new(source),
            modules: ModuleLowering::new(source, info, options.module_kind(), options.target()),
            edits: EditList::default(),
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> Emitted {
        Emitted {
            edits: self.edits,
            diagnostics: self.diagnostics,
            dependencies: self.modules.into_dependencies(),
        }
    }

    fn text(&self, node: Node<'_>) -> &'a str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }

    fn report(&mut self, message: &str, node: Node<'_>) {
        self.diagnostics.push(Diagnostic::new(
            message,
            self.unit,
            node.start_byte(),
            node.end_byte() - node.start_byte(),
        ));
    }

    /// Visits `node` and its descendants.
    pub(crate) fn visit(&mut self, node: Node<'_>) {
        let kind = node.kind();

        if ERASED_NODES.contains(&kind) {
            self.edits.erase(node.byte_range());
            return;
        }
        if ERASED_MEMBERS.contains(&kind) {
            self.erase_member(node);
            return;
        }

        match kind {
            "comment" => {
                if !self.options.comments() && !self.text(node).starts_with("/*!") {
                    self.edits.erase(node.byte_range());
                }
            }
            "import_statement" => self.modules.lower_import(node, &mut self.edits),
            "export_statement" => {
                if let AfterExport::Visit(child) = self.modules.lower_export(node, &mut self.edits) {
                    self.visit(child);
                }
            }
            "import_alias" => {
                if let Some(keyword) = node.child(0) {
                    self.edits.replace(keyword.byte_range(), "var");
                }
            }
            "enum_declaration" => self.lower_enum(node),
            "internal_module" | "module" if node.is_named() => {
                let end = node
                    .child_by_field_name("name")
                    .map_or(node.end_byte(), |name| name.end_byte());
                self.diagnostics.push(Diagnostic::new(
                    NAMESPACE_DIAGNOSTIC,
                    self.unit,
                    node.start_byte(),
                    end - node.start_byte(),
                ));
            }
            "decorator" => self.report(DECORATOR_DIAGNOSTIC, node),
            "implements_clause" => self.erase_with_leading_space(node),
            "accessibility_modifier" | "override_modifier" => self.erase_with_trailing_space(node),
            "abstract_class_declaration" => {
                self.erase_tokens(node, &["abstract"]);
                self.visit_children(node);
            }
            "public_field_definition" => self.visit_field(node),
            "method_definition" => self.visit_method(node),
            "required_parameter" | "optional_parameter" => self.visit_parameter(node),
            "variable_declarator" => {
                self.erase_tokens(node, &["!"]);
                self.visit_children(node);
            }
            "as_expression" | "satisfies_expression" => {
                if let Some(expr) = node.named_child(0) {
                    self.edits.erase(expr.end_byte()..node.end_byte());
                    self.visit(expr);
                }
            }
            "non_null_expression" => {
                self.edits.erase(node.end_byte() - 1..node.end_byte());
                self.visit_children(node);
            }
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        let children: SmallVec<[Node<'_>; 16]> = node.children(&mut cursor).collect();
        for child in children {
            self.visit(child);
        }
    }

    /// Erases anonymous children of `node` matching `tokens`, with the
    /// whitespace that follows them.
    fn erase_tokens(&mut self, node: Node<'_>, tokens: &[&str]) {
        let mut cursor = node.walk();
        let matching: SmallVec<[Node<'_>; 4]> = node
            .children(&mut cursor)
            .filter(|c| !c.is_named() && tokens.contains(&c.kind()))
            .collect();
        for token in matching {
            self.erase_with_trailing_space(token);
        }
    }

    fn erase_with_trailing_space(&mut self, node: Node<'_>) {
        let rest = self.source.get(node.end_byte()..).unwrap_or_default();
        let spaces = rest.len() - rest.trim_start_matches([' ', '\t']).len();
        self.edits.erase(node.start_byte()..node.end_byte() + spaces);
    }

    fn erase_with_leading_space(&mut self, node: Node<'_>) {
        let before = self.source.get(..node.start_byte()).unwrap_or_default();
        let start = before.trim_end_matches([' ', '\t']).len();
        self.edits.erase(start..node.end_byte());
    }

    /// Erases a member or parameter with its `;` or `,` terminator.
    fn erase_member(&mut self, node: Node<'_>) {
        let rest = self.source.get(node.end_byte()..).unwrap_or_default();
        let after_spaces = rest.trim_start_matches([' ', '\t']);
        let end = match after_spaces.strip_prefix([';', ',']) {
            Some(tail) => node.end_byte() + rest.len() - tail.trim_start_matches([' ', '\t']).len(),
            None => node.end_byte(),
        };
        self.edits.erase(node.start_byte()..end);
    }

    fn lower_enum(&mut self, node: Node<'_>) {
        let indent = self.lines.indent_at(self.source, node.start_byte());
        match lower_enum(node, self.source, indent, self.unit) {
            Ok(code) => self.edits.replace(node.byte_range(), code),
            Err(diagnostic) => self.diagnostics.push(diagnostic),
        }
    }

    fn visit_field(&mut self, node: Node<'_>) {
        let ambient = has_token(node, "declare") || has_token(node, "abstract");
        let private = node
            .child_by_field_name("name")
            .is_some_and(|n| n.kind() == "private_property_identifier");
        let initialized = node.child_by_field_name("value").is_some();

        if ambient || !(initialized || private) {
            self.erase_member(node);
            return;
        }

        self.erase_tokens(node, &["readonly", "declare"]);
        self.erase_optional_marker(node);
        self.visit_children(node);
    }

    /// Erases `?` and definite-assignment `!` markers directly under `node`.
    fn erase_optional_marker(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        let markers: SmallVec<[Node<'_>; 2]> = node
            .children(&mut cursor)
            .filter(|c| !c.is_named() && matches!(c.kind(), "?" | "!"))
            .collect();
        for marker in markers {
            self.edits.erase(marker.byte_range());
        }
    }

    fn visit_method(&mut self, node: Node<'_>) {
        let is_accessor = has_token(node, "get") || has_token(node, "set");
        if is_accessor && !self.options.target().supports_accessors() {
            let name = node.child_by_field_name("name").unwrap_or(node);
            self.report(ACCESSOR_DIAGNOSTIC, name);
        }

        self.erase_optional_marker(node);

        let is_constructor = node
            .child_by_field_name("name")
            .is_some_and(|n| self.text(n) == "constructor");
        if is_constructor {
            self.lower_parameter_properties(node);
        }
        self.visit_children(node);
    }

    /// Inserts `this.x = x;` for every constructor parameter declared with
    /// an accessibility or `readonly` modifier.
    fn lower_parameter_properties(&mut self, constructor: Node<'_>) {
        let Some(parameters) = constructor.child_by_field_name("parameters") else {
            return;
        };
        let mut cursor = parameters.walk();
        let names: SmallVec<[&str; 4]> = parameters
            .named_children(&mut cursor)
            .filter(|p| is_parameter_property(*p))
            .filter_map(|p| p.child_by_field_name("pattern"))
            .filter(|pattern| pattern.kind() == "identifier")
            .map(|pattern| self.text(pattern))
            .collect();
        if names.is_empty() {
            return;
        }
        let Some(body) = constructor.child_by_field_name("body") else {
            return;
        };

        let mut cursor = body.walk();
        let first = body.named_children(&mut cursor).find(|s| s.kind() != "comment");
        let at = match first {
            Some(statement) if is_super_call(statement) => statement.end_byte(),
            _ => body.start_byte() + 1,
        };

        let assignments: String = names.iter().map(|name| format!(" this.{name} = {name};")).collect();
        self.edits.insert(at, assignments);
    }

    fn visit_parameter(&mut self, node: Node<'_>) {
        let is_this = node
            .child_by_field_name("pattern")
            .is_some_and(|p| p.kind() == "this");
        if is_this {
            self.erase_member(node);
            return;
        }
        self.erase_tokens(node, &["readonly"]);
        self.erase_optional_marker(node);
        self.visit_children(node);
    }
}

fn is_parameter_property(parameter: Node<'_>) -> bool {
    let mut cursor = parameter.walk();
    parameter.children(&mut cursor).any(|child| {
        matches!(child.kind(), "accessibility_modifier" | "override_modifier")
            || (!child.is_named() && child.kind() == "readonly")
    })
}

fn is_super_call(statement: Node<'_>) -> bool {
    statement.kind() == "expression_statement"
        && statement
            .named_child(0)
            .filter(|expr| expr.kind() == "call_expression")
            .and_then(|call| call.child_by_field_name("function"))
            .is_some_and(|function| function.kind() == "super")
}
