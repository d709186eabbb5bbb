//! The backend interface and the shipped tree-sitter backend.

use std::fmt::Write as _;
use std::sync::Arc;

use camino::Utf8Path;
use tw_core::paths::{OUTPUT_EXTENSION, SOURCE_MAP_SUFFIX};
use tw_core::{CompilerOptions, ModuleKind, OptionName};

use crate::diagnostic::EmitResult;
use crate::emitter::{Emitted, Emitter};
use crate::error::BackendError;
use crate::modules::{ModuleInfo, es_module_marker};
use crate::output::{OutputBuilder, OutputLine, render_lines};
use crate::parser::{parse, syntax_diagnostics};
use crate::sourcemap::{build_source_map, mapping_url_comment};

const AMD_INDENT: &str = "    ";

/// Compiles one source unit to JavaScript.
///
/// Implementations must be usable from many tasks at once; each call is
/// independent and shares no mutable state with other calls.
///
/// Problems in the source are reported through
/// [`EmitResult::diagnostics`]. An `Err` means the backend itself failed.
pub trait CompilationBackend: Send + Sync {
    /// Compiles `source`, labelled `logical_path` in diagnostics and
    /// source maps, under `options`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] if the backend could not run at all.
    fn compile(
        &self,
        source: &str,
        logical_path: &Utf8Path,
        options: &CompilerOptions,
    ) -> Result<EmitResult, BackendError>;
}

impl<T: CompilationBackend + ?Sized> CompilationBackend for Box<T> {
    fn compile(
        &self,
        source: &str,
        logical_path: &Utf8Path,
        options: &CompilerOptions,
    ) -> Result<EmitResult, BackendError> {
        (**self).compile(source, logical_path, options)
    }
}

impl<T: CompilationBackend + ?Sized> CompilationBackend for Arc<T> {
    fn compile(
        &self,
        source: &str,
        logical_path: &Utf8Path,
        options: &CompilerOptions,
    ) -> Result<EmitResult, BackendError> {
        (**self).compile(source, logical_path, options)
    }
}

/// Type-erasing TypeScript backend built on tree-sitter.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use tw_backend::{CompilationBackend, TreeSitterBackend};
/// use tw_core::CompilerOptions;
///
/// let backend = TreeSitterBackend::new();
/// let result = backend.compile(
///     "let total: number = 1;\n",
///     Utf8Path::new("total.ts"),
///     &CompilerOptions::default(),
/// )?;
/// assert_eq!(result.emitted_code, "let total = 1;\n");
/// # Ok::<(), tw_backend::BackendError>(())
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeSitterBackend;

impl TreeSitterBackend {
    /// Creates the backend.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl CompilationBackend for TreeSitterBackend {
    fn compile(
        &self,
        source: &str,
        logical_path: &Utf8Path,
        options: &CompilerOptions,
    ) -> Result<EmitResult, BackendError> {
        let tree = parse(source, logical_path)?;

        let syntax = syntax_diagnostics(&tree, source, logical_path);
        if !syntax.is_empty() {
            return Ok(EmitResult::failure(syntax));
        }

        let info = ModuleInfo::analyze(&tree, source)?;
        let mut emitter = Emitter::new(source, logical_path, options, &info);
        emitter.visit(tree.root_node());
        let Emitted {
            edits,
            diagnostics,
            dependencies,
        } = emitter.finish();

        if options.debug() {
            tracing::debug!(
                path = %logical_path,
                edits = edits.len(),
                diagnostics = diagnostics.len(),
                module = info.is_module(),
                ?dependencies,
                "Emitter finished"
            );
        } else {
            tracing::trace!(path = %logical_path, edits = edits.len(), "Emitter finished");
        }
        log_unsupported_options(options, logical_path);

        if !diagnostics.is_empty() {
            return Ok(EmitResult::failure(diagnostics));
        }

        let minimize = options.minimize_whitespace();
        let mut body = OutputBuilder::new();
        if info.has_es_exports() {
            body.push_synthetic(es_module_marker(options.target()), None);
            body.ensure_line_break();
        }
        body.apply(source, &edits.into_sorted());
        let mut lines = body.finish(minimize);

        if info.is_module() && options.module_kind() == ModuleKind::Amd {
            lines = wrap_amd(lines, &dependencies, minimize);
        }

        let code_file = format!(
            "{}.{OUTPUT_EXTENSION}",
            logical_path.file_stem().unwrap_or_default()
        );
        let source_map = if options.sourcemap() {
            let map = build_source_map(&lines, source, &code_file, logical_path)?;
            lines.push(OutputLine {
                text: mapping_url_comment(&format!("{code_file}{SOURCE_MAP_SUFFIX}")),
                origin: None,
            });
            Some(map)
        } else {
            None
        };

        Ok(EmitResult::success(render_lines(&lines), source_map))
    }
}

/// Options this backend accepts but does not act on.
fn log_unsupported_options(options: &CompilerOptions, logical_path: &Utf8Path) {
    let requested = [
        (OptionName::Declaration, options.declaration()),
        (OptionName::Concat, options.concat()),
        (OptionName::Style, !options.style().is_empty()),
    ];
    for (name, set) in requested {
        if set {
            tracing::trace!(path = %logical_path, option = %name, "Option has no effect on this backend");
        }
    }
}

/// Wraps module output in an AMD `define` call.
fn wrap_amd(body: Vec<OutputLine>, dependencies: &[String], minimize: bool) -> Vec<OutputLine> {
    let mut header = String::from("define([\"require\", \"exports\"");
    for dependency in dependencies {
        let _ = write!(header, ", \"{dependency}\"");
    }
    header.push_str("], function (require, exports) {");

    let indent = if minimize { "" } else { AMD_INDENT };
    let mut lines = Vec::with_capacity(body.len() + 2);
    lines.push(OutputLine {
        text: header,
        origin: None,
    });
    lines.extend(body.into_iter().map(|line| OutputLine {
        text: if line.text.is_empty() {
            line.text
        } else {
            format!("{indent}{}", line.text)
        },
        origin: line.origin,
    }));
    lines.push(OutputLine {
        text: "});".to_owned(),
        origin: None,
    });
    lines
}

#[cfg(test)]
mod tests {
    use tw_core::{OptionValue, ScriptTarget};

    use super::*;
    use crate::emitter::{ACCESSOR_DIAGNOSTIC, DECORATOR_DIAGNOSTIC, NAMESPACE_DIAGNOSTIC};

    fn compile_with(source: &str, options: &CompilerOptions) -> EmitResult {
        TreeSitterBackend::new()
            .compile(source, Utf8Path::new("app/main.ts"), options)
            .unwrap()
    }

    fn compile(source: &str) -> String {
        let result = compile_with(source, &CompilerOptions::default());
        assert!(result.is_success(), "unexpected diagnostics: {:?}", result.diagnostics);
        result.emitted_code
    }

    fn es5() -> CompilerOptions {
        CompilerOptions::default().with(OptionName::Target, OptionValue::Target(ScriptTarget::Es5))
    }

    #[test]
    fn test_erases_types() {
        let source = r#"interface Point {
    x: number;
    y: number;
}

type Id = string;

function add(a: number, b: number): number {
    return a + b;
}

const p = { x: 1 } as Point;
let id!: Id;
"#;
        insta::assert_snapshot!(compile(source), @r"
        function add(a, b) {
            return a + b;
        }

        const p = { x: 1 };
        let id;
        ");
    }

    #[test]
    fn test_class_members() {
        let source = r#"class Circle extends Shape implements HasArea {
    private radius: number;
    static readonly unit: string = "cm";
    constructor(public r: number, readonly label?: string) {
        super();
    }
    area(): number {
        return Math.PI * this.r ** 2;
    }
    describe?(): string;
}
"#;
        insta::assert_snapshot!(compile(source), @r#"
        class Circle extends Shape {
            static unit = "cm";
            constructor(r, label) {
                super(); this.r = r; this.label = label;
            }
            area() {
                return Math.PI * this.r ** 2;
            }
        }
        "#);
    }

    #[test]
    fn test_generics_and_non_null() {
        let source = "function first<T>(items: T[]): T {\n    return items[0]!;\n}\nconst n = first<number>([1]);\n";
        assert_eq!(
            compile(source),
            "function first(items) {\n    return items[0];\n}\nconst n = first([1]);\n"
        );
    }

    #[test]
    fn test_nested_enum_keeps_indentation() {
        let source = "function f() {\n    enum E { A }\n    return E.A;\n}\n";
        insta::assert_snapshot!(compile(source), @r#"
        function f() {
            var E;
            (function (E) {
                E[E["A"] = 0] = "A";
            })(E || (E = {}));
            return E.A;
        }
        "#);
    }

    #[test]
    fn test_commonjs_module() {
        let source = r#"import { readFile } from "fs";
import type { Stats } from "fs";
export function load(path: string): Promise<Stats> {
    return readFile(path);
}
"#;
        insta::assert_snapshot!(compile(source), @r#"
        exports.__esModule = true;
        var readFile = require("fs").readFile;
        function load(path) {
            return readFile(path);
        } exports.load = load;
        "#);
    }

    #[test]
    fn test_amd_module() {
        let source = "import { helper } from \"./helper\";\nexport const value = helper(1);\n";
        let options = es5().with(OptionName::ModuleType, OptionValue::Module(ModuleKind::Amd));
        let result = compile_with(source, &options);
        insta::assert_snapshot!(result.emitted_code, @r#"
        define(["require", "exports", "./helper"], function (require, exports) {
            Object.defineProperty(exports, "__esModule", { value: true });
            var helper = require("./helper").helper;
            const value = helper(1); exports.value = value;
        });
        "#);
    }

    #[test]
    fn test_script_is_not_wrapped_for_amd() {
        let options =
            CompilerOptions::default().with(OptionName::ModuleType, OptionValue::Module(ModuleKind::Amd));
        let result = compile_with("var a = 1;\n", &options);
        assert_eq!(result.emitted_code, "var a = 1;\n");
    }

    #[test]
    fn test_source_map() {
        let options = CompilerOptions::default().with(OptionName::Sourcemap, OptionValue::Bool(true));
        let result = compile_with("let x: number = 1;\nlet y = x;\n", &options);
        assert_eq!(
            result.emitted_code,
            "let x = 1;\nlet y = x;\n//# sourceMappingURL=main.js.map\n"
        );
        let map: serde_json::Value =
            serde_json::from_str(result.emitted_source_map.as_deref().unwrap()).unwrap();
        assert_eq!(map["file"], "main.js");
        assert_eq!(map["sources"][0], "app/main.ts");
        assert_eq!(map["mappings"], "AAAA;AACA");
    }

    #[test]
    fn test_no_source_map_by_default() {
        assert!(compile_with("let a = 1;\n", &CompilerOptions::default())
            .emitted_source_map
            .is_none());
    }

    #[test]
    fn test_strip_comments() {
        let options = CompilerOptions::default().with(OptionName::Comments, OptionValue::Bool(false));
        let source = "// lead\nlet a = 1; // trailing\n/*! keep */\nlet b = 2;\n";
        let result = compile_with(source, &options);
        assert_eq!(result.emitted_code, "let a = 1;\n/*! keep */\nlet b = 2;\n");
    }

    #[test]
    fn test_comments_kept_by_default() {
        let source = "// note\nlet a = 1;\n";
        assert_eq!(compile(source), source);
    }

    #[test]
    fn test_minimize_whitespace() {
        let options =
            CompilerOptions::default().with(OptionName::MinimizeWhitespace, OptionValue::Bool(true));
        let source = "function f() {\n\n    return 1;\n}\n";
        let result = compile_with(source, &options);
        assert_eq!(result.emitted_code, "function f() {\nreturn 1;\n}\n");
    }

    #[test]
    fn test_accessors_need_es5() {
        let source = "class A {\n    get x() { return 1; }\n}\n";
        let result = compile_with(source, &CompilerOptions::default());
        assert!(!result.is_success());
        assert_eq!(result.diagnostics[0].message, ACCESSOR_DIAGNOSTIC);
        assert_eq!(result.diagnostics[0].offset, source.find("x()").unwrap());
        assert!(result.emitted_code.is_empty());

        assert!(compile_with(source, &es5()).is_success());
    }

    #[test]
    fn test_unsupported_constructs() {
        let result = compile_with("namespace A {\n    export const b = 1;\n}\n", &es5());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].message, NAMESPACE_DIAGNOSTIC);
        assert_eq!(result.diagnostics[0].length, "namespace A".len());

        let result = compile_with("@sealed\nclass A {}\n", &es5());
        assert_eq!(result.diagnostics[0].message, DECORATOR_DIAGNOSTIC);
    }

    #[test]
    fn test_syntax_error() {
        let result = compile_with("let x = ;\n", &CompilerOptions::default());
        assert!(!result.is_success());
        assert!(result.emitted_code.is_empty());
        assert!(result.diagnostics.iter().all(|d| d.source_unit == "app/main.ts"));
    }

    #[test]
    fn test_declare_and_overloads_are_erased() {
        let source = "declare const VERSION: string;\nfunction f(a: string): void;\nfunction f(a: any) {}\n";
        assert_eq!(compile(source), "function f(a) {}\n");
    }

    #[test]
    fn test_backend_behind_arc() {
        let backend: Arc<dyn CompilationBackend> = Arc::new(TreeSitterBackend::new());
        let result = backend
            .compile("let a: string = '';\n", Utf8Path::new("a.ts"), &CompilerOptions::default())
            .unwrap();
        assert_eq!(result.emitted_code, "let a = '';\n");
    }
}
