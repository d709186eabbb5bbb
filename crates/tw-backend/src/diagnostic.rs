//! Diagnostics and emit results.
//!
//! A [`Diagnostic`] points at a byte range in one source unit. [`EmitResult`]
//! carries either emitted code (and optionally a source map) or the
//! diagnostics explaining why nothing was emitted.

use std::fmt;

use camino::Utf8PathBuf;
use serde::Serialize;

/// A problem found in a source unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Human-readable message.
    pub message: String,
    /// Logical path of the source unit.
    pub source_unit: Utf8PathBuf,
    /// Byte offset of the offending span.
    pub offset: usize,
    /// Byte length of the offending span.
    pub length: usize,
}

impl Diagnostic {
    /// Creates a diagnostic for `offset..offset + length` in `source_unit`.
    pub fn new(
        message: impl Into<String>,
        source_unit: impl Into<Utf8PathBuf>,
        offset: usize,
        length: usize,
    ) -> Self {
        Self {
            message: message.into(),
            source_unit: source_unit.into(),
            offset,
            length,
        }
    }

    /// One-based line number of the diagnostic in `source`.
    #[must_use]
    pub fn line_number(&self, source: &str) -> usize {
        let offset = self.offset.min(source.len());
        source.as_bytes()[..offset].iter().filter(|b| **b == b'\n').count() + 1
    }

    /// Renders the diagnostic with an excerpt of the offending line.
    ///
    /// The excerpt shows the line containing the span with surrounding
    /// indentation removed, and underlines the span with `^`:
    ///
    /// ```text
    /// TypeScript Error: ';' expected.
    /// File: app/main.ts
    /// Start: 27, Length: 1
    ///
    /// Line: let x = 1 let y = 2;
    /// ----------------^---------
    /// ```
    #[must_use]
    pub fn render(&self, source: &str) -> String {
        let start = floor_char_boundary(source, self.offset.min(source.len()));
        let line_start = source[..start].rfind('\n').map_or(0, |i| i + 1);
        let line_end = source[start..].find('\n').map_or(source.len(), |i| start + i);
        let end = floor_char_boundary(source, (start + self.length).min(line_end));

        let before = source[line_start..start].trim_start();
        let span = &source[start..end];
        let after = source[end..line_end].trim_end();

        let underline: String = std::iter::repeat_n('-', before.chars().count())
            .chain(std::iter::repeat_n('^', span.chars().count().max(1)))
            .chain(std::iter::repeat_n('-', after.chars().count()))
            .collect();

        format!(
            "TypeScript Error: {message}\nFile: {unit}\nStart: {offset}, Length: {length}\n\nLine: {before}{span}{after}\n------{underline}",
            message = self.message,
            unit = self.source_unit,
            offset = self.offset,
            length = self.length,
        )
    }
}

fn floor_char_boundary(source: &str, mut index: usize) -> usize {
    while index > 0 && !source.is_char_boundary(index) {
        index -= 1;
    }
    index
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.source_unit, self.offset, self.message)
    }
}

/// Outcome of compiling one source unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitResult {
    /// Problems found; empty means success.
    pub diagnostics: Vec<Diagnostic>,
    /// Emitted JavaScript. Empty when diagnostics are present.
    pub emitted_code: String,
    /// Emitted source map, when requested and compilation succeeded.
    pub emitted_source_map: Option<String>,
}

impl EmitResult {
    /// A successful result.
    #[must_use]
    pub const fn success(code: String, source_map: Option<String>) -> Self {
        Self {
            diagnostics: Vec::new(),
            emitted_code: code,
            emitted_source_map: source_map,
        }
    }

    /// A failed result carrying `diagnostics`.
    #[must_use]
    pub const fn failure(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            diagnostics,
            emitted_code: String::new(),
            emitted_source_map: None,
        }
    }

    /// Returns `true` if no diagnostics were produced.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_underlines_span() {
        let source = "const a = 1;\n    let x = 1 let y = 2;\n";
        let offset = source.find("let y").unwrap();
        let diag = Diagnostic::new("';' expected.", "app/main.ts", offset, 3);
        let rendered = diag.render(source);

        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines[0], "TypeScript Error: ';' expected.");
        assert_eq!(lines[1], "File: app/main.ts");
        assert_eq!(lines[2], format!("Start: {offset}, Length: 3"));
        assert_eq!(lines[3], "");
        assert_eq!(lines[4], "Line: let x = 1 let y = 2;");
        assert_eq!(lines[5], "----------------^^^-------");
    }

    #[test]
    fn test_render_clamps_multiline_span() {
        let source = "enum E {\n  A = 'x',\n  B\n}\n";
        let diag = Diagnostic::new("Enum member must have initializer.", "e.ts", 0, source.len());
        let rendered = diag.render(source);
        assert!(rendered.contains("Line: enum E {"));
        assert!(rendered.ends_with("------^^^^^^^^"));
    }

    #[test]
    fn test_line_number() {
        let source = "a\nb\nc";
        assert_eq!(Diagnostic::new("m", "x.ts", 0, 1).line_number(source), 1);
        assert_eq!(Diagnostic::new("m", "x.ts", 4, 1).line_number(source), 3);
    }

    #[test]
    fn test_display() {
        let diag = Diagnostic::new("Unexpected token.", "lib/a.ts", 7, 1);
        assert_eq!(diag.to_string(), "lib/a.ts:7: Unexpected token.");
    }

    #[test]
    fn test_emit_result() {
        assert!(EmitResult::success("x;\n".to_owned(), None).is_success());
        let failed = EmitResult::failure(vec![Diagnostic::new("m", "x.ts", 0, 0)]);
        assert!(!failed.is_success());
        assert!(failed.emitted_code.is_empty());
    }
}
