//! Text edits and line-tracked output assembly.
//!
//! The emitter never rewrites the syntax tree. It records byte-range
//! [`Edit`]s against the original source; [`OutputBuilder`] then copies the
//! untouched stretches and splices in replacements, remembering for every
//! generated line which source offset it came from. Those origins feed the
//! source map.

use std::ops::Range;

/// A replacement of `range` in the source with `text`.
///
/// An empty `text` erases the range; an empty `range` inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edit {
    pub(crate) range: Range<usize>,
    pub(crate) text: String,
}

/// An unordered collection of edits against one source.
#[derive(Debug, Default)]
pub(crate) struct EditList {
    edits: Vec<Edit>,
}

impl EditList {
    pub(crate) fn erase(&mut self, range: Range<usize>) {
        self.replace(range, String::new());
    }

    pub(crate) fn replace(&mut self, range: Range<usize>, text: impl Into<String>) {
        self.edits.push(Edit {
            range,
            text: text.into(),
        });
    }

    pub(crate) fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.replace(at..at, text);
    }

    pub(crate) fn len(&self) -> usize {
        self.edits.len()
    }

    /// Sorts edits by position.
    ///
    /// Edits starting inside an earlier edit are dropped. Inserts at the
    /// same offset keep their recording order.
    pub(crate) fn into_sorted(mut self) -> Vec<Edit> {
        self.edits.sort_by_key(|edit| (edit.range.start, edit.range.end));
        let mut cursor = 0;
        self.edits.retain(|edit| {
            if edit.range.start < cursor {
                tracing::trace!(?edit.range, "Dropping overlapping edit");
                return false;
            }
            cursor = edit.range.end;
            true
        });
        self.edits
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct LineInfo {
    origin: Option<usize>,
    edited: bool,
}

/// One line of finished output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutputLine {
    pub(crate) text: String,
    /// Source byte offset this line was generated from, if any.
    pub(crate) origin: Option<usize>,
}

/// Accumulates generated code with per-line source origins.
#[derive(Debug)]
pub(crate) struct OutputBuilder {
    code: String,
    lines: Vec<LineInfo>,
}

impl Default for OutputBuilder {
    fn default() -> Self {
        Self {
            code: String::new(),
            lines: vec![LineInfo::default()],
        }
    }
}

impl OutputBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Copies `text`, which starts at byte `offset` of the source.
    pub(crate) fn push_source(&mut self, text: &str, offset: usize) {
        let mut at = offset;
        for piece in text.split_inclusive('\n') {
            self.push_piece(piece, Some(at));
            at += piece.len();
        }
    }

    /// Appends generated text attributed to `origin`.
    pub(crate) fn push_synthetic(&mut self, text: &str, origin: Option<usize>) {
        for piece in text.split_inclusive('\n') {
            self.push_piece(piece, origin);
        }
    }

    /// Starts a new line unless the output is empty or already at one.
    pub(crate) fn ensure_line_break(&mut self) {
        if !self.code.is_empty() && !self.code.ends_with('\n') {
            self.push_piece("\n", None);
        }
    }

    fn push_piece(&mut self, piece: &str, origin: Option<usize>) {
        if let Some(line) = self.lines.last_mut() {
            if line.origin.is_none() && !piece.trim().is_empty() {
                line.origin = origin;
            }
        }
        self.code.push_str(piece);
        if piece.ends_with('\n') {
            self.lines.push(LineInfo::default());
        }
    }

    fn mark_edited(&mut self) {
        if let Some(line) = self.lines.last_mut() {
            line.edited = true;
        }
    }

    /// Copies `source` with `edits` applied.
    pub(crate) fn apply(&mut self, source: &str, edits: &[Edit]) {
        let mut cursor = 0;
        for edit in edits {
            let Some(kept) = source.get(cursor..edit.range.start) else {
                continue;
            };
            self.push_source(kept, cursor);
            self.push_synthetic(&edit.text, Some(edit.range.start));
            self.mark_edited();
            cursor = edit.range.end;
        }
        self.push_source(source.get(cursor..).unwrap_or_default(), cursor);
    }

    /// Splits the output into lines.
    ///
    /// Lines left blank by an edit are dropped and edited lines lose their
    /// trailing whitespace. Runs of blank lines collapse to one, and blank
    /// lines at either end are dropped. With `minimize` every line is
    /// trimmed and no blank lines survive.
    pub(crate) fn finish(self, minimize: bool) -> Vec<OutputLine> {
        let mut texts: Vec<&str> = self.code.split('\n').collect();
        // `split` yields one trailing empty piece after a final newline.
        if self.code.ends_with('\n') {
            texts.pop();
        }

        let mut lines: Vec<OutputLine> = Vec::with_capacity(texts.len());
        let mut after_blank = true;
        for (text, info) in texts.into_iter().zip(self.lines) {
            let text = if minimize {
                text.trim()
            } else if info.edited {
                text.trim_end()
            } else {
                text
            };
            let blank = text.trim().is_empty();
            if blank && (minimize || info.edited || after_blank) {
                continue;
            }
            after_blank = blank;
            lines.push(OutputLine {
                text: if blank { String::new() } else { text.to_owned() },
                origin: info.origin,
            });
        }
        while lines.last().is_some_and(|line| line.text.is_empty()) {
            lines.pop();
        }
        lines
    }
}

/// Renders finished lines as newline-terminated text.
pub(crate) fn render_lines(lines: &[OutputLine]) -> String {
    let mut code = String::with_capacity(lines.iter().map(|l| l.text.len() + 1).sum());
    for line in lines {
        code.push_str(&line.text);
        code.push('\n');
    }
    code
}

/// Maps byte offsets to zero-based line numbers.
#[derive(Debug)]
pub(crate) struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(source: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    pub(crate) fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        }
    }

    /// Leading whitespace of the line containing `offset`.
    pub(crate) fn indent_at<'s>(&self, source: &'s str, offset: usize) -> &'s str {
        let start = self.starts[self.line_of(offset)];
        let line = source.get(start..).unwrap_or_default();
        let width = line.len() - line.trim_start_matches([' ', '\t']).len();
        &line[..width]
    }
}
