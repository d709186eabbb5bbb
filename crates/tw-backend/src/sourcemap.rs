//! Revision 3 source maps with line-level mappings.
//!
//! Every generated line that originates in the source gets one segment
//! pointing at column 0 of the originating source line. That is enough for
//! debuggers to step through emitted code line by line.

use camino::Utf8Path;
use serde::Serialize;

use crate::error::BackendError;
use crate::output::{LineIndex, OutputLine};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMap<'a> {
    version: u8,
    file: &'a str,
    source_root: &'a str,
    sources: [&'a str; 1],
    names: [&'a str; 0],
    mappings: String,
}

/// Appends the base64 VLQ encoding of `value` to `out`.
fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq = if value < 0 {
        (value.unsigned_abs() << 1) | 1
    } else {
        value.unsigned_abs() << 1
    };

    loop {
        let mut digit = (vlq & 0b1_1111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b10_0000;
        }
        out.push(char::from(BASE64[digit]));
        if vlq == 0 {
            break;
        }
    }
}

/// Encodes the `mappings` field for `lines`.
fn encode_mappings(lines: &[OutputLine], index: &LineIndex) -> String {
    let mut mappings = String::new();
    let mut previous_line: i64 = 0;

    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            mappings.push(';');
        }
        let Some(origin) = line.origin else {
            continue;
        };
        let source_line = i64::try_from(index.line_of(origin)).unwrap_or(i64::MAX);
        // generated column, source index, source line delta, source column
        encode_vlq(0, &mut mappings);
        encode_vlq(0, &mut mappings);
        encode_vlq(source_line - previous_line, &mut mappings);
        encode_vlq(0, &mut mappings);
        previous_line = source_line;
    }

    mappings
}

/// Builds the source map JSON for `lines` generated from `source`.
///
/// `file` is the bare name of the emitted code file and `logical_path` the
/// source unit as it appears in `sources`.
pub(crate) fn build_source_map(
    lines: &[OutputLine],
    source: &str,
    file: &str,
    logical_path: &Utf8Path,
) -> Result<String, BackendError> {
    let index = LineIndex::new(source);
    let map = SourceMap {
        version: 3,
        file,
        source_root: "",
        sources: [logical_path.as_str()],
        names: [],
        mappings: encode_mappings(lines, &index),
    };
    Ok(serde_json::to_string(&map)?)
}

/// The trailing comment linking emitted code to its map.
pub(crate) fn mapping_url_comment(map_file: &str) -> String {
    format!("//# sourceMappingURL={map_file}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(value: i64) -> String {
        let mut out = String::new();
        encode_vlq(value, &mut out);
        out
    }

    #[test]
    fn test_encode_vlq() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(15), "e");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(-17), "jB");
    }

    #[test]
    fn test_mappings_skip_synthetic_lines() {
        let source = "a();\n\nb();\n";
        let lines = vec![
            OutputLine {
                text: "prologue;".to_owned(),
                origin: None,
            },
            OutputLine {
                text: "a();".to_owned(),
                origin: Some(0),
            },
            OutputLine {
                text: "b();".to_owned(),
                origin: Some(6),
            },
        ];
        let mappings = encode_mappings(&lines, &LineIndex::new(source));
        assert_eq!(mappings, ";AAAA;AAEA");
    }

    #[test]
    fn test_build_source_map() {
        let lines = vec![OutputLine {
            text: "var x = 1;".to_owned(),
            origin: Some(0),
        }];
        let json = build_source_map(&lines, "var x: number = 1;\n", "main.js", Utf8Path::new("app/main.ts"))
            .expect("Source map should serialize");
        insta::assert_snapshot!(json, @r#"{"version":3,"file":"main.js","sourceRoot":"","sources":["app/main.ts"],"names":[],"mappings":"AAAA"}"#);
    }

    #[test]
    fn test_mapping_url_comment() {
        assert_eq!(mapping_url_comment("main.js.map"), "//# sourceMappingURL=main.js.map");
    }
}
