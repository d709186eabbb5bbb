//! Lowering of `enum` declarations.
//!
//! ```text
//! enum Color { Red, Green = 5, Blue }
//! ```
//!
//! becomes
//!
//! ```text
//! var Color;
//! (function (Color) {
//!     Color[Color["Red"] = 0] = "Red";
//!     Color[Color["Green"] = 5] = "Green";
//!     Color[Color["Blue"] = 6] = "Blue";
//! })(Color || (Color = {}));
//! ```

use std::fmt::Write as _;

use camino::Utf8Path;
use tree_sitter::Node;

use crate::diagnostic::Diagnostic;

const MEMBER_INDENT: &str = "    ";

/// How a member's value is written.
#[derive(Debug)]
enum MemberValue {
    /// Numeric constant; gets a reverse mapping.
    Number(i64),
    /// String literal; no reverse mapping.
    Text(String),
    /// Any other expression, copied with sibling references qualified.
    Computed(String),
}

/// Lowers `node` (an `enum_declaration`) to its IIFE form.
///
/// `indent` is the indentation of the line the declaration starts on; it
/// prefixes every generated line after the first.
pub(crate) fn lower_enum(
    node: Node<'_>,
    source: &str,
    indent: &str,
    unit: &Utf8Path,
) -> Result<String, Diagnostic> {
    let name = node
        .child_by_field_name("name")
        .and_then(|n| source.get(n.byte_range()))
        .unwrap_or_default();
    let Some(body) = node.child_by_field_name("body") else {
        return Err(Diagnostic::new("Enum body expected.", unit, node.start_byte(), 0));
    };

    let mut out = String::new();
    let _ = writeln!(out, "var {name};");
    let _ = writeln!(out, "{indent}(function ({name}) {{");

    let mut seen: Vec<String> = Vec::new();
    let mut next: Option<i64> = Some(0);
    let mut cursor = body.walk();
    for member in body.named_children(&mut cursor) {
        let (key_node, value_node) = match member.kind() {
            "comment" => continue,
            "enum_assignment" => (
                member.child_by_field_name("name"),
                member.child_by_field_name("value"),
            ),
            _ => (Some(member), None),
        };
        let Some(key_node) = key_node else { continue };
        let key = member_key(key_node, source, unit)?;

        let value = match value_node {
            Some(value) => classify(value, source, name, &seen),
            None => match next {
                Some(n) => MemberValue::Number(n),
                None => {
                    return Err(Diagnostic::new(
                        "Enum member must have initializer.",
                        unit,
                        member.start_byte(),
                        member.end_byte() - member.start_byte(),
                    ));
                }
            },
        };

        let _ = write!(out, "{indent}{MEMBER_INDENT}");
        match &value {
            MemberValue::Number(n) => {
                let _ = writeln!(out, "{name}[{name}[\"{key}\"] = {n}] = \"{key}\";");
                next = n.checked_add(1);
            }
            MemberValue::Text(text) => {
                let _ = writeln!(out, "{name}[\"{key}\"] = {text};");
                next = None;
            }
            MemberValue::Computed(expr) => {
                let _ = writeln!(out, "{name}[{name}[\"{key}\"] = {expr}] = \"{key}\";");
                next = None;
            }
        }
        seen.push(key);
    }

    let _ = write!(out, "{indent}}})({name} || ({name} = {{}}));");
    Ok(out)
}

fn member_key(node: Node<'_>, source: &str, unit: &Utf8Path) -> Result<String, Diagnostic> {
    let text = source.get(node.byte_range()).unwrap_or_default();
    match node.kind() {
        "property_identifier" | "identifier" => Ok(text.to_owned()),
        "string" => Ok(unquote(text)),
        _ => Err(Diagnostic::new(
            "An enum member name must be an identifier or a string literal.",
            unit,
            node.start_byte(),
            node.end_byte() - node.start_byte(),
        )),
    }
}

/// Strips the quotes of a string literal, re-escaping `"` for use inside a
/// double-quoted string.
fn unquote(literal: &str) -> String {
    let inner = literal
        .get(1..literal.len().saturating_sub(1))
        .unwrap_or_default();
    if literal.starts_with('\'') {
        inner.replace("\\'", "'").replace('"', "\\\"")
    } else {
        inner.to_owned()
    }
}

fn classify(value: Node<'_>, source: &str, enum_name: &str, seen: &[String]) -> MemberValue {
    let text = source.get(value.byte_range()).unwrap_or_default();
    match value.kind() {
        "number" => parse_integer(text).map_or_else(
            || MemberValue::Computed(text.to_owned()),
            MemberValue::Number,
        ),
        "unary_expression" => {
            let operand = value.child_by_field_name("argument");
            let negated = value
                .child_by_field_name("operator")
                .is_some_and(|op| op.kind() == "-");
            match operand {
                Some(arg) if negated && arg.kind() == "number" => source
                    .get(arg.byte_range())
                    .and_then(parse_integer)
                    .and_then(i64::checked_neg)
                    .map_or_else(|| MemberValue::Computed(text.to_owned()), MemberValue::Number),
                _ => MemberValue::Computed(qualify_members(value, source, enum_name, seen)),
            }
        }
        "string" => MemberValue::Text(text.to_owned()),
        _ => MemberValue::Computed(qualify_members(value, source, enum_name, seen)),
    }
}

fn parse_integer(text: &str) -> Option<i64> {
    let text = text.replace('_', "");
    let (digits, radix) = match text.get(..2) {
        Some("0x" | "0X") => (&text[2..], 16),
        Some("0o" | "0O") => (&text[2..], 8),
        Some("0b" | "0B") => (&text[2..], 2),
        _ => (text.as_str(), 10),
    };
    i64::from_str_radix(digits, radix).ok()
}

/// Copies `value`, rewriting references to earlier members `A` as `E.A`.
fn qualify_members(value: Node<'_>, source: &str, enum_name: &str, seen: &[String]) -> String {
    let mut refs = Vec::new();
    collect_member_refs(value, source, seen, &mut refs);

    let start = value.start_byte();
    let mut out = String::new();
    let mut cursor = start;
    for at in refs {
        out.push_str(source.get(cursor..at).unwrap_or_default());
        let _ = write!(out, "{enum_name}.");
        cursor = at;
    }
    out.push_str(source.get(cursor..value.end_byte()).unwrap_or_default());
    out
}

fn collect_member_refs(node: Node<'_>, source: &str, seen: &[String], out: &mut Vec<usize>) {
    if node.kind() == "identifier" {
        let text = source.get(node.byte_range()).unwrap_or_default();
        if seen.iter().any(|s| s == text) {
            out.push(node.start_byte());
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_member_refs(child, source, seen, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn lower(source: &str) -> Result<String, Diagnostic> {
        let tree = parse(source, Utf8Path::new("e.ts")).expect("Parse should succeed");
        let root = tree.root_node();
        let node = root.named_child(0).expect("enum declaration");
        assert_eq!(node.kind(), "enum_declaration");
        lower_enum(node, source, "", Utf8Path::new("e.ts"))
    }

    #[test]
    fn test_auto_increment() {
        let out = lower("enum Color { Red, Green = 5, Blue }").unwrap();
        insta::assert_snapshot!(out, @r#"
        var Color;
        (function (Color) {
            Color[Color["Red"] = 0] = "Red";
            Color[Color["Green"] = 5] = "Green";
            Color[Color["Blue"] = 6] = "Blue";
        })(Color || (Color = {}));
        "#);
    }

    #[test]
    fn test_string_members_have_no_reverse_mapping() {
        let out = lower("enum Dir { Up = 'UP', 'Down' = \"DOWN\" }").unwrap();
        assert!(out.contains(r#"Dir["Up"] = 'UP';"#));
        assert!(out.contains(r#"Dir["Down"] = "DOWN";"#));
    }

    #[test]
    fn test_negative_and_hex_values() {
        let out = lower("enum N { A = -2, B, C = 0x10, D }").unwrap();
        assert!(out.contains(r#"N[N["A"] = -2] = "A";"#));
        assert!(out.contains(r#"N[N["B"] = -1] = "B";"#));
        assert!(out.contains(r#"N[N["D"] = 17] = "D";"#));
    }

    #[test]
    fn test_computed_members_reference_siblings() {
        let out = lower("enum F { A = 1, B = A << 1 }").unwrap();
        assert!(out.contains(r#"F[F["B"] = F.A << 1] = "B";"#));
    }

    #[test]
    fn test_missing_initializer_after_string_member() {
        let source = "enum E { A = 'x', B }";
        let diag = lower(source).unwrap_err();
        assert_eq!(diag.message, "Enum member must have initializer.");
        assert_eq!(diag.offset, source.find('B').unwrap());
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("0b101"), Some(5));
        assert_eq!(parse_integer("1_000"), Some(1000));
        assert_eq!(parse_integer("1.5"), None);
    }
}
