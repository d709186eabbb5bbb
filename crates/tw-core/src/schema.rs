//! The static compiler-option schema.
//!
//! Each compiler option is described by an [`OptionSpec`]: its default value
//! and where accepted values come from. Options either take the user's value
//! directly (after a type check) or map a case-insensitive token through an
//! [`AliasTable`]. Both kinds are resolved through [`OptionSpec::resolve`].
//!
//! | Option | Default | Values |
//! |--------|---------|--------|
//! | `comments` | `true` | bool |
//! | `concat` | `false` | bool |
//! | `debug` | `false` | bool |
//! | `declaration` | `false` | bool |
//! | `minimizeWhitespace` | `false` | bool |
//! | `moduleType` | `commonjs` | `commonjs`, `synchronous`, `amd`, `asynchronous` |
//! | `sourcemap` | `false` | bool |
//! | `style` | `""` | string |
//! | `target` | `es3` | `es3`, `es5` |
//!
//! # Examples
//!
//! ```
//! use tw_core::{ModuleKind, OptionName, OptionValue, Schema};
//!
//! let schema = Schema::standard();
//! let spec = schema.spec(OptionName::ModuleType);
//! let value = spec.resolve(&serde_json::json!("Asynchronous"))?;
//! assert_eq!(value, OptionValue::Module(ModuleKind::Amd));
//! # Ok::<(), tw_core::ConfigError>(())
//! ```

use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hash::FxHashMap;

/// The closed set of compiler option names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptionName {
    /// Keep comments in emitted code.
    Comments,
    /// Concatenate output into a single file.
    Concat,
    /// Emit extra debugging detail.
    Debug,
    /// Emit declaration files.
    Declaration,
    /// Strip indentation and blank lines from emitted code.
    MinimizeWhitespace,
    /// Module system for emitted code.
    ModuleType,
    /// Emit a source map next to each output file.
    Sourcemap,
    /// Emitter style string.
    Style,
    /// ECMAScript language target.
    Target,
}

impl OptionName {
    /// All option names in canonical order.
    pub const ALL: [Self; 9] = [
        Self::Comments,
        Self::Concat,
        Self::Debug,
        Self::Declaration,
        Self::MinimizeWhitespace,
        Self::ModuleType,
        Self::Sourcemap,
        Self::Style,
        Self::Target,
    ];

    /// Returns the canonical camelCase spelling of this option.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Comments => "comments",
            Self::Concat => "concat",
            Self::Debug => "debug",
            Self::Declaration => "declaration",
            Self::MinimizeWhitespace => "minimizeWhitespace",
            Self::ModuleType => "moduleType",
            Self::Sourcemap => "sourcemap",
            Self::Style => "style",
            Self::Target => "target",
        }
    }

    /// Looks up an option by the key a user wrote.
    ///
    /// Accepts the canonical spelling plus the legacy `minw` and `moduletype`
    /// keys. Returns `None` for anything else.
    ///
    /// ```
    /// use tw_core::OptionName;
    ///
    /// assert_eq!(OptionName::from_key("minw"), Some(OptionName::MinimizeWhitespace));
    /// assert_eq!(OptionName::from_key("sourceMap"), None);
    /// ```
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "minw" => Some(Self::MinimizeWhitespace),
            "moduletype" => Some(Self::ModuleType),
            _ => Self::ALL.into_iter().find(|name| name.as_str() == key),
        }
    }
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Module system of emitted code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// `require` / `exports`.
    #[default]
    CommonJs,
    /// `define([...], function (...) { ... })`.
    Amd,
}

impl ModuleKind {
    /// Returns the canonical token for this module kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CommonJs => "commonjs",
            Self::Amd => "amd",
        }
    }
}

/// ECMAScript language target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptTarget {
    /// ECMAScript 3.
    #[default]
    Es3,
    /// ECMAScript 5.
    Es5,
}

impl ScriptTarget {
    /// Returns the canonical token for this target.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Es3 => "es3",
            Self::Es5 => "es5",
        }
    }

    /// Whether property accessors (`get`/`set`) can be emitted for this target.
    #[must_use]
    pub const fn supports_accessors(self) -> bool {
        matches!(self, Self::Es5)
    }
}

/// A resolved compiler option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// A boolean flag.
    Bool(bool),
    /// A free-form string.
    Text(String),
    /// A module system.
    Module(ModuleKind),
    /// A language target.
    Target(ScriptTarget),
}

impl OptionValue {
    /// Renders this value in the shape a user would write it.
    ///
    /// Aliased values are rendered as their canonical token, so the result
    /// resolves back to the same value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Module(kind) => serde_json::Value::String(kind.as_str().to_owned()),
            Self::Target(target) => serde_json::Value::String(target.as_str().to_owned()),
        }
    }
}

/// The JSON type a directly-valued option accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// JSON `true` / `false`.
    Bool,
    /// JSON string.
    Text,
}

impl ValueKind {
    const fn describe(self) -> &'static str {
        match self {
            Self::Bool => "a boolean",
            Self::Text => "a string",
        }
    }
}

/// Case-insensitive token table for enum-like options.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: FxHashMap<&'static str, OptionValue>,
}

impl AliasTable {
    /// Builds a table from `(lower-case token, value)` pairs.
    #[must_use]
    pub fn new(entries: &[(&'static str, OptionValue)]) -> Self {
        Self {
            entries: entries.iter().cloned().collect(),
        }
    }

    /// Looks up a token, ignoring ASCII case.
    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<&OptionValue> {
        self.entries.get(token.to_ascii_lowercase().as_str())
    }

    /// Number of accepted tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table accepts no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where an option's resolved value comes from.
#[derive(Debug, Clone)]
pub enum ValueSource {
    /// The user's value is used as-is once its type is checked.
    Direct(ValueKind),
    /// The user's value is a token looked up in an alias table.
    Aliased(AliasTable),
}

/// Static description of one compiler option.
#[derive(Debug, Clone)]
pub struct OptionSpec {
    name: OptionName,
    default: OptionValue,
    source: ValueSource,
}

impl OptionSpec {
    /// Creates a spec for an option that takes its value directly.
    #[must_use]
    pub const fn direct(name: OptionName, kind: ValueKind, default: OptionValue) -> Self {
        Self {
            name,
            default,
            source: ValueSource::Direct(kind),
        }
    }

    /// Creates a spec for an option whose value comes from an alias table.
    #[must_use]
    pub const fn aliased(name: OptionName, table: AliasTable, default: OptionValue) -> Self {
        Self {
            name,
            default,
            source: ValueSource::Aliased(table),
        }
    }

    /// The option this spec describes.
    #[must_use]
    pub const fn name(&self) -> OptionName {
        self.name
    }

    /// The value used when the user supplies none.
    #[must_use]
    pub const fn default_value(&self) -> &OptionValue {
        &self.default
    }

    /// How user values are accepted.
    #[must_use]
    pub const fn source(&self) -> &ValueSource {
        &self.source
    }

    /// Resolves a raw user value against this spec.
    ///
    /// Direct options must carry a value of the declared JSON type. Aliased
    /// options must carry a string found in the alias table. No coercion is
    /// attempted either way.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidOption`] for a type mismatch and
    /// [`ConfigError::UnknownAlias`] for an unrecognized token.
    pub fn resolve(&self, raw: &serde_json::Value) -> Result<OptionValue, ConfigError> {
        match &self.source {
            ValueSource::Direct(kind) => match (kind, raw) {
                (ValueKind::Bool, serde_json::Value::Bool(b)) => Ok(OptionValue::Bool(*b)),
                (ValueKind::Text, serde_json::Value::String(s)) => Ok(OptionValue::Text(s.clone())),
                _ => Err(ConfigError::invalid_option(
                    self.name.as_str(),
                    format!("expected {}, got {raw}", kind.describe()),
                )),
            },
            ValueSource::Aliased(table) => {
                let serde_json::Value::String(token) = raw else {
                    return Err(ConfigError::invalid_option(
                        self.name.as_str(),
                        format!("expected a string, got {raw}"),
                    ));
                };
                table
                    .lookup(token)
                    .cloned()
                    .ok_or_else(|| ConfigError::unknown_alias(self.name.as_str(), token.as_str()))
            }
        }
    }
}

/// The full settings schema: top-level defaults plus one spec per option.
#[derive(Debug, Clone)]
pub struct Schema {
    watch_mode: bool,
    // Indexed by `OptionName` discriminant.
    options: [OptionSpec; 9],
}

static STANDARD_SCHEMA: OnceLock<Schema> = OnceLock::new();

impl Schema {
    /// Returns the standard schema, built once per process.
    pub fn standard() -> &'static Self {
        STANDARD_SCHEMA.get_or_init(Self::build_standard)
    }

    fn build_standard() -> Self {
        let modules = AliasTable::new(&[
            ("commonjs", OptionValue::Module(ModuleKind::CommonJs)),
            ("synchronous", OptionValue::Module(ModuleKind::CommonJs)),
            ("amd", OptionValue::Module(ModuleKind::Amd)),
            ("asynchronous", OptionValue::Module(ModuleKind::Amd)),
        ]);
        let targets = AliasTable::new(&[
            ("es3", OptionValue::Target(ScriptTarget::Es3)),
            ("es5", OptionValue::Target(ScriptTarget::Es5)),
        ]);

        let flag = |name, default| OptionSpec::direct(name, ValueKind::Bool, OptionValue::Bool(default));

        Self {
            watch_mode: true,
            options: [
                flag(OptionName::Comments, true),
                flag(OptionName::Concat, false),
                flag(OptionName::Debug, false),
                flag(OptionName::Declaration, false),
                flag(OptionName::MinimizeWhitespace, false),
                OptionSpec::aliased(
                    OptionName::ModuleType,
                    modules,
                    OptionValue::Module(ModuleKind::CommonJs),
                ),
                flag(OptionName::Sourcemap, false),
                OptionSpec::direct(OptionName::Style, ValueKind::Text, OptionValue::Text(String::new())),
                OptionSpec::aliased(OptionName::Target, targets, OptionValue::Target(ScriptTarget::Es3)),
            ],
        }
    }

    /// Default for the top-level `watchMode` key.
    #[must_use]
    pub const fn default_watch_mode(&self) -> bool {
        self.watch_mode
    }

    /// Returns the spec for `name`.
    #[must_use]
    pub fn spec(&self, name: OptionName) -> &OptionSpec {
        &self.options[name as usize]
    }

    /// Iterates over every option spec in canonical order.
    pub fn options(&self) -> impl Iterator<Item = &OptionSpec> {
        self.options.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_schema_covers_every_option() {
        let schema = Schema::standard();
        let names: Vec<_> = schema.options().map(OptionSpec::name).collect();
        assert_eq!(names, OptionName::ALL.to_vec());
        assert!(schema.default_watch_mode());
    }

    #[test]
    fn test_defaults() {
        let schema = Schema::standard();
        assert_eq!(schema.spec(OptionName::Comments).default_value(), &OptionValue::Bool(true));
        assert_eq!(schema.spec(OptionName::Sourcemap).default_value(), &OptionValue::Bool(false));
        assert_eq!(
            schema.spec(OptionName::ModuleType).default_value(),
            &OptionValue::Module(ModuleKind::CommonJs)
        );
        assert_eq!(
            schema.spec(OptionName::Target).default_value(),
            &OptionValue::Target(ScriptTarget::Es3)
        );
        assert_eq!(
            schema.spec(OptionName::Style).default_value(),
            &OptionValue::Text(String::new())
        );
    }

    #[test]
    fn test_alias_lookup_ignores_case() {
        let spec = Schema::standard().spec(OptionName::ModuleType);
        for token in ["amd", "AMD", "Amd", "asynchronous", "ASYNCHRONOUS"] {
            assert_eq!(
                spec.resolve(&json!(token)).ok(),
                Some(OptionValue::Module(ModuleKind::Amd)),
                "token {token}"
            );
        }
        assert_eq!(
            spec.resolve(&json!("Synchronous")).ok(),
            Some(OptionValue::Module(ModuleKind::CommonJs))
        );
    }

    #[test]
    fn test_alias_rejects_unknown_token() {
        let spec = Schema::standard().spec(OptionName::Target);
        let err = spec.resolve(&json!("xyz")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownAlias { ref option, ref token } if option == "target" && token == "xyz"
        ));
    }

    #[test]
    fn test_alias_rejects_non_string() {
        let spec = Schema::standard().spec(OptionName::Target);
        assert!(matches!(
            spec.resolve(&json!(5)),
            Err(ConfigError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_direct_type_check() {
        let schema = Schema::standard();
        assert_eq!(
            schema.spec(OptionName::Sourcemap).resolve(&json!(true)).ok(),
            Some(OptionValue::Bool(true))
        );
        assert!(schema.spec(OptionName::Sourcemap).resolve(&json!("true")).is_err());
        assert!(schema.spec(OptionName::Style).resolve(&json!(false)).is_err());
        assert_eq!(
            schema.spec(OptionName::Style).resolve(&json!("compact")).ok(),
            Some(OptionValue::Text("compact".to_owned()))
        );
    }

    #[test]
    fn test_from_key() {
        assert_eq!(OptionName::from_key("moduleType"), Some(OptionName::ModuleType));
        assert_eq!(OptionName::from_key("moduletype"), Some(OptionName::ModuleType));
        assert_eq!(OptionName::from_key("minimizeWhitespace"), Some(OptionName::MinimizeWhitespace));
        assert_eq!(OptionName::from_key("noImplicitAny"), None);
    }

    #[test]
    fn test_option_value_to_json() {
        assert_eq!(OptionValue::Module(ModuleKind::Amd).to_json(), json!("amd"));
        assert_eq!(OptionValue::Target(ScriptTarget::Es5).to_json(), json!("es5"));
        assert_eq!(OptionValue::Bool(false).to_json(), json!(false));
    }
}
