//! User-facing settings and the canonical settings object.
//!
//! Settings reach the resolver as [`UserParams`], a loosely-typed shape that
//! can come from CLI flags or a JSON file. Resolution produces
//! [`CanonicalSettings`], which is immutable and shared for the rest of the
//! process.
//!
//! A settings file looks like this:
//!
//! ```json
//! {
//!   "watch": true,
//!   "rootPath": "src",
//!   "outputPath": "build",
//!   "compilerOptions": { "moduleType": "amd", "sourcemap": true }
//! }
//! ```

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::schema::{ModuleKind, OptionName, OptionValue, Schema, ScriptTarget};

/// Raw settings as supplied by a user.
///
/// Every field is optional so that several sources can be layered with
/// [`UserParams::overlay`]. Unknown top-level keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserParams {
    /// `true` for a persistent watch, `false` for a one-shot build.
    #[serde(alias = "watch", skip_serializing_if = "Option::is_none")]
    pub watch_mode: Option<bool>,

    /// Root of the source tree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_path: Option<Utf8PathBuf>,

    /// Root of the output tree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<Utf8PathBuf>,

    /// Compiler options keyed by the name the user wrote.
    pub compiler_options: BTreeMap<String, serde_json::Value>,
}

impl UserParams {
    /// Parses settings from a JSON string.
    ///
    /// `origin` is only used to label errors.
    pub fn from_json_str(json: &str, origin: &Utf8Path) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: origin.to_owned(),
            source,
        })
    }

    /// Loads settings from a JSON file.
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json_str(&json, path)
    }

    /// Layers `top` over `self`.
    ///
    /// Fields present in `top` win. Compiler options are merged per key.
    #[must_use]
    pub fn overlay(mut self, top: Self) -> Self {
        self.watch_mode = top.watch_mode.or(self.watch_mode);
        self.root_path = top.root_path.or(self.root_path);
        self.output_path = top.output_path.or(self.output_path);
        self.compiler_options.extend(top.compiler_options);
        self
    }

    /// Sets a compiler option by its canonical name.
    #[must_use]
    pub fn with_option(mut self, name: OptionName, value: serde_json::Value) -> Self {
        self.compiler_options.insert(name.as_str().to_owned(), value);
        self
    }
}

/// Fully resolved compiler options.
///
/// Always holds one value per [`OptionName`] once produced by the resolver.
/// The typed accessors fall back to the schema default if a value is missing
/// or of the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerOptions(BTreeMap<OptionName, OptionValue>);

impl Default for CompilerOptions {
    fn default() -> Self {
        Self(
            Schema::standard()
                .options()
                .map(|spec| (spec.name(), spec.default_value().clone()))
                .collect(),
        )
    }
}

impl CompilerOptions {
    /// Returns the value stored for `name`.
    #[must_use]
    pub fn get(&self, name: OptionName) -> Option<&OptionValue> {
        self.0.get(&name)
    }

    /// Replaces the value stored for `name`.
    #[must_use]
    pub fn with(mut self, name: OptionName, value: OptionValue) -> Self {
        self.0.insert(name, value);
        self
    }

    pub(crate) const fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub(crate) fn insert(&mut self, name: OptionName, value: OptionValue) {
        self.0.insert(name, value);
    }

    /// Iterates over `(name, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (OptionName, &OptionValue)> {
        self.0.iter().map(|(name, value)| (*name, value))
    }

    fn value_or_default(&self, name: OptionName) -> &OptionValue {
        self.0
            .get(&name)
            .unwrap_or_else(|| Schema::standard().spec(name).default_value())
    }

    fn flag(&self, name: OptionName) -> bool {
        match self.value_or_default(name) {
            OptionValue::Bool(b) => *b,
            _ => matches!(Schema::standard().spec(name).default_value(), OptionValue::Bool(true)),
        }
    }

    /// Keep comments in emitted code.
    #[must_use]
    pub fn comments(&self) -> bool {
        self.flag(OptionName::Comments)
    }

    /// Concatenate output.
    #[must_use]
    pub fn concat(&self) -> bool {
        self.flag(OptionName::Concat)
    }

    /// Extra debugging detail.
    #[must_use]
    pub fn debug(&self) -> bool {
        self.flag(OptionName::Debug)
    }

    /// Emit declaration files.
    #[must_use]
    pub fn declaration(&self) -> bool {
        self.flag(OptionName::Declaration)
    }

    /// Strip indentation and blank lines.
    #[must_use]
    pub fn minimize_whitespace(&self) -> bool {
        self.flag(OptionName::MinimizeWhitespace)
    }

    /// Emit a source map.
    #[must_use]
    pub fn sourcemap(&self) -> bool {
        self.flag(OptionName::Sourcemap)
    }

    /// Emitter style string.
    #[must_use]
    pub fn style(&self) -> &str {
        match self.value_or_default(OptionName::Style) {
            OptionValue::Text(s) => s,
            _ => "",
        }
    }

    /// Module system of emitted code.
    #[must_use]
    pub fn module_kind(&self) -> ModuleKind {
        match self.value_or_default(OptionName::ModuleType) {
            OptionValue::Module(kind) => *kind,
            _ => ModuleKind::default(),
        }
    }

    /// Language target.
    #[must_use]
    pub fn target(&self) -> ScriptTarget {
        match self.value_or_default(OptionName::Target) {
            OptionValue::Target(target) => *target,
            _ => ScriptTarget::default(),
        }
    }
}

/// The resolved settings of one process run.
///
/// Produced once by [`resolve`](crate::resolve) and never mutated. Share it
/// behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalSettings {
    watch_mode: bool,
    root_path: Utf8PathBuf,
    output_path: Utf8PathBuf,
    compiler_options: CompilerOptions,
}

impl CanonicalSettings {
    pub(crate) const fn new(
        watch_mode: bool,
        root_path: Utf8PathBuf,
        output_path: Utf8PathBuf,
        compiler_options: CompilerOptions,
    ) -> Self {
        Self {
            watch_mode,
            root_path,
            output_path,
            compiler_options,
        }
    }

    /// `true` for a persistent watch, `false` for a one-shot build.
    #[must_use]
    pub const fn watch_mode(&self) -> bool {
        self.watch_mode
    }

    /// Root of the source tree.
    #[must_use]
    pub fn root_path(&self) -> &Utf8Path {
        &self.root_path
    }

    /// Root of the output tree.
    #[must_use]
    pub fn output_path(&self) -> &Utf8Path {
        &self.output_path
    }

    /// Resolved compiler options.
    #[must_use]
    pub const fn compiler_options(&self) -> &CompilerOptions {
        &self.compiler_options
    }

    /// Renders these settings back into the user-facing shape.
    ///
    /// Resolving the result yields settings equal to `self`.
    #[must_use]
    pub fn to_user_params(&self) -> UserParams {
        UserParams {
            watch_mode: Some(self.watch_mode),
            root_path: Some(self.root_path.clone()),
            output_path: Some(self.output_path.clone()),
            compiler_options: self
                .compiler_options
                .iter()
                .map(|(name, value)| (name.as_str().to_owned(), value.to_json()))
                .collect(),
        }
    }
}
