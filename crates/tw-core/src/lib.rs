//! Settings, configuration resolution and path mapping for tscwatch.
//!
//! This crate holds the pure, synchronous half of the build pipeline:
//!
//! - [`Schema`]: the static compiler-option schema with defaults and alias
//!   tables
//! - [`UserParams`] / [`resolve`] / [`CanonicalSettings`]: turning layered
//!   user input into one immutable settings object
//! - [`map_output_path`] and friends: deriving output file locations
//! - [`WatchConfig`]: tuning for the file-system watcher
//! - Error types shared with the other crates
//!
//! # Crate Dependencies
//!
//! ```text
//! tw-cli ──► tw-build ──► tw-backend ──► tw-core
//!                     └─► tw-watcher ──► tw-core
//! ```
//!
//! # Example
//!
//! ```
//! use camino::Utf8Path;
//! use tw_core::{map_output_path, resolve, Schema, UserParams};
//!
//! let params = UserParams::from_json_str(
//!     r#"{"rootPath": "/src", "outputPath": "/out", "compilerOptions": {"target": "ES5"}}"#,
//!     Utf8Path::new("inline"),
//! )?;
//! let settings = resolve(Schema::standard(), &params)?;
//!
//! let out = map_output_path(
//!     Utf8Path::new("/src/lib/util.ts"),
//!     settings.root_path(),
//!     settings.output_path(),
//! )?;
//! assert_eq!(out, "/out/lib/util.js");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod paths;
pub mod resolve;
pub mod schema;
pub mod settings;

pub use config::WatchConfig;
pub use error::{ConfigError, PathError};
pub use hash::{FxHashMap, FxHashSet, fx_hash_set, fx_hash_set_with_capacity};
pub use paths::{logical_path, map_output_path, normalize, source_map_path};
pub use resolve::resolve;
pub use schema::{
    AliasTable, ModuleKind, OptionName, OptionSpec, OptionValue, Schema, ScriptTarget, ValueKind,
    ValueSource,
};
pub use settings::{CanonicalSettings, CompilerOptions, UserParams};
