//! Compilation backends for tscwatch.
//!
//! The build pipeline only ever talks to the [`CompilationBackend`] trait:
//! source text and a logical path go in, an [`EmitResult`] comes out. This
//! crate defines that trait together with [`TreeSitterBackend`], a
//! type-erasing TypeScript backend.
//!
//! # What the Tree-sitter Backend Does
//!
//! | Input | Output |
//! |-------|--------|
//! | Type annotations, interfaces, type aliases, `declare` | removed |
//! | `enum E { A, B }` | `var E; (function (E) { ... })(E \|\| (E = {}));` |
//! | `constructor(private x: number)` | `constructor(x) { this.x = x;` |
//! | `import { a } from "m"` | `var a = require("m").a;` |
//! | `export function f() {}` | `function f() {} exports.f = f;` |
//! | namespaces, decorators | diagnostic |
//!
//! Everything else is copied through unchanged. Source maps are line
//! level: each emitted line points at the start of the line it came from.
//!
//! # Thread Safety
//!
//! [`TreeSitterBackend`] is a zero-sized, `Copy` value. Every call builds
//! its own parser; the compiled module query is shared process-wide.

#![deny(clippy::all)]
#![warn(missing_docs)]

mod backend;
pub mod diagnostic;
mod emitter;
mod enums;
pub mod error;
mod modules;
mod output;
mod parser;
pub mod queries;
mod sourcemap;

pub use backend::{CompilationBackend, TreeSitterBackend};
pub use diagnostic::{Diagnostic, EmitResult};
pub use error::BackendError;
