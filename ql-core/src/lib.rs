//! Core of the Quill toolchain.
//!
//! This crate holds the whole compiler pipeline from Quill source to C:
//!
//!   source .ql
//!     -> lexer        (tokens)
//!     -> parser       (AST, one `File` node per logical file)
//!     -> analyzer     (structural checks, directive placement)
//!     -> package      (package table, import graph, dependency order)
//!     -> name_resolve + typecheck (resolved types and bindings)
//!     -> codegen_c    (one .h/.c pair per package, `main.c` for the entry)
//!
//! The crate performs no file I/O. Higher-level tools (the CLI, tests)
//! load sources into a [`SourceMap`] and write the generated files.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod diagnostic;
pub mod error;
pub mod source;

// ---------------------------------------------------------------------
// Front-end: lexing, parsing and structural checks
// ---------------------------------------------------------------------

pub mod lexer;
pub mod parser;
pub mod ast;
pub mod printer;
pub mod analyzer;

// ---------------------------------------------------------------------
// Semantic layers: packages, types, name resolution, type checking
// ---------------------------------------------------------------------

pub mod package;
pub mod types;
pub mod name_resolve;
pub mod typecheck;

// ---------------------------------------------------------------------
// Builtins
// ---------------------------------------------------------------------

pub mod builtins;

// ---------------------------------------------------------------------
// Back-end: code generation and compiler orchestration
// ---------------------------------------------------------------------

pub mod codegen_c;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use codegen_c::GeneratedFile;
pub use compiler::{CompilationArtifact, CompileOptions, compile, dump_ast, dump_tokens};
pub use diagnostic::{Diagnostic, Severity};
pub use error::CoreError;
pub use source::SourceMap;
pub use span::FileId;
