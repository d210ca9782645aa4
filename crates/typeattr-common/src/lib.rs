//! # typeattr-common
//!
//! Shared infrastructure for the typeattr crates:
//! - byte-offset spans for locating syntax nodes
//! - symbol interning for identifiers and literal text
//! - builder-style diagnostics that render through `codespan-reporting`

pub mod diagnostic;
pub mod span;
pub mod symbol;

pub use diagnostic::{Diagnostic, DiagnosticBag, FileId, Severity};
pub use span::Span;
pub use symbol::{Symbol, SymbolInterner};
