//! Syntax tree consumed by the typeattr semantic layer.
//!
//! This crate provides:
//! - **AST**: node types, each carrying a [`ast::NodeId`] for attribute maps
//! - **Builder**: programmatic tree construction with fresh ids and spans
//! - **Display**: one-line rendering of expressions for diagnostics
//! - **Visit**: read-only traversal

pub mod ast;
pub mod builder;
pub mod display;
pub mod visit;

pub use builder::AstBuilder;
