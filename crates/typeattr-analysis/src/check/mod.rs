//! The checker proper.
//!
//! Package-level objects are collected first ([`resolver`]), then declared
//! in dependency order, then function bodies are checked. Attributes land in
//! a [`TypeInfo`].

mod assignment;
mod builtin;
mod call;
pub(crate) mod checker;
mod conversion;
mod decl;
mod expr;
mod initorder;
pub(crate) mod resolver;
mod stmt;
mod type_info;
mod typexpr;

pub use checker::Checker;
pub use resolver::DeclInfo;
pub use type_info::{Initializer, TypeAndValue, TypeInfo};
