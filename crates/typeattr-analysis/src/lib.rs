//! Semantic attributes for Go-like syntax trees.
//!
//! Given the syntax trees of one package, the checker computes the
//! attributes downstream tools consume:
//!
//! - the type and, for constants, the exact value of every expression
//!   ([`TypeAndValue`], backed by arbitrary-precision [`constant`] values)
//! - the scope tree, one scope per construct that may declare names
//!   ([`scope`])
//! - the resolution of every selector expression through embedded fields
//!   ([`Selection`])
//! - the order in which package-level variables are initialized
//!   ([`Initializer`])
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   Collect   │────▶│   Declare    │────▶│    Bodies    │──▶ init order
//! │  (resolver) │     │ (decl, type) │     │ (stmt, expr) │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! All objects, types and scopes live in one [`TCObjects`] arena shared by
//! the packages of a program; attributes are keyed by [`NodeId`].
//!
//! # Example
//!
//! ```
//! use typeattr_analysis::{check_package, Config, NullImporter, TCObjects};
//! use typeattr_syntax::AstBuilder;
//!
//! let b = AstBuilder::new();
//! let file = b.file("p", vec![], vec![b.const_decl(&["c"], None, vec![b.rune("'A'")])]);
//! let interner = b.finish();
//!
//! let mut objs = TCObjects::new();
//! let result = check_package(&mut objs, &interner, &mut NullImporter, "p", &[file], Config::default());
//! assert!(!result.has_errors());
//! ```
//!
//! [`NodeId`]: typeattr_syntax::ast::NodeId

mod arena;
pub mod check;
pub mod constant;
pub mod errors;
pub mod importer;
pub mod lookup;
pub mod obj;
pub mod objects;
pub mod operand;
pub mod package;
pub mod scope;
pub mod selection;
pub mod typ;
pub mod universe;

use tracing::debug;
use typeattr_common::{DiagnosticBag, FileId, SymbolInterner};
use typeattr_syntax::ast::File;

pub use check::checker::{CheckResult, Checker, Config};
pub use check::{Initializer, TypeAndValue, TypeInfo};
pub use constant::Value;
pub use errors::{CheckError, TypeError};
pub use importer::{ImportResult, Importer, NullImporter, PackageMapImporter};
pub use obj::{Builtin, LangObj};
pub use objects::{ObjKey, PackageKey, ScopeKey, TCObjects, TypeKey};
pub use scope::{Scope, ScopeKind};
pub use selection::{Selection, SelectionKind};
pub use typ::{BasicType, Type};

/// Checks `files` as the package at `path` and returns its attributes.
///
/// The package is created in `objs`, so packages checked earlier into the
/// same arena can be imported through `importer`.
pub fn check_package(
    objs: &mut TCObjects,
    interner: &SymbolInterner,
    importer: &mut dyn Importer,
    path: &str,
    files: &[File],
    config: Config,
) -> CheckResult {
    let pkg = objs.new_package(path.to_string());
    let mut checker = Checker::new(objs, interner, importer, pkg, config);
    checker.check_files(files);
    let result = checker.finish();
    debug!(package = path, errors = result.errors.len(), "check_package done");
    result
}

/// Converts the errors of a check into diagnostics labelled in `file_id`.
pub fn report(result: &CheckResult, file_id: FileId) -> DiagnosticBag {
    let mut bag = DiagnosticBag::new();
    bag.extend(result.errors.iter().map(|e| e.to_diagnostic(file_id)));
    bag
}

#[cfg(test)]
mod tests {
    use super::*;
    use typeattr_syntax::AstBuilder;

    fn check(b: AstBuilder, files: &[File]) -> (TCObjects, CheckResult) {
        let interner = b.finish();
        let mut objs = TCObjects::new();
        let result = check_package(&mut objs, &interner, &mut NullImporter, "p", files, Config::default());
        (objs, result)
    }

    #[test]
    fn test_check_empty_package() {
        let b = AstBuilder::new();
        let file = b.file("p", vec![], vec![]);
        let (objs, result) = check(b, &[file]);
        assert!(result.errors.is_empty());
        assert_eq!(objs.pkgs[result.pkg].name(), Some("p"));
        assert!(objs.pkgs[result.pkg].complete());
    }

    #[test]
    fn test_report_converts_errors() {
        let b = AstBuilder::new();
        let file = b.file("p", vec![], vec![b.var_decl(&["x"], None, vec![b.name("undefined")])]);
        let (_, result) = check(b, &[file]);
        assert!(result.has_errors());
        let bag = report(&result, 0);
        assert!(bag.has_errors());
        assert_eq!(bag.len(), result.errors.len());
    }

    #[test]
    fn test_failed_import_is_reported() {
        let b = AstBuilder::new();
        let file = b.file("p", vec![b.import("fmt")], vec![]);
        let (_, result) = check(b, &[file]);
        assert!(result.errors.iter().any(|e| e.code == TypeError::ImportFailed));
    }

    #[test]
    fn test_type_info_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypeInfo>();
    }
}
