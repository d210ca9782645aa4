//! Package importer.
//!
//! Loading packages is the driver's business. The checker asks an
//! [`Importer`] for each import path and only ever sees the resulting
//! [`PackageKey`] in the shared arenas.

use std::collections::HashMap;

use crate::objects::{PackageKey, TCObjects};

/// Result of an import operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportResult {
    /// Successfully imported package.
    Ok(PackageKey),
    /// Import failed with error message.
    Err(String),
    /// Package is currently being imported (cycle).
    Cycle,
}

/// Trait for package importers.
pub trait Importer {
    /// Imports the package with the given path into `objs`.
    fn import(&mut self, path: &str, objs: &mut TCObjects) -> ImportResult;
}

/// Serves packages that were already checked into the same arenas.
///
/// Explicit registrations win; otherwise any complete package with the
/// requested path is returned.
#[derive(Debug, Default)]
pub struct PackageMapImporter {
    packages: HashMap<String, PackageKey>,
}

impl PackageMapImporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: impl Into<String>, pkg: PackageKey) {
        self.packages.insert(path.into(), pkg);
    }
}

impl Importer for PackageMapImporter {
    fn import(&mut self, path: &str, objs: &mut TCObjects) -> ImportResult {
        if let Some(&pkg) = self.packages.get(path) {
            return ImportResult::Ok(pkg);
        }
        match objs.find_package_by_path(path) {
            Some(pkg) if objs.pkgs[pkg].complete() => ImportResult::Ok(pkg),
            Some(_) => ImportResult::Cycle,
            None => ImportResult::Err(format!("cannot find package \"{}\"", path)),
        }
    }
}

/// An importer that always fails.
#[derive(Debug, Default)]
pub struct NullImporter;

impl Importer for NullImporter {
    fn import(&mut self, path: &str, _objs: &mut TCObjects) -> ImportResult {
        ImportResult::Err(format!("cannot import \"{}\"", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_map_importer() {
        let mut objs = TCObjects::new();
        let lib = objs.new_package("lib".to_string());
        let mut imp = PackageMapImporter::new();
        // incomplete packages are still being checked
        assert_eq!(imp.import("lib", &mut objs), ImportResult::Cycle);
        objs.pkgs[lib].mark_complete();
        assert_eq!(imp.import("lib", &mut objs), ImportResult::Ok(lib));
        assert!(matches!(imp.import("fmt", &mut objs), ImportResult::Err(_)));

        let other = objs.new_package("x/y".to_string());
        imp.register("alias/path", other);
        assert_eq!(imp.import("alias/path", &mut objs), ImportResult::Ok(other));
    }

    #[test]
    fn test_null_importer() {
        let mut objs = TCObjects::new();
        assert_eq!(
            NullImporter.import("fmt", &mut objs),
            ImportResult::Err("cannot import \"fmt\"".to_string())
        );
    }
}
