//! Packages.

use std::borrow::Cow;
use std::fmt::{self, Write};

use crate::objects::{PackageKey, ScopeKey};

#[derive(Debug)]
pub struct Package {
    path: String,
    name: Option<String>,
    scope: ScopeKey,
    complete: bool,
    imports: Vec<PackageKey>,
    /// Set for packages that stand in for failed imports.
    fake: bool,
}

impl Package {
    pub fn new(path: String, name: Option<String>, scope: ScopeKey) -> Package {
        Package {
            path,
            name,
            scope,
            complete: false,
            imports: Vec::new(),
            fake: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The name from the package clause, once a file has been checked.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    pub fn scope(&self) -> &ScopeKey {
        &self.scope
    }

    pub fn complete(&self) -> bool {
        self.complete
    }

    pub fn mark_complete(&mut self) {
        self.complete = true;
    }

    pub fn fake(&self) -> bool {
        self.fake
    }

    pub fn mark_fake_with_name(&mut self, name: String) {
        self.fake = true;
        self.name = Some(name);
    }

    /// Packages imported by this package, without duplicates.
    pub fn imports(&self) -> &Vec<PackageKey> {
        &self.imports
    }

    pub fn add_import(&mut self, pkey: PackageKey) {
        if !self.imports.contains(&pkey) {
            self.imports.push(pkey);
        }
    }

    /// Writes the package prefix of a qualified name, `path.`.
    pub fn fmt_with_qualifier(
        &self,
        f: &mut impl Write,
        qf: &dyn Fn(&Package) -> Cow<'_, str>,
    ) -> fmt::Result {
        let q = qf(self);
        if q.is_empty() {
            return Ok(());
        }
        write!(f, "{}.", q)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            None => write!(f, "uninitialized package, path: {}", &self.path),
            Some(name) => write!(f, "package {} (\"{}\")", name, &self.path),
        }
    }
}
