//! Symbol interning for identifiers and literal text.
//!
//! Syntax trees store `Symbol`s; the checker resolves them back to strings
//! through the `SymbolInterner` that built the tree.

use std::fmt;

use string_interner::{backend::StringBackend, DefaultSymbol, StringInterner};

/// An interned string. Cheap to copy and compare.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(Option<DefaultSymbol>);

impl Symbol {
    /// Placeholder for synthesized nodes; resolves to nothing.
    pub const DUMMY: Symbol = Symbol(None);

    #[inline]
    pub const fn is_dummy(self) -> bool {
        self.0.is_none()
    }

    /// Raw index of this symbol, `u32::MAX` for the dummy.
    #[inline]
    pub fn as_u32(self) -> u32 {
        use string_interner::Symbol as _;
        self.0.map(|s| s.to_usize() as u32).unwrap_or(u32::MAX)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dummy() {
            write!(f, "Symbol(DUMMY)")
        } else {
            write!(f, "Symbol({})", self.as_u32())
        }
    }
}

/// Registry of interned strings.
#[derive(Clone)]
pub struct SymbolInterner {
    interner: StringInterner<StringBackend<DefaultSymbol>>,
}

impl SymbolInterner {
    pub fn new() -> Self {
        Self {
            interner: StringInterner::new(),
        }
    }

    /// Interns `string`, returning the existing symbol if already present.
    #[inline]
    pub fn intern(&mut self, string: &str) -> Symbol {
        Symbol(Some(self.interner.get_or_intern(string)))
    }

    /// Looks up a string without interning it.
    #[inline]
    pub fn get(&self, string: &str) -> Option<Symbol> {
        self.interner.get(string).map(|s| Symbol(Some(s)))
    }

    /// Resolves a symbol to its string; `None` for the dummy symbol.
    #[inline]
    pub fn resolve(&self, symbol: Symbol) -> Option<&str> {
        symbol.0.and_then(|s| self.interner.resolve(s))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.interner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.interner.is_empty()
    }
}

impl Default for SymbolInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SymbolInterner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolInterner")
            .field("len", &self.interner.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_is_idempotent() {
        let mut interner = SymbolInterner::new();
        let a = interner.intern("counter");
        let b = interner.intern("counter");
        let c = interner.intern("next");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.len(), 2);
        assert_eq!(interner.resolve(c), Some("next"));
    }

    #[test]
    fn test_dummy_symbol() {
        let interner = SymbolInterner::new();
        assert!(Symbol::DUMMY.is_dummy());
        assert_eq!(interner.resolve(Symbol::DUMMY), None);
        assert_eq!(Symbol::DUMMY.as_u32(), u32::MAX);
        assert_eq!(interner.get("missing"), None);
    }
}
