use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;
use std::ptr::NonNull;

use delegate::delegate;

use crate::storage::SharedSymbol;
use crate::storage::TermStore;

/// The public interface for a function symbol. Can be used to write generic
/// functions that accept both [Symbol] and [SymbolRef].
///
/// See [crate::Term] for more information on how to use this trait with two lifetimes.
pub trait Symb<'a, 'b> {
    /// Obtain the symbol's name.
    fn name(&'b self) -> &'a str;

    /// Obtain the symbol's arity.
    fn arity(&self) -> usize;

    /// Returns true iff the name of the symbol is quoted.
    fn is_quoted(&self) -> bool;

    /// Create a copy of the symbol reference.
    fn copy(&'b self) -> SymbolRef<'a>;

    /// Returns the identifier of the symbol in its store.
    fn index(&self) -> usize;

    /// Returns the shared symbol in the symbol pool.
    fn shared(&self) -> NonNull<SharedSymbol>;

    /// Returns true iff this is one of the reserved symbols for integers and lists.
    fn is_reserved(&self) -> bool {
        // Safety: every handle keeps its symbol alive.
        unsafe { self.shared().as_ref() }.is_reserved()
    }
}

/// A reference to a function symbol in the symbol pool of a [TermStore].
#[derive(Clone, Copy)]
pub struct SymbolRef<'a> {
    store: &'a TermStore,
    shared: NonNull<SharedSymbol>,
}

impl<'a> SymbolRef<'a> {
    /// Creates a reference to a symbol that is kept alive for the lifetime `'a`.
    pub(crate) fn from_shared(store: &'a TermStore, shared: NonNull<SharedSymbol>) -> SymbolRef<'a> {
        SymbolRef { store, shared }
    }

    /// Obtains an owning handle to the symbol.
    pub fn protect(&self) -> Symbol<'a> {
        self.symbol().increment_reference();
        Symbol::from_shared(self.store, self.shared)
    }

    fn symbol(&self) -> &'a SharedSymbol {
        // Safety: the symbol is alive for the lifetime 'a, see [SymbolRef::from_shared].
        unsafe { self.shared.as_ref() }
    }
}

impl<'a> Symb<'a, '_> for SymbolRef<'a> {
    fn name(&self) -> &'a str {
        self.symbol().name()
    }

    fn arity(&self) -> usize {
        self.symbol().arity()
    }

    fn is_quoted(&self) -> bool {
        self.symbol().is_quoted()
    }

    fn copy(&self) -> SymbolRef<'a> {
        *self
    }

    fn index(&self) -> usize {
        self.symbol().id()
    }

    fn shared(&self) -> NonNull<SharedSymbol> {
        self.shared
    }
}

impl PartialEq for SymbolRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.shared == other.shared
    }
}

impl Eq for SymbolRef<'_> {}

impl Hash for SymbolRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shared.hash(state)
    }
}

impl PartialOrd for SymbolRef<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SymbolRef<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index().cmp(&other.index())
    }
}

impl fmt::Display for SymbolRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for SymbolRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name(), self.arity())
    }
}

/// An owning handle to a function symbol, with the same interface as
/// [SymbolRef]. The symbol is removed from its store when the last handle and
/// the last term using it are dropped.
pub struct Symbol<'s> {
    symbol: SymbolRef<'s>,
}

impl<'s> Symbol<'s> {
    /// Takes over one reference to the shared symbol.
    pub(crate) fn from_shared(store: &'s TermStore, shared: NonNull<SharedSymbol>) -> Symbol<'s> {
        Symbol {
            symbol: SymbolRef::from_shared(store, shared),
        }
    }

    /// Create a copy of the symbol reference.
    pub fn copy(&self) -> SymbolRef<'_> {
        self.symbol
    }
}

impl<'s, 'a, 'b> Symb<'a, 'b> for Symbol<'s>
where
    'b: 'a,
    's: 'a,
{
    delegate! {
        to self.symbol {
            fn name(&'b self) -> &'a str;
            fn arity(&self) -> usize;
            fn is_quoted(&self) -> bool;
            fn copy(&'b self) -> SymbolRef<'a>;
            fn index(&self) -> usize;
            fn shared(&self) -> NonNull<SharedSymbol>;
        }
    }
}

impl Drop for Symbol<'_> {
    fn drop(&mut self) {
        self.symbol.store.release_symbol(self.symbol.shared);
    }
}

impl Clone for Symbol<'_> {
    fn clone(&self) -> Self {
        self.symbol.protect()
    }
}

impl<'a> From<&SymbolRef<'a>> for Symbol<'a> {
    fn from(value: &SymbolRef<'a>) -> Self {
        value.protect()
    }
}

impl fmt::Display for Symbol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

impl fmt::Debug for Symbol<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.symbol)
    }
}

impl Hash for Symbol<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state)
    }
}

impl PartialEq for Symbol<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl PartialEq<SymbolRef<'_>> for Symbol<'_> {
    fn eq(&self, other: &SymbolRef<'_>) -> bool {
        self.symbol.shared == other.shared
    }
}

impl PartialOrd for Symbol<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.symbol.cmp(&other.symbol)
    }
}

impl Eq for Symbol<'_> {}

#[cfg(test)]
mod tests {
    use crate::storage::TermStore;

    use super::*;

    #[test]
    fn test_symbol_interning() {
        let store = TermStore::new();

        let f = store.symbol("f", 2, false);
        let g = store.symbol("f", 2, false);
        assert_eq!(f, g, "Identical content yields the identical symbol");
        assert_eq!(f.index(), g.index());

        let quoted = store.symbol("f", 2, true);
        assert_ne!(f, quoted);
        assert!(quoted.is_quoted());
        assert_eq!(f.name(), "f");
        assert_eq!(f.arity(), 2);
    }

    #[test]
    fn test_symbol_release() {
        let store = TermStore::new();
        let initial = store.symbol_pool().len();

        let f = store.symbol("f", 1, false);
        let index = f.index();
        let copy = f.clone();
        drop(f);
        assert_eq!(store.symbol_pool().len(), initial + 1, "The clone keeps the symbol alive");

        drop(copy);
        assert_eq!(store.symbol_pool().len(), initial);

        let g = store.symbol("g", 0, false);
        assert_eq!(g.index(), index, "The identifier of f is reused");
    }

    #[test]
    fn test_reserved_symbols() {
        let store = TermStore::new();
        assert!(store.int_symbol().is_reserved());
        assert_eq!(store.list_symbol().arity(), 2);
        assert_eq!(store.empty_list_symbol().name(), "<empty_list>");
        assert!(!store.symbol("a", 0, false).is_reserved());
    }
}
