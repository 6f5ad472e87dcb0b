#![forbid(unsafe_code)]

use std::cell::Cell;
use std::hash::Hash;
use std::hash::Hasher;
use std::ptr::NonNull;

use hashbrown::Equivalent;
use hashbrown::HashMap;
use log::debug;
use rustc_hash::FxBuildHasher;

/// The identifier of the symbol used for integer terms.
pub const INT_SYMBOL: usize = 0;

/// The identifier of the symbol used for list nodes, with the head and tail as arguments.
pub const LIST_SYMBOL: usize = 1;

/// The identifier of the symbol used for the empty list.
pub const EMPTY_LIST_SYMBOL: usize = 2;

/// The names of the reserved symbols, indexed by their identifier.
pub(crate) const RESERVED_SYMBOLS: [(&str, usize); 3] =
    [("<aterm_int>", 0), ("<list_constructor>", 2), ("<empty_list>", 0)];

/// Pool for the maximal sharing of function symbols, see [crate::SymbolRef].
/// Ensures that symbols with the same name, arity and quotation are the same
/// [SharedSymbol].
///
/// # Details
///
/// Every symbol has a small integer identifier, which is its index in the
/// pool. The identifier of a symbol whose reference count dropped to zero is
/// reused for the next new symbol. Symbols are boxed so that their address
/// stays valid while they are alive, terms refer to their symbol by address.
pub struct SymbolPool {
    symbols: Vec<Option<Box<SharedSymbol>>>,

    /// Identifiers of removed symbols.
    free_ids: Vec<usize>,

    /// Maps the content of a symbol to its identifier.
    lookup: HashMap<SymbolKey, usize, FxBuildHasher>,
}

impl SymbolPool {
    /// Creates a pool containing only the reserved symbols. These are owned by
    /// the pool itself and are never removed.
    pub(crate) fn new() -> SymbolPool {
        let mut pool = SymbolPool {
            symbols: Vec::new(),
            free_ids: Vec::new(),
            lookup: HashMap::with_hasher(FxBuildHasher),
        };

        for (id, (name, arity)) in RESERVED_SYMBOLS.iter().enumerate() {
            pool.intern(name, *arity, false);
            debug_assert_eq!(pool.get(id).map(|s| s.name()), Some(*name));
        }

        pool
    }

    /// Returns the symbol with the given content, creating it when it does not
    /// exist yet. The reference count of the result is incremented.
    pub(crate) fn intern(&mut self, name: &str, arity: usize, quoted: bool) -> NonNull<SharedSymbol> {
        let lookup = SymbolLookup { name, arity, quoted };

        let id = match self.lookup.get(&lookup) {
            Some(&id) => id,
            None => {
                let id = self.free_ids.pop().unwrap_or(self.symbols.len());
                let symbol = Box::new(SharedSymbol {
                    name: name.to_string(),
                    arity,
                    quoted,
                    id,
                    reference_count: Cell::new(0),
                    usage: Cell::new(0),
                });

                if id == self.symbols.len() {
                    self.symbols.push(Some(symbol));
                } else {
                    self.symbols[id] = Some(symbol);
                }

                self.lookup.insert(
                    SymbolKey {
                        name: name.to_string(),
                        arity,
                        quoted,
                    },
                    id,
                );
                id
            }
        };

        let symbol = self.symbols[id].as_deref().expect("The lookup only contains live symbols");
        symbol.increment_reference();
        NonNull::from(symbol)
    }

    /// Removes the symbol with the given identifier, whose reference count
    /// must have dropped to zero.
    pub(crate) fn remove(&mut self, id: usize) {
        debug_assert!(id >= RESERVED_SYMBOLS.len(), "Reserved symbols are never removed");

        if let Some(symbol) = self.symbols[id].take() {
            debug_assert_eq!(symbol.reference_count(), 0, "Removed symbol {} is still referenced", symbol.name);
            self.lookup.remove(&SymbolLookup {
                name: &symbol.name,
                arity: symbol.arity,
                quoted: symbol.quoted,
            });
            self.free_ids.push(id);
        }
    }

    /// Returns the symbol with the given identifier, if it is alive.
    pub fn get(&self, id: usize) -> Option<&SharedSymbol> {
        self.symbols.get(id).and_then(|symbol| symbol.as_deref())
    }

    /// Returns the number of live symbols, including the reserved ones.
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    /// Returns true iff there are no symbols, which never holds since the
    /// reserved symbols always exist.
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Increments the usage counter of the symbol with the given identifier.
    pub fn increment_usage(&self, id: usize) {
        if let Some(symbol) = self.get(id) {
            symbol.usage.set(symbol.usage.get() + 1);
        }
    }

    /// Returns the usage counter of the symbol with the given identifier.
    pub fn usage(&self, id: usize) -> usize {
        self.get(id).map_or(0, |symbol| symbol.usage.get())
    }

    /// Resets the usage counters of all symbols.
    pub fn reset_usage(&self) {
        for symbol in self.symbols.iter().flatten() {
            symbol.usage.set(0);
        }
    }

    /// Returns the identifiers of all symbols with a non-zero usage counter in
    /// increasing order, and resets these counters.
    pub fn take_used(&self) -> Vec<usize> {
        self.symbols
            .iter()
            .flatten()
            .filter(|symbol| symbol.usage.replace(0) > 0)
            .map(|symbol| symbol.id)
            .collect()
    }
}

impl Drop for SymbolPool {
    fn drop(&mut self) {
        debug!("Dropping symbol pool with {} symbols", self.len());
    }
}

/// A function symbol with a name, an arity and whether its name is quoted.
#[derive(Debug)]
pub struct SharedSymbol {
    name: String,
    arity: usize,
    quoted: bool,
    id: usize,

    /// The number of handles and terms referring to this symbol.
    reference_count: Cell<usize>,

    /// A counter for clients that count occurrences of symbols, independent of the reference count.
    usage: Cell<usize>,
}

impl SharedSymbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn is_quoted(&self) -> bool {
        self.quoted
    }

    /// Returns the identifier of the symbol in its pool.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn reference_count(&self) -> usize {
        self.reference_count.get()
    }

    pub(crate) fn increment_reference(&self) {
        self.reference_count.set(self.reference_count.get() + 1);
    }

    /// Decrements the reference count and returns true iff it became zero.
    pub(crate) fn decrement_reference(&self) -> bool {
        let count = self.reference_count.get();
        debug_assert!(count > 0, "Symbol {} is released too often", self.name);
        self.reference_count.set(count - 1);
        count == 1
    }

    /// Returns true iff this is one of the symbols reserved for integers and lists.
    pub fn is_reserved(&self) -> bool {
        self.id < RESERVED_SYMBOLS.len()
    }
}

/// The key under which symbols are stored in the lookup table.
#[derive(PartialEq, Eq)]
struct SymbolKey {
    name: String,
    arity: usize,
    quoted: bool,
}

/// Borrowed version of [SymbolKey], used to look up symbols without allocating the name.
struct SymbolLookup<'a> {
    name: &'a str,
    arity: usize,
    quoted: bool,
}

impl Equivalent<SymbolKey> for SymbolLookup<'_> {
    fn equivalent(&self, key: &SymbolKey) -> bool {
        self.name == key.name && self.arity == key.arity && self.quoted == key.quoted
    }
}

/// These hash implementations must be the same for [SymbolKey] and [SymbolLookup].
impl Hash for SymbolKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.as_str().hash(state);
        self.arity.hash(state);
        self.quoted.hash(state);
    }
}

impl Hash for SymbolLookup<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.arity.hash(state);
        self.quoted.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_symbols() {
        let pool = SymbolPool::new();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.get(INT_SYMBOL).map(|s| s.name()), Some("<aterm_int>"));
        assert_eq!(pool.get(LIST_SYMBOL).map(|s| s.arity()), Some(2));
        assert!(pool.get(EMPTY_LIST_SYMBOL).is_some_and(|s| s.is_reserved()));
    }

    #[test]
    fn test_intern_and_reuse_identifiers() {
        let mut pool = SymbolPool::new();

        let f = pool.intern("f", 2, false);
        let f_again = pool.intern("f", 2, false);
        assert_eq!(f, f_again, "Identical content yields the identical symbol");

        let quoted = pool.intern("f", 2, true);
        assert_ne!(f, quoted, "Quotation is part of the content");

        let id = pool.get(3).map(|s| s.id());
        assert_eq!(id, Some(3));
        assert_eq!(pool.get(3).map(|s| s.reference_count()), Some(2));

        // Release both references to f.
        let symbol = pool.get(3).expect("f exists");
        assert!(!symbol.decrement_reference());
        assert!(symbol.decrement_reference());
        pool.remove(3);
        assert!(pool.get(3).is_none());

        let g = pool.intern("g", 0, false);
        assert_eq!(pool.get(3).map(|s| s.name()), Some("g"), "The identifier of f is reused");
        assert_eq!(NonNull::from(pool.get(3).expect("g exists")), g);
    }

    #[test]
    fn test_usage_counters() {
        let mut pool = SymbolPool::new();
        pool.intern("a", 0, false);
        pool.intern("b", 1, false);

        pool.increment_usage(4);
        pool.increment_usage(4);
        pool.increment_usage(INT_SYMBOL);
        assert_eq!(pool.usage(4), 2);

        assert_eq!(pool.take_used(), vec![INT_SYMBOL, 4]);
        assert_eq!(pool.usage(4), 0, "Taking the used symbols resets the counters");

        pool.increment_usage(3);
        pool.reset_usage();
        assert!(pool.take_used().is_empty());
    }
}
