use std::cell::Ref;
use std::cell::RefCell;
use std::fmt;
use std::ptr::NonNull;

use log::debug;
use smallvec::SmallVec;

use sharc_io::BytesFormatter;
use sharc_io::LargeFormatter;
use sharc_unsafety::DEFAULT_BLOCK_WORDS;

use crate::ATerm;
use crate::ATermRef;
use crate::Symb;
use crate::Symbol;
use crate::SymbolRef;
use crate::Term;
use crate::storage::EMPTY_LIST_SYMBOL;
use crate::storage::INT_SYMBOL;
use crate::storage::LIST_SYMBOL;
use crate::storage::ProtectionIndex;
use crate::storage::ProtectionSet;
use crate::storage::SharedSymbol;
use crate::storage::SharedTerm;
use crate::storage::SymbolPool;
use crate::storage::TermPool;

/// The payload of a term under construction, most terms have a small arity.
type Payload = SmallVec<[u64; 8]>;

/// Configuration of a [TermStore].
#[derive(Clone, Debug)]
pub struct TermStoreConfig {
    /// The initial number of buckets of the intern table, rounded up to a power of two.
    pub initial_table_size: usize,

    /// The table doubles when it contains more than `buckets * max_load_factor` terms.
    pub max_load_factor: f64,

    /// The number of words in a block of the allocator.
    pub block_words: usize,
}

impl Default for TermStoreConfig {
    fn default() -> Self {
        TermStoreConfig {
            initial_table_size: 1 << 12,
            max_load_factor: 0.75,
            block_words: DEFAULT_BLOCK_WORDS,
        }
    }
}

/// The store in which all terms and symbols live, which guarantees maximal
/// sharing: two terms with the same content are the same node.
///
/// # Details
///
/// Terms and symbols are reference counted by their handles, see [ATerm] and
/// [Symbol], whose lifetimes are bound to the store. A term is reclaimed as
/// soon as the last reference to it disappears.
///
/// The store is not thread-safe. The symbol pool must not be borrowed through
/// [TermStore::symbol_pool] while handles are dropped.
pub struct TermStore {
    storage: RefCell<Storage>,
    protection_set: RefCell<ProtectionSet<SharedTerm>>,

    int_symbol: NonNull<SharedSymbol>,
    list_symbol: NonNull<SharedSymbol>,
    empty_list_symbol: NonNull<SharedSymbol>,

    /// The empty list, which is kept alive by the store itself.
    empty_list: SharedTerm,
}

struct Storage {
    symbols: SymbolPool,
    terms: TermPool,
}

impl TermStore {
    /// Creates a store with the default configuration.
    pub fn new() -> TermStore {
        Self::with_config(TermStoreConfig::default())
    }

    pub fn with_config(config: TermStoreConfig) -> TermStore {
        let symbols = SymbolPool::new();
        let mut terms = TermPool::new(config.initial_table_size, config.max_load_factor, config.block_words);

        let reserved = |id: usize| NonNull::from(symbols.get(id).expect("Reserved symbols always exist"));
        let int_symbol = reserved(INT_SYMBOL);
        let list_symbol = reserved(LIST_SYMBOL);
        let empty_list_symbol = reserved(EMPTY_LIST_SYMBOL);

        let empty_list = terms.create(empty_list_symbol, &[]);

        TermStore {
            storage: RefCell::new(Storage { symbols, terms }),
            protection_set: RefCell::new(ProtectionSet::new()),
            int_symbol,
            list_symbol,
            empty_list_symbol,
            empty_list,
        }
    }

    /// Returns the symbol with the given name, arity and quotation, creating it when necessary.
    pub fn symbol(&self, name: impl AsRef<str>, arity: usize, quoted: bool) -> Symbol<'_> {
        let shared = self.storage.borrow_mut().symbols.intern(name.as_ref(), arity, quoted);
        Symbol::from_shared(self, shared)
    }

    /// The symbol of integer terms.
    pub fn int_symbol(&self) -> SymbolRef<'_> {
        SymbolRef::from_shared(self, self.int_symbol)
    }

    /// The symbol of non-empty list nodes.
    pub fn list_symbol(&self) -> SymbolRef<'_> {
        SymbolRef::from_shared(self, self.list_symbol)
    }

    /// The symbol of the empty list.
    pub fn empty_list_symbol(&self) -> SymbolRef<'_> {
        SymbolRef::from_shared(self, self.empty_list_symbol)
    }

    /// Creates an integer term.
    pub fn make_int(&self, value: i64) -> ATerm<'_> {
        self.create(self.int_symbol, &[value as u64])
    }

    /// Creates the application of the symbol to the given arguments.
    ///
    /// # Panics
    ///
    /// When the number of arguments differs from the arity of the symbol, or
    /// when the symbol is one of the reserved symbols for integers and lists.
    pub fn make_application<'a, 'b, 'c, 'd>(
        &self,
        symbol: &'b impl Symb<'a, 'b>,
        args: &[impl Term<'c, 'd>],
    ) -> ATerm<'_> {
        assert_eq!(
            symbol.arity(),
            args.len(),
            "Symbol {} has arity {} but {} arguments were given",
            symbol.name(),
            symbol.arity(),
            args.len()
        );
        assert!(
            !symbol.is_reserved(),
            "Reserved symbol {} cannot be used as an application",
            symbol.name()
        );
        debug_assert!(
            args.iter().all(|arg| std::ptr::eq(arg.store(), self)),
            "Arguments belong to another store"
        );

        let payload: Payload = args.iter().map(|arg| arg.shared().address() as u64).collect();
        self.create(symbol.shared(), &payload)
    }

    /// Creates the application of the symbol to the arguments produced by the iterator.
    pub fn make_application_iter<'a, 'b, 'c, 'd, I, T>(&self, symbol: &'b impl Symb<'a, 'b>, iter: I) -> ATerm<'_>
    where
        I: IntoIterator<Item = T>,
        T: Term<'c, 'd>,
    {
        // The arguments must stay alive until the term holds them.
        let args: Vec<T> = iter.into_iter().collect();
        self.make_application(symbol, &args)
    }

    /// Creates a constant, i.e., an application of a symbol with arity zero.
    pub fn make_constant<'a, 'b>(&self, symbol: &'b impl Symb<'a, 'b>) -> ATerm<'_> {
        let args: &[ATermRef<'_>] = &[];
        self.make_application(symbol, args)
    }

    /// Creates the list with the given head and tail.
    pub fn make_list_cons<'a, 'b, 'c, 'd>(&self, head: &impl Term<'a, 'b>, tail: &impl Term<'c, 'd>) -> ATerm<'_> {
        debug_assert!(tail.is_list(), "The tail {:?} of a list must be a list", tail.shared());
        self.create(
            self.list_symbol,
            &[head.shared().address() as u64, tail.shared().address() as u64],
        )
    }

    /// Creates the list containing the elements produced by the iterator, in order.
    pub fn make_list<'a, 'b, I, T>(&self, iter: I) -> ATerm<'_>
    where
        I: IntoIterator<Item = T>,
        T: Term<'a, 'b>,
    {
        let elements: Vec<T> = iter.into_iter().collect();

        let mut list = self.empty_list();
        for element in elements.iter().rev() {
            list = self.make_list_cons(element, &list);
        }
        list
    }

    /// Returns the empty list.
    pub fn empty_list(&self) -> ATerm<'_> {
        self.empty_list.increment_reference();
        ATerm::from_shared(self, self.empty_list)
    }

    /// Returns the term in which the argument at the given index is replaced
    /// by `new_child`. For lists index 0 is the head and index 1 the tail.
    ///
    /// # Panics
    ///
    /// When the term is an integer or the index is out of bounds.
    pub fn set_argument<'a, 'b, 'c, 'd>(
        &self,
        term: &impl Term<'a, 'b>,
        index: usize,
        new_child: &impl Term<'c, 'd>,
    ) -> ATerm<'_> {
        let shared = term.shared();
        let symbol = shared.symbol();

        assert!(symbol.id() != INT_SYMBOL, "Integer terms have no arguments");
        assert!(
            index < symbol.arity(),
            "Index {index} is out of bounds for a term with arity {}",
            symbol.arity()
        );
        debug_assert!(
            symbol.id() != LIST_SYMBOL || index == 0 || new_child.is_list(),
            "The tail of a list must be a list"
        );

        let payload: Payload = (0..symbol.arity())
            .map(|i| {
                if i == index {
                    new_child.shared().address() as u64
                } else {
                    shared.payload(i)
                }
            })
            .collect();
        self.create(NonNull::from(symbol), &payload)
    }

    /// Returns an owning handle to the term whose lifetime is only bound by the store.
    ///
    /// Handles obtained through [Term::protect] are bound by the lifetime of the
    /// term they were derived from.
    pub fn owned<'a, 'b>(&self, term: &impl Term<'a, 'b>) -> ATerm<'_> {
        debug_assert!(std::ptr::eq(term.store(), self), "The term belongs to another store");
        let shared = term.shared();
        shared.increment_reference();
        ATerm::from_shared(self, shared)
    }

    /// Registers the term as a root, which keeps it alive until [TermStore::unprotect] is called.
    pub fn protect<'a, 'b>(&self, term: &impl Term<'a, 'b>) -> ProtectionIndex {
        let shared = term.shared();
        shared.increment_reference();
        self.protection_set.borrow_mut().protect(shared)
    }

    /// Releases a root registered by [TermStore::protect].
    ///
    /// # Panics
    ///
    /// When the index does not refer to a registered root.
    pub fn unprotect(&self, index: ProtectionIndex) {
        let shared = self.protection_set.borrow_mut().unprotect(index);
        self.release(shared);
    }

    /// Returns a handle to a registered root.
    pub fn protected(&self, index: ProtectionIndex) -> ATerm<'_> {
        let shared = self.protection_set.borrow()[index];
        shared.increment_reference();
        ATerm::from_shared(self, shared)
    }

    /// Returns true iff the address is the address of a term in this store, see [Term::index].
    pub fn is_live_term(&self, address: usize) -> bool {
        self.storage.borrow().terms.is_live(address)
    }

    /// Returns the indices of the terms in the same bucket as the given term, starting at the head of the chain.
    pub fn bucket_chain<'a, 'b>(&self, term: &impl Term<'a, 'b>) -> Vec<usize> {
        self.storage
            .borrow()
            .terms
            .chain(term.shared())
            .into_iter()
            .map(|term| term.address())
            .collect()
    }

    /// Provides read access to the symbol pool.
    pub fn symbol_pool(&self) -> Ref<'_, SymbolPool> {
        Ref::map(self.storage.borrow(), |storage| &storage.symbols)
    }

    /// Returns statistics about the store.
    pub fn metrics(&self) -> TermStoreMetrics {
        let storage = self.storage.borrow();
        let allocator = storage.terms.allocator();

        TermStoreMetrics {
            terms: storage.terms.len(),
            symbols: storage.symbols.len(),
            buckets: storage.terms.number_of_buckets(),
            slots_in_use: allocator.total_in_use(),
            blocks: allocator.number_of_blocks(),
            allocated_bytes: allocator.allocated_bytes(),
            roots: self.protection_set.borrow().len(),
        }
    }

    /// Returns the term with the given symbol and payload, owning one reference.
    pub(crate) fn create(&self, symbol: NonNull<SharedSymbol>, payload: &[u64]) -> ATerm<'_> {
        let term = self.storage.borrow_mut().terms.create(symbol, payload);
        ATerm::from_shared(self, term)
    }

    /// Releases one reference to the term, and reclaims it when that was the last one.
    pub(crate) fn release(&self, term: SharedTerm) {
        if term.decrement_reference() {
            let mut storage = self.storage.borrow_mut();
            let Storage { symbols, terms } = &mut *storage;
            terms.reclaim(term, symbols);
        }
    }

    /// Releases one reference to the symbol, and removes it when that was the last one.
    pub(crate) fn release_symbol(&self, symbol: NonNull<SharedSymbol>) {
        // Safety: the caller owned a reference, so the symbol is still alive.
        let shared = unsafe { symbol.as_ref() };
        let id = shared.id();
        if shared.decrement_reference() {
            self.storage.borrow_mut().symbols.remove(id);
        }
    }
}

impl Default for TermStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TermStore {
    fn drop(&mut self) {
        debug!("Dropping term store: {}", self.metrics());
    }
}

/// Statistics of a [TermStore].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TermStoreMetrics {
    /// The number of terms in the intern table.
    pub terms: usize,
    pub symbols: usize,
    pub buckets: usize,
    pub slots_in_use: usize,
    pub blocks: usize,
    pub allocated_bytes: usize,

    /// The number of roots registered through [TermStore::protect].
    pub roots: usize,
}

impl fmt::Display for TermStoreMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} terms, {} symbols, {} buckets, {} roots, {} blocks ({})",
            LargeFormatter(self.terms),
            LargeFormatter(self.symbols),
            LargeFormatter(self.buckets),
            LargeFormatter(self.roots),
            LargeFormatter(self.blocks),
            BytesFormatter(self.allocated_bytes)
        )
    }
}

#[cfg(test)]
mod tests {
    use sharc_utilities::test_logger;

    use crate::TermKind;

    use super::*;

    #[test]
    fn test_maximal_sharing() {
        test_logger();
        let store = TermStore::new();

        let f = store.symbol("f", 2, false);
        let a = store.make_constant(&store.symbol("a", 0, false));
        let one = store.make_int(1);

        let t1 = store.make_application(&f, &[a.copy(), one.copy()]);
        let t2 = store.make_application(&f, &[a.copy(), one.copy()]);
        assert_eq!(t1, t2, "The same content yields the same term");
        assert_eq!(t1.index(), t2.index());

        let t3 = store.make_application(&f, &[one.copy(), a.copy()]);
        assert_ne!(t1, t3);
    }

    #[test]
    fn test_reserved_terms() {
        let store = TermStore::new();

        assert_eq!(store.empty_list(), store.empty_list());
        assert_eq!(store.empty_list().kind(), TermKind::EmptyList);
        assert_eq!(store.make_int(-5).value(), -5);
        assert_eq!(store.make_int(i64::MIN).kind(), TermKind::Int);
    }

    #[test]
    #[should_panic(expected = "arity")]
    fn test_arity_mismatch() {
        let store = TermStore::new();
        let f = store.symbol("f", 2, false);
        let a = store.make_int(1);
        store.make_application(&f, &[a]);
    }

    #[test]
    #[should_panic(expected = "Reserved symbol")]
    fn test_reserved_application() {
        let store = TermStore::new();
        let list = store.list_symbol();
        let a = store.make_int(1);
        let empty = store.empty_list();
        store.make_application(&list, &[a.copy(), empty.copy()]);
    }

    #[test]
    fn test_set_argument() {
        let store = TermStore::new();
        let f = store.symbol("f", 3, false);
        let args = [store.make_int(1), store.make_int(2), store.make_int(3)];
        let term = store.make_application(&f, &args);

        let four = store.make_int(4);
        let replaced = store.set_argument(&term, 1, &four);
        assert_eq!(replaced.arg(0), args[0].copy(), "Other arguments keep their identity");
        assert_eq!(replaced.arg(1), four.copy());
        assert_eq!(replaced.arg(2), args[2].copy());

        let list = store.make_list([store.make_int(1)]);
        let head = store.set_argument(&list, 0, &four);
        assert_eq!(head.arg(0).value(), 4);
        assert_eq!(head.arg(1), store.empty_list().copy());
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_set_argument_out_of_bounds() {
        let store = TermStore::new();
        let a = store.make_constant(&store.symbol("a", 0, false));
        store.set_argument(&a, 0, &a);
    }

    #[test]
    fn test_move_to_front() {
        let store = TermStore::with_config(TermStoreConfig {
            initial_table_size: 1,
            max_load_factor: 1000.0,
            ..TermStoreConfig::default()
        });

        let a = store.make_constant(&store.symbol("a", 0, false));
        let b = store.make_constant(&store.symbol("b", 0, false));
        let c = store.make_constant(&store.symbol("c", 0, false));

        let chain = store.bucket_chain(&a);
        assert_eq!(chain[0], c.index(), "New terms are inserted at the head");

        let a_again = store.make_constant(&store.symbol("a", 0, false));
        assert_eq!(a_again, a);

        let chain = store.bucket_chain(&a);
        assert_eq!(chain[0], a.index(), "A hit is promoted to the head");
        assert!(chain.contains(&b.index()));
        assert!(chain.contains(&c.index()));
    }

    #[test]
    fn test_resize_keeps_terms() {
        let store = TermStore::with_config(TermStoreConfig {
            initial_table_size: 2,
            max_load_factor: 0.5,
            block_words: 64,
        });

        let f = store.symbol("f", 1, false);
        let mut terms = vec![store.make_int(0)];
        for _ in 0..1000 {
            let next = store.make_application(&f, &[terms[terms.len() - 1].copy()]);
            terms.push(next);
        }

        assert!(store.metrics().buckets > 2, "The table has grown");

        let mut current = store.make_int(0);
        for term in &terms[1..] {
            current = store.make_application(&f, &[current]);
            assert_eq!(current, *term, "Every term is found after resizing");
        }
    }

    #[test]
    fn test_protection() {
        let store = TermStore::new();
        let initial = store.metrics();

        let index = {
            let f = store.symbol("f", 1, false);
            let term = store.make_application(&f, &[store.make_int(42)]);
            store.protect(&term)
        };

        let term = store.protected(index);
        assert_eq!(term.arg(0).value(), 42);
        assert!(store.is_live_term(term.index()));
        drop(term);

        store.unprotect(index);

        let metrics = store.metrics();
        assert_eq!(metrics.terms, initial.terms, "All terms are reclaimed");
        assert_eq!(metrics.slots_in_use, initial.slots_in_use);
        assert_eq!(metrics.symbols, initial.symbols, "The symbol f is removed");
        assert_eq!(metrics.roots, 0);
    }
}
