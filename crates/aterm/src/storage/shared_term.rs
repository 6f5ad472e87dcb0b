use std::fmt;
use std::hash::Hasher;
use std::ptr::NonNull;

use rustc_hash::FxHasher;

use sharc_unsafety::SlotPointer;

use crate::storage::INT_SYMBOL;
use crate::storage::SharedSymbol;

/// The number of words in front of the payload of every term slot.
pub(crate) const HEADER_WORDS: usize = 3;

/// Word holding the address of the [SharedSymbol].
const SYMBOL: usize = 0;

/// Word holding the reference count.
const REFERENCE_COUNT: usize = 1;

/// Word holding the address of the next term in the same bucket, or zero.
const NEXT: usize = 2;

/// A term node stored in a slot of the block allocator.
///
/// # Details
///
/// The slot starts with [HEADER_WORDS] header words: the address of the head
/// symbol, the reference count and the intrusive link of the bucket chain in
/// the term pool. The payload follows, which consists of the addresses of the
/// arguments, or the two's complement value for integer terms.
///
/// Every method assumes that the slot belongs to a live term pool and holds a
/// term, which is guaranteed for all instances that are reachable from term
/// handles or from the intern table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SharedTerm(SlotPointer);

impl SharedTerm {
    pub(crate) fn from_slot(slot: SlotPointer) -> SharedTerm {
        SharedTerm(slot)
    }

    pub(crate) fn slot(self) -> SlotPointer {
        self.0
    }

    /// Returns the address of the node, which identifies the term.
    pub fn address(self) -> usize {
        self.0.address()
    }

    /// Returns the head symbol.
    pub fn symbol<'a>(self) -> &'a SharedSymbol {
        let address = self.word(SYMBOL).get() as usize;

        // Safety: a term keeps its symbol alive, and symbols are boxed so their address is stable.
        unsafe { &*std::ptr::with_exposed_provenance::<SharedSymbol>(address) }
    }

    /// Returns the raw symbol word, used to compare symbols without dereferencing them.
    pub(crate) fn symbol_address(self) -> u64 {
        self.word(SYMBOL).get()
    }

    /// Returns the number of payload words, which is the size class of the slot.
    pub(crate) fn payload_words(self) -> usize {
        payload_words(self.symbol())
    }

    pub(crate) fn payload(self, index: usize) -> u64 {
        self.word(HEADER_WORDS + index).get()
    }

    /// Returns the argument at the given index.
    pub(crate) fn argument(self, index: usize) -> SharedTerm {
        debug_assert!(index < self.symbol().arity(), "Argument {index} out of bounds");
        Self::from_address(self.payload(index))
    }

    /// Returns the value of an integer term.
    pub(crate) fn value(self) -> i64 {
        debug_assert_eq!(self.symbol().id(), INT_SYMBOL);
        self.payload(0) as i64
    }

    pub(crate) fn reference_count(self) -> u64 {
        self.word(REFERENCE_COUNT).get()
    }

    pub(crate) fn increment_reference(self) {
        let count = self.word(REFERENCE_COUNT);
        count.set(count.get() + 1);
    }

    /// Decrements the reference count and returns true iff it became zero.
    pub(crate) fn decrement_reference(self) -> bool {
        let count = self.word(REFERENCE_COUNT);
        debug_assert!(count.get() > 0, "Term {self:?} is released too often");
        count.set(count.get() - 1);
        count.get() == 0
    }

    pub(crate) fn next(self) -> Option<SharedTerm> {
        let next = self.word(NEXT).get();
        (next != 0).then(|| Self::from_address(next))
    }

    pub(crate) fn set_next(self, next: Option<SharedTerm>) {
        self.word(NEXT).set(next.map_or(0, |term| term.address() as u64));
    }

    /// Initialises a freshly allocated slot.
    pub(crate) fn initialise(self, symbol: NonNull<SharedSymbol>, payload: &[u64], next: Option<SharedTerm>) {
        self.word(SYMBOL).set(symbol.as_ptr().expose_provenance() as u64);
        self.word(REFERENCE_COUNT).set(1);
        self.set_next(next);

        for (index, value) in payload.iter().enumerate() {
            self.word(HEADER_WORDS + index).set(*value);
        }
    }

    /// Returns true iff this node has the given symbol and payload.
    pub(crate) fn matches(self, symbol: NonNull<SharedSymbol>, payload: &[u64]) -> bool {
        self.symbol_address() == symbol.as_ptr().expose_provenance() as u64
            && payload
                .iter()
                .enumerate()
                .all(|(index, value)| self.payload(index) == *value)
    }

    /// Returns the structural hash of the node, see [term_hash].
    pub(crate) fn structural_hash(self) -> u64 {
        let words = self.payload_words();
        term_hash(self.symbol().id(), (0..words).map(|index| self.payload(index)))
    }

    fn from_address(address: u64) -> SharedTerm {
        // Safety: addresses in term words are always obtained from slots of the same allocator.
        let slot = unsafe { SlotPointer::from_address(address as usize) };
        SharedTerm(slot.expect("Term addresses are never zero"))
    }

    fn word<'a>(self, index: usize) -> &'a sharc_unsafety::Word {
        debug_assert!(index < HEADER_WORDS || index - HEADER_WORDS < self.payload_words_unchecked());

        // Safety: the index lies within the slot, see the type documentation.
        unsafe { self.0.word(index) }
    }

    /// Only used for bounds checks, reads the symbol without going through [SharedTerm::word].
    fn payload_words_unchecked(self) -> usize {
        let address = unsafe { self.0.word(SYMBOL).get() } as usize;
        payload_words(unsafe { &*std::ptr::with_exposed_provenance::<SharedSymbol>(address) })
    }
}

/// Returns the number of payload words of a term with the given head symbol.
pub(crate) fn payload_words(symbol: &SharedSymbol) -> usize {
    if symbol.id() == INT_SYMBOL { 1 } else { symbol.arity() }
}

/// The structural hash of a term: its symbol identifier combined with the
/// addresses of its arguments, which are canonical themselves, or its value.
pub(crate) fn term_hash(symbol_id: usize, payload: impl Iterator<Item = u64>) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_usize(symbol_id);
    for word in payload {
        hasher.write_u64(word);
    }
    hasher.finish()
}

impl fmt::Debug for SharedTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedTerm({:?})", self.0)
    }
}
