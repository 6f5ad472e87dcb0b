use std::ptr::NonNull;

use log::debug;

use sharc_number::round_up_to_power_of_two;
use sharc_unsafety::BlockAllocator;

use crate::storage::HEADER_WORDS;
use crate::storage::INT_SYMBOL;
use crate::storage::SharedSymbol;
use crate::storage::SharedTerm;
use crate::storage::SymbolPool;
use crate::storage::payload_words;
use crate::storage::term_hash;

/// The intern table of a term store, which guarantees that every term exists
/// at most once.
///
/// # Details
///
/// The table is an array of buckets whose length is a power of two. Every
/// bucket is the head of a chain of terms with the same masked hash, linked
/// through the header of the terms themselves. A hit on lookup is moved to
/// the front of its chain. The table doubles its number of buckets when the
/// load exceeds the maximum load factor, which is only checked when the
/// allocator had to create a new block.
pub(crate) struct TermPool {
    allocator: BlockAllocator,
    buckets: Vec<Option<SharedTerm>>,

    /// The number of terms in the table.
    len: usize,
    max_load_factor: f64,

    /// Terms whose reference count dropped to zero, reused between reclamations.
    work_list: Vec<SharedTerm>,
}

impl TermPool {
    pub(crate) fn new(initial_table_size: usize, max_load_factor: f64, block_words: usize) -> TermPool {
        debug_assert!(max_load_factor > 0.0, "The maximum load factor must be positive");

        TermPool {
            allocator: BlockAllocator::new(HEADER_WORDS, block_words),
            buckets: vec![None; round_up_to_power_of_two(initial_table_size.max(1))],
            len: 0,
            max_load_factor,
            work_list: Vec::new(),
        }
    }

    /// Returns the term with the given symbol and payload, creating it when it
    /// does not exist yet. The caller obtains one reference to the result.
    ///
    /// For a new term the reference counts of the arguments and the symbol are
    /// incremented. The payload consists of argument addresses, or of the
    /// value for integer terms.
    pub(crate) fn create(&mut self, symbol: NonNull<SharedSymbol>, payload: &[u64]) -> SharedTerm {
        // Safety: the caller holds a handle to the symbol, so it is alive.
        let shared_symbol = unsafe { symbol.as_ref() };
        debug_assert_eq!(payload.len(), payload_words(shared_symbol), "Payload size does not match the symbol");

        let bucket = self.bucket(term_hash(shared_symbol.id(), payload.iter().copied()));
        if let Some(term) = self.find(bucket, symbol, payload) {
            term.increment_reference();
            return term;
        }

        let (slot, grown) = self.allocator.allocate(payload.len());
        let term = SharedTerm::from_slot(slot);
        term.initialise(symbol, payload, self.buckets[bucket]);
        self.buckets[bucket] = Some(term);
        self.len += 1;

        shared_symbol.increment_reference();
        if shared_symbol.id() != INT_SYMBOL {
            for index in 0..payload.len() {
                term.argument(index).increment_reference();
            }
        }

        if grown && self.len as f64 > self.buckets.len() as f64 * self.max_load_factor {
            self.resize();
        }

        term
    }

    /// Reclaims the given term, whose reference count dropped to zero, and
    /// every subterm that becomes unreferenced as a consequence.
    ///
    /// Uses an explicit work list, so arbitrarily deep terms can be reclaimed.
    pub(crate) fn reclaim(&mut self, term: SharedTerm, symbols: &mut SymbolPool) {
        debug_assert_eq!(term.reference_count(), 0, "Only unreferenced terms can be reclaimed");
        self.work_list.push(term);

        while let Some(term) = self.work_list.pop() {
            let symbol = term.symbol();
            let id = symbol.id();
            let size_class = payload_words(symbol);

            self.unlink(term);

            if id != INT_SYMBOL {
                for index in 0..size_class {
                    let argument = term.argument(index);
                    if argument.decrement_reference() {
                        self.work_list.push(argument);
                    }
                }
            }

            if symbol.decrement_reference() {
                symbols.remove(id);
            }

            // Safety: the term is unreachable from the table and has no references.
            unsafe { self.allocator.deallocate(term.slot(), size_class) };
        }
    }

    /// Returns true iff the address is the address of a term in this pool.
    pub(crate) fn is_live(&self, address: usize) -> bool {
        self.allocator.is_live(address)
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn number_of_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn allocator(&self) -> &BlockAllocator {
        &self.allocator
    }

    /// Returns the chain of the bucket that contains the given term, starting at its head.
    pub(crate) fn chain(&self, term: SharedTerm) -> Vec<SharedTerm> {
        let mut result = Vec::new();
        let mut current = self.buckets[self.bucket(term.structural_hash())];
        while let Some(node) = current {
            result.push(node);
            current = node.next();
        }
        result
    }

    fn bucket(&self, hash: u64) -> usize {
        hash as usize & (self.buckets.len() - 1)
    }

    /// Finds the term in the chain of the given bucket, and promotes it to the head of the chain.
    fn find(&mut self, bucket: usize, symbol: NonNull<SharedSymbol>, payload: &[u64]) -> Option<SharedTerm> {
        let mut previous: Option<SharedTerm> = None;
        let mut current = self.buckets[bucket];

        while let Some(term) = current {
            if term.matches(symbol, payload) {
                if let Some(previous) = previous {
                    previous.set_next(term.next());
                    term.set_next(self.buckets[bucket]);
                    self.buckets[bucket] = Some(term);
                }
                return Some(term);
            }

            previous = current;
            current = term.next();
        }

        None
    }

    /// Removes the term from its bucket chain.
    fn unlink(&mut self, term: SharedTerm) {
        let bucket = self.bucket(term.structural_hash());

        let mut previous: Option<SharedTerm> = None;
        let mut current = self.buckets[bucket];
        while let Some(node) = current {
            if node == term {
                match previous {
                    Some(previous) => previous.set_next(node.next()),
                    None => self.buckets[bucket] = node.next(),
                }

                self.len -= 1;
                return;
            }

            previous = current;
            current = node.next();
        }

        panic!("Term {term:?} is not in the table");
    }

    /// Doubles the number of buckets and redistributes all terms.
    fn resize(&mut self) {
        let size = self.buckets.len() * 2;
        let old = std::mem::replace(&mut self.buckets, vec![None; size]);
        debug!("Resizing the term table from {} to {} buckets", old.len(), self.buckets.len());

        for head in old {
            let mut current = head;
            while let Some(term) = current {
                current = term.next();

                let bucket = self.bucket(term.structural_hash());
                term.set_next(self.buckets[bucket]);
                self.buckets[bucket] = Some(term);
            }
        }
    }
}
