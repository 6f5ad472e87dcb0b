//!
//! A view on list terms.
//!
#![forbid(unsafe_code)]

use std::fmt;

use delegate::delegate;

use crate::ATerm;
use crate::ATermArgs;
use crate::ATermRef;
use crate::SymbolRef;
use crate::Term;
use crate::TermIterator;
use crate::TermKind;
use crate::storage::SharedTerm;
use crate::storage::TermStore;

/// Represents a list of terms.
///
/// # Details
///
/// Internally, uses the reserved list constructor of arity two, where the
/// first argument is the head of the list and the second argument is the tail
/// of the list, and the reserved empty list constant.
pub struct ATermList<'s> {
    term: ATerm<'s>,
}

impl<'s> ATermList<'s> {
    /// Constructs the empty list.
    pub fn empty(store: &'s TermStore) -> Self {
        ATermList {
            term: store.empty_list(),
        }
    }

    /// Constructs a new list with the given item as the head and the current list as the tail.
    pub fn cons<'a, 'b>(&self, item: &impl Term<'a, 'b>) -> Self {
        ATermList {
            term: self.term.store().make_list_cons(item, &self.term),
        }
    }

    /// Returns true iff the list is empty.
    pub fn is_empty(&self) -> bool {
        self.term.is_empty_list()
    }

    /// Obtain the head, i.e. the first element, of the list.
    ///
    /// # Panics
    ///
    /// When the list is empty.
    pub fn head(&self) -> ATermRef<'_> {
        assert!(!self.is_empty(), "The empty list has no head");
        self.term.arg(0)
    }

    /// Obtain the tail, i.e. the remainder, of the list.
    ///
    /// # Panics
    ///
    /// When the list is empty.
    pub fn tail(&self) -> ATermList<'s> {
        assert!(!self.is_empty(), "The empty list has no tail");
        ATermList {
            term: self.term.store().owned(&self.term.arg(1)),
        }
    }

    /// Returns the number of elements, which takes time linear in the length.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns an iterator over all elements in the list.
    pub fn iter(&self) -> ATermListIter<'_> {
        ATermListIter::new(self.term.get())
    }

    /// Converts the list into a vector of owning handles.
    pub fn to_vec(&self) -> Vec<ATerm<'s>> {
        self.iter()
            .map(|element| self.term.store().owned(&element))
            .collect()
    }
}

impl<'s> TryFrom<ATerm<'s>> for ATermList<'s> {
    type Error = ATerm<'s>;

    /// Converts a list term into a list, returns the term itself when it is not a list.
    fn try_from(term: ATerm<'s>) -> Result<Self, Self::Error> {
        if term.is_list() { Ok(ATermList { term }) } else { Err(term) }
    }
}

impl<'s> From<ATermList<'s>> for ATerm<'s> {
    fn from(value: ATermList<'s>) -> Self {
        value.term
    }
}

impl<'s, 'a, 'b> Term<'a, 'b> for ATermList<'s>
where
    'b: 'a,
    's: 'a,
{
    delegate! {
        to self.term {
            fn protect(&self) -> ATerm<'a>;
            fn arg(&'b self, index: usize) -> ATermRef<'a>;
            fn arguments(&'b self) -> ATermArgs<'a>;
            fn copy(&'b self) -> ATermRef<'a>;
            fn get_head_symbol(&'b self) -> SymbolRef<'a>;
            fn iter(&'b self) -> TermIterator<'a>;
            fn index(&self) -> usize;
            fn shared(&self) -> SharedTerm;
            fn store(&self) -> &'a TermStore;
        }
    }
}

impl Clone for ATermList<'_> {
    fn clone(&self) -> Self {
        ATermList {
            term: self.term.clone(),
        }
    }
}

impl fmt::Display for ATermList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.term)
    }
}

impl fmt::Debug for ATermList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.term)
    }
}

/// An iterator over the elements of a list term.
pub struct ATermListIter<'a> {
    current: ATermRef<'a>,
}

impl<'a> ATermListIter<'a> {
    /// Iterates over the elements of the given list term.
    pub fn new(list: ATermRef<'a>) -> ATermListIter<'a> {
        debug_assert!(list.is_list(), "Term {list:?} is not a list");
        ATermListIter { current: list }
    }
}

impl<'a> Iterator for ATermListIter<'a> {
    type Item = ATermRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.kind() == TermKind::List {
            let head = self.current.arg(0);
            self.current = self.current.arg(1);
            Some(head)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;

    use super::*;

    #[test]
    fn test_list_operations() {
        let store = TermStore::new();

        let list = ATermList::empty(&store);
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);

        let one = store.make_int(1);
        let two = store.make_int(2);
        let list = list.cons(&two).cons(&one);
        assert_eq!(list.len(), 2);
        assert_eq!(list.head(), one.copy());
        assert_eq!(list.tail().head(), two.copy());
        assert_eq!(list.iter().map(|element| element.value()).collect_vec(), [1, 2]);

        let from_iter = store.make_list([one.copy(), two.copy()]);
        assert_eq!(list.copy(), from_iter.copy(), "Lists are maximally shared");
        assert_eq!(list.to_string(), "[1,2]");
    }

    #[test]
    fn test_try_from() {
        let store = TermStore::new();

        let list = ATermList::try_from(store.make_list([store.make_int(5)])).expect("A list term");
        assert_eq!(list.to_vec(), [store.make_int(5)]);

        assert!(ATermList::try_from(store.make_int(5)).is_err());
    }
}
