use std::cmp::Ordering;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use delegate::delegate;

use crate::Symb;
use crate::SymbolRef;
use crate::storage::EMPTY_LIST_SYMBOL;
use crate::storage::INT_SYMBOL;
use crate::storage::LIST_SYMBOL;
use crate::storage::SharedTerm;
use crate::storage::TermStore;

/// The variants of a term.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TermKind {
    /// A 64-bit integer.
    Int,
    /// The empty list `[]`.
    EmptyList,
    /// A list node with a head and a tail.
    List,
    /// The application of a function symbol to its arguments.
    Application,
}

/// The ATerm trait represents a first-order term in the ATerm library.
/// It provides methods to manipulate and access the term's properties.
///
/// # Details
///
/// This trait is rather complicated with two lifetimes, but this is used
/// to support both the [ATerm], which owns a reference to its term, and
/// [ATermRef<'a>] whose lifetime is bound by `'a`. Because now we can require
/// that `'b: 'a` for the implementation of [Term<'a, 'b>] for [ATerm], we can
/// safely return [ATermRef<'a>] from methods of [Term<'a, 'b>].
pub trait Term<'a, 'b> {
    /// Obtains an owning handle to the term.
    fn protect(&self) -> ATerm<'a>;

    /// Returns the indexed argument of the term
    fn arg(&'b self, index: usize) -> ATermRef<'a>;

    /// Returns the list of arguments as a collection
    fn arguments(&'b self) -> ATermArgs<'a>;

    /// Makes a copy of the term with the same lifetime as itself.
    fn copy(&'b self) -> ATermRef<'a>;

    /// Returns the function symbol of the term
    fn get_head_symbol(&'b self) -> SymbolRef<'a>;

    /// Returns an iterator over all subterms of the term that runs in preorder traversal of the term tree.
    fn iter(&'b self) -> TermIterator<'a>;

    /// Returns a unique index of the term in its store, which is the address of its node.
    fn index(&self) -> usize;

    /// Returns the node of the term in the store.
    fn shared(&self) -> SharedTerm;

    /// Returns the store in which the term lives.
    fn store(&self) -> &'a TermStore;

    /// Returns the variant of the term.
    fn kind(&self) -> TermKind {
        match self.shared().symbol().id() {
            INT_SYMBOL => TermKind::Int,
            EMPTY_LIST_SYMBOL => TermKind::EmptyList,
            LIST_SYMBOL => TermKind::List,
            _ => TermKind::Application,
        }
    }

    /// Returns the number of arguments, which is zero for integers.
    fn arity(&self) -> usize {
        self.shared().symbol().arity()
    }

    fn is_int(&self) -> bool {
        self.kind() == TermKind::Int
    }

    /// Returns true iff the term is a list, which includes the empty list.
    fn is_list(&self) -> bool {
        matches!(self.kind(), TermKind::List | TermKind::EmptyList)
    }

    fn is_empty_list(&self) -> bool {
        self.kind() == TermKind::EmptyList
    }

    fn is_application(&self) -> bool {
        self.kind() == TermKind::Application
    }

    /// Returns the value of an integer term.
    ///
    /// # Panics
    ///
    /// When the term is not an integer.
    fn value(&self) -> i64 {
        self.as_int()
            .unwrap_or_else(|| panic!("Term {:?} is not an integer", self.shared()))
    }

    /// Returns the value if the term is an integer.
    fn as_int(&self) -> Option<i64> {
        self.is_int().then(|| self.shared().value())
    }
}

/// This represents a lifetime bound reference to an existing [ATerm].
///
/// A reference cannot outlive the handle it was obtained from.
///
/// ```compile_fail
/// use sharc_aterm::Term;
/// use sharc_aterm::TermStore;
///
/// let store = TermStore::new();
/// let reference = {
///     let term = store.make_int(1);
///     term.copy()
/// };
/// println!("{reference}");
/// ```
#[derive(Clone, Copy)]
pub struct ATermRef<'a> {
    store: &'a TermStore,
    shared: SharedTerm,
}

impl<'a> ATermRef<'a> {
    /// Creates a reference to a term that is kept alive for the lifetime `'a`.
    pub(crate) fn from_shared(store: &'a TermStore, shared: SharedTerm) -> ATermRef<'a> {
        ATermRef { store, shared }
    }
}

impl<'a, 'b> Term<'a, 'b> for ATermRef<'a> {
    fn protect(&self) -> ATerm<'a> {
        self.shared.increment_reference();
        ATerm::from_shared(self.store, self.shared)
    }

    fn arg(&self, index: usize) -> ATermRef<'a> {
        assert!(
            index < self.arity(),
            "arg({index}) is not defined for term {self:?}"
        );

        ATermRef::from_shared(self.store, self.shared.argument(index))
    }

    fn arguments(&self) -> ATermArgs<'a> {
        ATermArgs::new(*self)
    }

    fn copy(&self) -> ATermRef<'a> {
        *self
    }

    fn get_head_symbol(&self) -> SymbolRef<'a> {
        SymbolRef::from_shared(self.store, std::ptr::NonNull::from(self.shared.symbol()))
    }

    fn iter(&self) -> TermIterator<'a> {
        TermIterator::new(*self)
    }

    fn index(&self) -> usize {
        self.shared.address()
    }

    fn shared(&self) -> SharedTerm {
        self.shared
    }

    fn store(&self) -> &'a TermStore {
        self.store
    }
}

impl PartialEq for ATermRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.shared == other.shared
    }
}

impl Eq for ATermRef<'_> {}

impl Hash for ATermRef<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shared.hash(state)
    }
}

impl PartialOrd for ATermRef<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ATermRef<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.shared.cmp(&other.shared)
    }
}

impl fmt::Display for ATermRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Parts of a term that remain to be printed.
enum Print<'a> {
    Term(ATermRef<'a>),
    Text(&'static str),
}

impl fmt::Debug for ATermRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Printing uses an explicit stack, so deeply nested terms can be printed.
        let mut stack = vec![Print::Term(*self)];

        while let Some(item) = stack.pop() {
            let term = match item {
                Print::Term(term) => term,
                Print::Text(text) => {
                    write!(f, "{text}")?;
                    continue;
                }
            };

            match term.kind() {
                TermKind::Int => write!(f, "{}", term.value())?,
                TermKind::EmptyList => write!(f, "[]")?,
                TermKind::List => {
                    write!(f, "[")?;

                    let mut elements = Vec::new();
                    let mut current = term;
                    while current.kind() == TermKind::List {
                        elements.push(current.arg(0));
                        current = current.arg(1);
                    }

                    stack.push(Print::Text("]"));
                    push_separated(&mut stack, elements);
                }
                TermKind::Application => {
                    let symbol = term.get_head_symbol();
                    if symbol.is_quoted() {
                        write_quoted(f, symbol.name())?;
                    } else {
                        write!(f, "{}", symbol.name())?;
                    }

                    if term.arity() > 0 {
                        write!(f, "(")?;
                        stack.push(Print::Text(")"));
                        push_separated(&mut stack, term.arguments().collect());
                    }
                }
            }
        }

        Ok(())
    }
}

/// Pushes the terms such that they are popped in order, separated by commas.
fn push_separated<'a>(stack: &mut Vec<Print<'a>>, terms: Vec<ATermRef<'a>>) {
    for (index, term) in terms.into_iter().enumerate().rev() {
        stack.push(Print::Term(term));
        if index > 0 {
            stack.push(Print::Text(","));
        }
    }
}

/// Writes the name between double quotes, escaping quotes, backslashes and control characters.
pub(crate) fn write_quoted(f: &mut impl fmt::Write, name: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in name.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

/// An owning handle to a term, mostly derived from [ATermRef].
///
/// Every handle holds one reference to its term, which is released when the
/// handle is dropped. The lifetime `'s` is the lifetime of the [TermStore],
/// so a handle cannot outlive its store.
///
/// ```compile_fail
/// use sharc_aterm::TermStore;
///
/// let term = {
///     let store = TermStore::new();
///     store.make_int(1)
/// };
/// println!("{term}");
/// ```
pub struct ATerm<'s> {
    term: ATermRef<'s>,
}

impl<'s> ATerm<'s> {
    /// Takes over one reference to the shared term.
    pub(crate) fn from_shared(store: &'s TermStore, shared: SharedTerm) -> ATerm<'s> {
        ATerm {
            term: ATermRef::from_shared(store, shared),
        }
    }

    /// Returns a borrow from the term
    pub fn get(&self) -> ATermRef<'_> {
        self.term
    }
}

impl<'s, 'a, 'b> Term<'a, 'b> for ATerm<'s>
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

impl Drop for ATerm<'_> {
    fn drop(&mut self) {
        self.term.store.release(self.term.shared);
    }
}

impl Clone for ATerm<'_> {
    fn clone(&self) -> Self {
        self.term.shared.increment_reference();
        ATerm::from_shared(self.term.store, self.term.shared)
    }
}

impl<'a> From<ATermRef<'a>> for ATerm<'a> {
    fn from(value: ATermRef<'a>) -> Self {
        value.protect()
    }
}

impl fmt::Display for ATerm<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.term)
    }
}

impl fmt::Debug for ATerm<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.term)
    }
}

impl Hash for ATerm<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.term.hash(state)
    }
}

impl PartialEq for ATerm<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.term.eq(&other.term)
    }
}

impl PartialEq<ATermRef<'_>> for ATerm<'_> {
    fn eq(&self, other: &ATermRef<'_>) -> bool {
        self.term.shared == other.shared
    }
}

impl PartialOrd for ATerm<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ATerm<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.term.cmp(&other.term)
    }
}

impl Eq for ATerm<'_> {}

/// An iterator over the arguments of a term.
pub struct ATermArgs<'a> {
    term: ATermRef<'a>,
    arity: usize,
    index: usize,
}

impl<'a> ATermArgs<'a> {
    fn new(term: ATermRef<'a>) -> ATermArgs<'a> {
        ATermArgs {
            term,
            arity: term.arity(),
            index: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.index == self.arity
    }
}

impl<'a> Iterator for ATermArgs<'a> {
    type Item = ATermRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index < self.arity {
            let result = self.term.arg(self.index);
            self.index += 1;
            Some(result)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len(), Some(self.len()))
    }
}

impl DoubleEndedIterator for ATermArgs<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.index < self.arity {
            self.arity -= 1;
            Some(self.term.arg(self.arity))
        } else {
            None
        }
    }
}

impl ExactSizeIterator for ATermArgs<'_> {
    fn len(&self) -> usize {
        self.arity - self.index
    }
}

/// An iterator over all subterms of the given [ATerm] in preorder traversal, i.e.,
/// for f(g(a), b) we visit f(g(a), b), g(a), a, b.
pub struct TermIterator<'a> {
    stack: Vec<ATermRef<'a>>,
}

impl<'a> TermIterator<'a> {
    pub fn new(term: ATermRef<'a>) -> TermIterator<'a> {
        TermIterator { stack: vec![term] }
    }
}

impl<'a> Iterator for TermIterator<'a> {
    type Item = ATermRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let term = self.stack.pop()?;

        // Put subterms on the stack such that the first argument is visited first.
        self.stack.extend(term.arguments().rev());
        Some(term)
    }
}

/// Blanket implementation allowing passing borrowed terms as references.
impl<'a, 'b, T: Term<'a, 'b>> Term<'a, 'b> for &'b T {
    fn protect(&self) -> ATerm<'a> {
        (*self).protect()
    }

    fn arg(&self, index: usize) -> ATermRef<'a> {
        (*self).arg(index)
    }

    fn arguments(&self) -> ATermArgs<'a> {
        (*self).arguments()
    }

    fn copy(&self) -> ATermRef<'a> {
        (*self).copy()
    }

    fn get_head_symbol(&self) -> SymbolRef<'a> {
        (*self).get_head_symbol()
    }

    fn iter(&self) -> TermIterator<'a> {
        (*self).iter()
    }

    fn index(&self) -> usize {
        (*self).index()
    }

    fn shared(&self) -> SharedTerm {
        (*self).shared()
    }

    fn store(&self) -> &'a TermStore {
        (*self).store()
    }
}
