//! The storage behind the [crate::ATerm] handles.
//!
//! An aterm is a first-order term of the following form:
//!
//! t := i | [] | [t, ..., t] | c | f(t1, ..., tn)
//!
//! where `i` is a 64-bit integer, `f` is a function symbol with arity `n > 0`
//! and `c` a constant. Lists are built from the reserved list constructor and
//! empty list symbols.
//!
//! Terms are stored maximally shared in a [TermStore], meaning that equal
//! terms are the same node and terms are immutable. Nodes live in slots of a
//! block allocator and are reference counted, a node is reclaimed as soon as
//! its last reference disappears.
//!
//! This module uses `unsafe` to interpret the words of the slots, but every
//! module that only uses safe Rust is marked with `#![forbid(unsafe_code)]`.

mod protection_set;
mod shared_term;
mod symbol_pool;
mod term_pool;
mod term_store;

pub use protection_set::*;
pub use shared_term::*;
pub use symbol_pool::*;
pub(crate) use term_pool::*;
pub use term_store::*;
