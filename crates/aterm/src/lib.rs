#![doc = include_str!("../README.md")]

mod aterm;
mod aterm_builder;
mod aterm_list;
mod baf;
mod parse_term;
mod random_term;
mod read_term;
mod saf;
mod symbol;

pub mod storage;

pub use aterm::*;
pub use aterm_builder::*;
pub use aterm_list::*;
pub use baf::*;
pub use parse_term::*;
pub use random_term::*;
pub use read_term::*;
pub use saf::*;
pub use symbol::*;
pub use storage::ProtectionIndex;
pub use storage::TermStore;
pub use storage::TermStoreConfig;
pub use storage::TermStoreMetrics;
