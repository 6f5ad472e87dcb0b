#![doc = include_str!("../README.md")]

mod block_allocator;

pub use block_allocator::*;
