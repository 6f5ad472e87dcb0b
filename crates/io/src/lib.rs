#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod bitstream;
mod byte_buffer;
mod format;

pub use bitstream::*;
pub use byte_buffer::*;
pub use format::*;
