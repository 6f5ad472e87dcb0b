#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]

mod baf_integer;
mod bit_width;
mod power_of_two;
mod u64_variablelength;

pub use baf_integer::*;
pub use bit_width::*;
pub use power_of_two::*;
pub use u64_variablelength::*;
