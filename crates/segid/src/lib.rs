#![doc = include_str!("../README.md")]

mod buffer;
mod error;
mod generator;
mod range;
mod store;

pub use crate::buffer::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::range::*;
pub use crate::store::*;
