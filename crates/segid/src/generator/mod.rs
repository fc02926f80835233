mod config;
mod segment;

pub use config::*;
pub use segment::*;
