//! Interchangeable [`ReleaseLookup`](crate::ReleaseLookup) strategies.

mod cached;
mod direct;

pub use cached::*;
pub use direct::*;
