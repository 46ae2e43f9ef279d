//! Keeps live objects in sync with configuration keys.
//!
//! Registration happens in two phases driven by the host lifecycle:
//! - before objects exist, property declarations are recorded per owner name
//! - when an object is built, its own field/setter declarations are bound and
//!   the owner's pending declarations are materialized against it
//!
//! The [`ChangePropagator`] then re-applies values whenever a live property
//! source reports a change to a bound key.

pub mod error;
pub mod processor;
pub mod propagator;
pub mod registry;
pub mod target;
pub mod value;

pub use error::*;
pub use processor::*;
pub use propagator::*;
pub use registry::*;
pub use target::*;
pub use value::*;
