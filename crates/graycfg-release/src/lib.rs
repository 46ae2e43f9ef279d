//! Release resolution for config requests.
//!
//! A request is answered by trying its explicit cluster, then its data
//! center, then the default cluster. At every tier a gray rule may redirect
//! the client to a specific release before the tier's latest active release
//! is considered. The lookups themselves are pluggable:
//! - [`DirectReleaseLookup`] reads the [`ReleaseStore`] on every call
//! - [`CachedReleaseLookup`] caches per watch key and is invalidated by release messages

pub mod gray;
pub mod lookup;
pub mod resolver;
pub mod service;
pub mod store;

pub use gray::*;
pub use lookup::*;
pub use resolver::*;
pub use service::*;
pub use store::*;
