//! Response cache implementations.

mod memory;

pub use memory::{DEFAULT_TTL, InMemoryResponseCache};
