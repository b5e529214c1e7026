//! # Response Cache
//!
//! In-process TTL cache for successful GET envelopes, keyed by request
//! fingerprint. Entries expire lazily on read and eagerly on sweep.
//!
//! **Important**: This cache is NOT distributed. Each process (or each
//! [`FetchClient`](crate::client::FetchClient)) keeps its own state.

pub mod key;
pub mod memory;

pub use key::fingerprint;
pub use memory::{CacheEntry, CacheStats, ResponseCache};
