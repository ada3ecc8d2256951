//! Key-value store collaborator.
//!
//! The `kv` feature (enabled by default) compiles the Redis backend.

#[cfg(feature = "kv")]
pub mod redis;
pub mod traits;

#[cfg(feature = "kv")]
pub use self::redis::RedisBackend;
pub use traits::{KeyTtl, KvBackend};
