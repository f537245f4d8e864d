//! In-memory I/O provider.
//!
//! Implements every provider operation, including bulk deletion, over
//! per-entity maps. Useful for tests and for running a repository group
//! without a server.

mod blobs;
mod provider;

pub use blobs::MemoryBlobs;
pub use provider::{MemoryConfig, MemoryProvider};
