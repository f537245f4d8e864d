mod keys;
mod store;

pub use keys::{CacheKey, InvalidationScope};
pub use store::{Cache, CacheEntry, Cacheable, SharedResult};
