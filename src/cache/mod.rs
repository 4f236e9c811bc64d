mod cache_error;
mod image_cache;
mod key_hash;
mod lru;

pub use cache_error::CacheError;
pub use image_cache::ImageCache;
pub use key_hash::hash_key;
pub use lru::LruIndex;
