// config.rs
use std::path::PathBuf;
use url::Url;

/// The `count` query parameter sent to the listings endpoint; the page
/// cursor advances by this amount after every consumed page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Decoded images held in memory. Kept small: a decoded bitmap is far
/// larger than its encoded file.
pub const DEFAULT_MEMORY_CACHE_CAPACITY: usize = 20;

/// Encoded image files kept on disk.
pub const DEFAULT_DISK_CACHE_CAPACITY: usize = 100;

/// Settings for the listings fetcher. Built once at startup and handed to
/// `FetchCoordinator`.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub endpoint: Url,
    pub page_size: usize,
}

impl FetchConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

/// Settings for the two-tier image cache. `storage_dir` is the private
/// directory that holds the disk tier's files for the life of the process.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub storage_dir: PathBuf,
    pub memory_capacity: usize,
    pub disk_capacity: usize,
}

impl CacheConfig {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            memory_capacity: DEFAULT_MEMORY_CACHE_CAPACITY,
            disk_capacity: DEFAULT_DISK_CACHE_CAPACITY,
        }
    }

    pub fn with_memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = capacity;
        self
    }

    pub fn with_disk_capacity(mut self, capacity: usize) -> Self {
        self.disk_capacity = capacity;
        self
    }
}
