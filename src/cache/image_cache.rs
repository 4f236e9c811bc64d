// image_cache.rs
use crate::cache::key_hash::hash_key;
use crate::cache::lru::LruIndex;
use crate::cache::CacheError;
use crate::config::CacheConfig;
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Two-tier LRU cache for property photos, keyed by content.
///
/// The memory tier holds a small number of decoded images; the disk tier
/// holds the encoded files under names derived from the key hash. Nothing
/// survives process exit: the disk tier is a spill-over, not a database.
/// One lock guards both tiers, so a fetch-triggered promotion runs in the
/// same critical section as any store. Construct one instance at startup
/// and share it.
pub struct ImageCache {
    storage_dir: PathBuf,
    tiers: Mutex<CacheTiers>,
}

struct CacheTiers {
    memory: LruIndex<Arc<DynamicImage>>,
    disk: LruIndex<PathBuf>,
    memory_capacity: usize,
    disk_capacity: usize,
}

impl ImageCache {
    /// Failing to create the storage directory means the cache cannot
    /// function at all, so it is the one fatal path in here.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        fs::create_dir_all(&config.storage_dir).map_err(|e| {
            CacheError::Storage(format!(
                "cannot create image storage directory {}: {e}",
                config.storage_dir.display()
            ))
        })?;

        Ok(Self {
            storage_dir: config.storage_dir,
            tiers: Mutex::new(CacheTiers {
                memory: LruIndex::new(),
                disk: LruIndex::new(),
                memory_capacity: config.memory_capacity,
                disk_capacity: config.disk_capacity,
            }),
        })
    }

    /// Look up an image. Memory tier first; on a disk-tier hit the file is
    /// decoded and promoted back into the memory tier. `None` means the
    /// caller is responsible for network retrieval. A file that cannot be
    /// decoded degrades to a miss.
    pub fn fetch(&self, key: &str) -> Option<Arc<DynamicImage>> {
        let hash = hash_key(key);
        let mut tiers = self.tiers.lock().unwrap();

        if let Some(image) = tiers.memory.touch(&hash) {
            return Some(image);
        }

        let path = tiers.disk.touch(&hash)?;
        match decode_file(&path) {
            Ok(image) => {
                let image = Arc::new(image);
                tiers.promote(&hash, Arc::clone(&image));
                Some(image)
            }
            Err(err) => {
                eprintln!("⚠️ Cached image unreadable, treating as miss: {err}");
                None
            }
        }
    }

    /// Adopt a downloaded file (and optionally its decoded image) under
    /// `key`. The file is moved into the private storage directory under
    /// the key hash. Zero-byte or unreadable source files are invalid
    /// fetches and are ignored; a failed move degrades to a no-op.
    pub fn store(&self, source_file: &Path, image: Option<Arc<DynamicImage>>, key: &str) {
        match fs::metadata(source_file) {
            Ok(meta) if meta.len() > 0 => {}
            _ => return,
        }

        let hash = hash_key(key);
        let mut tiers = self.tiers.lock().unwrap();

        // Already on disk: refresh recency on both tiers, leave the
        // caller's file alone.
        if tiers.disk.touch(&hash).is_some() {
            if let Some(image) = image {
                tiers.promote(&hash, image);
            }
            return;
        }

        let destination = self.storage_dir.join(&hash);
        if let Err(err) = move_into_storage(source_file, &destination) {
            eprintln!("⚠️ Could not move image into cache storage: {err}");
            return;
        }

        tiers.disk.insert(hash.clone(), destination);
        while tiers.disk.len() > tiers.disk_capacity {
            let (evicted, path) = tiers.disk.evict_oldest();
            let _ = fs::remove_file(&path);
            // A decoded image must not outlive its backing file.
            tiers.memory.remove(&evicted);
        }

        if let Some(image) = image {
            tiers.promote(&hash, image);
        }
    }

    /// Drop both tiers and delete every file in the storage directory.
    /// Best-effort: a directory that cannot be listed is treated as empty
    /// and individual delete failures are skipped.
    pub fn clear_cache(&self) {
        let mut tiers = self.tiers.lock().unwrap();
        tiers.memory.remove_all();
        tiers.disk.remove_all();

        // File deletion stays inside the critical section so a concurrent
        // store cannot slip a fresh file under the sweep.
        let entries = match fs::read_dir(&self.storage_dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            if let Err(err) = fs::remove_file(entry.path()) {
                eprintln!(
                    "⚠️ Could not delete cached file {}: {err}",
                    entry.path().display()
                );
            }
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Drop every decoded image while leaving the disk tier intact,
    /// mimicking memory pressure. Fetches afterwards must re-decode.
    #[cfg(test)]
    pub(crate) fn evict_all_decoded(&self) {
        self.tiers.lock().unwrap().memory.remove_all();
    }
}

impl CacheTiers {
    /// Put a decoded image into the memory tier (or refresh it if already
    /// there) and enforce the tier's bound. Memory eviction drops only the
    /// decoded payload; the disk copy stays.
    fn promote(&mut self, hash: &str, image: Arc<DynamicImage>) {
        if self.memory.touch(hash).is_some() {
            return;
        }
        self.memory.insert(hash.to_string(), image);
        while self.memory.len() > self.memory_capacity {
            self.memory.evict_oldest();
        }
    }
}

fn decode_file(path: &Path) -> Result<DynamicImage, CacheError> {
    let bytes = fs::read(path).map_err(|e| CacheError::Io(e.to_string()))?;
    image::load_from_memory(&bytes).map_err(|e| CacheError::Decode(e.to_string()))
}

/// Rename where possible, copy-and-delete across filesystems.
fn move_into_storage(source: &Path, destination: &Path) -> Result<(), CacheError> {
    if fs::rename(source, destination).is_ok() {
        return Ok(());
    }
    fs::copy(source, destination).map_err(|e| {
        CacheError::Io(format!(
            "copy {} -> {}: {e}",
            source.display(),
            destination.display()
        ))
    })?;
    let _ = fs::remove_file(source);
    Ok(())
}
