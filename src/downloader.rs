// downloader.rs
use crate::cache::ImageCache;
use crate::fetch::FetchError;
use image::DynamicImage;
use rand::Rng;
use reqwest::blocking::Client;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const USER_AGENT: &str = "listing_browser/0.1";
const MAX_ATTEMPTS: u64 = 3;
const MAX_BACKOFF_SECS: u64 = 8;
const JITTER_MAX_SECS: u64 = 1;

/// Cache-first retrieval of property photos.
///
/// Misses are downloaded on the calling thread (`fetch_image`) or a worker
/// (`fetch_image_async`), decoded, and stored through the cache so the
/// next consumer of the same URL hits a tier instead of the network.
#[derive(Clone)]
pub struct ImageDownloader {
    client: Client,
    cache: Arc<ImageCache>,
}

impl ImageDownloader {
    pub fn new(cache: Arc<ImageCache>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self { client, cache })
    }

    /// Resolve `url` to a decoded image, downloading on a cache miss.
    /// `Ok(None)` means the photo exists but is unusable (empty body or
    /// undecodable bytes); that degrades like a miss rather than an error.
    pub fn fetch_image(&self, url: &str) -> Result<Option<Arc<DynamicImage>>, FetchError> {
        if let Some(image) = self.cache.fetch(url) {
            return Ok(Some(image));
        }

        let bytes = self.download_with_retry(url)?;
        if bytes.is_empty() {
            return Ok(None);
        }

        let image = match image::load_from_memory(&bytes) {
            Ok(image) => Arc::new(image),
            Err(err) => {
                eprintln!("⚠️ Downloaded image failed to decode: {err}");
                return Ok(None);
            }
        };

        let staging = staging_path();
        match fs::write(&staging, &bytes) {
            Ok(()) => {
                self.cache.store(&staging, Some(Arc::clone(&image)), url);
                // store() moves the file; anything left over was declined.
                let _ = fs::remove_file(&staging);
            }
            Err(err) => eprintln!("⚠️ Could not stage downloaded image: {err}"),
        }

        Ok(Some(image))
    }

    /// Background variant for UI elements that may be recycled before the
    /// download lands: cancel the ticket and a stale image is never
    /// delivered.
    pub fn fetch_image_async(&self, url: &str) -> DownloadTicket {
        let ticket = DownloadTicket::new();
        let worker_ticket = ticket.clone();
        let downloader = self.clone();
        let url = url.to_string();

        thread::spawn(move || {
            let result = downloader.fetch_image(&url);
            worker_ticket.deliver(result);
        });

        ticket
    }

    fn download_with_retry(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut last_err = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.try_download(url) {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    eprintln!("⚠️ Image download attempt {attempt} failed: {e}");
                    last_err = Some(e);

                    if attempt < MAX_ATTEMPTS {
                        let base = std::cmp::min(2 * attempt, MAX_BACKOFF_SECS);
                        let jitter = rand::thread_rng().gen_range(0..=JITTER_MAX_SECS);
                        thread::sleep(Duration::from_secs(base + jitter));
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| FetchError::Network("image download retry loop failed".into())))
    }

    fn try_download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!(
                "image endpoint returned HTTP {status}"
            )));
        }

        let bytes = response
            .bytes()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

fn staging_path() -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("listing_photo_{nanos}.part"))
}

#[derive(Clone)]
pub enum DownloadOutcome {
    Image(Arc<DynamicImage>),
    /// The download completed but produced nothing usable.
    Missing,
    Cancelled,
    Failed(FetchError),
}

/// Completion cell for one background download. Cancelling does not abort
/// the transfer, it guarantees the result is discarded instead of
/// delivered.
#[derive(Clone)]
pub struct DownloadTicket {
    shared: Arc<TicketShared>,
}

struct TicketShared {
    cancelled: AtomicBool,
    outcome: Mutex<Option<DownloadOutcome>>,
    ready: Condvar,
}

impl DownloadTicket {
    fn new() -> Self {
        Self {
            shared: Arc::new(TicketShared {
                cancelled: AtomicBool::new(false),
                outcome: Mutex::new(None),
                ready: Condvar::new(),
            }),
        }
    }

    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn wait(&self) -> DownloadOutcome {
        let mut slot = self.shared.outcome.lock().unwrap();
        loop {
            match &*slot {
                Some(outcome) => return outcome.clone(),
                None => slot = self.shared.ready.wait(slot).unwrap(),
            }
        }
    }

    pub fn try_outcome(&self) -> Option<DownloadOutcome> {
        self.shared.outcome.lock().unwrap().clone()
    }

    fn deliver(&self, result: Result<Option<Arc<DynamicImage>>, FetchError>) {
        let outcome = if self.shared.cancelled.load(Ordering::SeqCst) {
            DownloadOutcome::Cancelled
        } else {
            match result {
                Ok(Some(image)) => DownloadOutcome::Image(image),
                Ok(None) => DownloadOutcome::Missing,
                Err(err) => DownloadOutcome::Failed(err),
            }
        };

        let mut slot = self.shared.outcome.lock().unwrap();
        *slot = Some(outcome);
        self.shared.ready.notify_all();
    }
}
