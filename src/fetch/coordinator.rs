// coordinator.rs
use crate::config::FetchConfig;
use crate::fetch::models::ListingRecord;
use crate::fetch::store::ListingStore;
use crate::fetch::FetchError;
use reqwest::blocking::Client;
use serde_json::Value;
use std::io::Read;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

const USER_AGENT: &str = "listing_browser/0.1";
const READ_CHUNK_BYTES: usize = 8 * 1024;

type Snapshot = Vec<Arc<ListingRecord>>;

/// Drives paginated fetches against the listings endpoint.
///
/// At most one page fetch is in flight at a time; overlapping
/// `request_more` calls collapse onto the in-flight fetch and share its
/// handle. All mutable state (cursor, in-flight slot, store, observers)
/// lives behind one lock so registration, requests, merges and reads never
/// interleave unsafely. Construct one instance at startup and share it.
pub struct FetchCoordinator {
    inner: Arc<FetchShared>,
}

struct FetchShared {
    client: Client,
    config: FetchConfig,
    state: Mutex<FetchState>,
}

struct FetchState {
    cursor: usize,
    in_flight: Option<FetchHandle>,
    store: ListingStore,
    observers: Vec<Sender<Snapshot>>,
}

impl FetchCoordinator {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(FetchShared {
                client,
                config,
                state: Mutex::new(FetchState {
                    cursor: 0,
                    in_flight: None,
                    store: ListingStore::new(),
                    observers: Vec::new(),
                }),
            }),
        })
    }

    /// Ask for the next page of listings. Returns immediately; the fetch
    /// runs on a worker thread and the handle resolves when it finishes.
    /// While a fetch is in flight, further calls return that fetch's handle
    /// without issuing a second request.
    pub fn request_more(&self) -> FetchHandle {
        let (handle, start, count) = {
            let mut state = self.inner.state.lock().unwrap();
            if let Some(in_flight) = &state.in_flight {
                eprintln!("Already in the middle of a listings fetch");
                return in_flight.clone();
            }
            let handle = FetchHandle::new();
            state.in_flight = Some(handle.clone());
            (handle, state.cursor, self.inner.config.page_size)
        };

        let shared = Arc::clone(&self.inner);
        let worker_handle = handle.clone();
        thread::spawn(move || run_fetch(shared, start, count, worker_handle));

        handle
    }

    /// Register an observer. Every time new records land, the complete
    /// deduplicated snapshot (not a delta) is pushed into the returned
    /// channel; drain it from the thread that owns presentation. Dropping
    /// the receiver deregisters the observer.
    pub fn subscribe(&self) -> ListingUpdates {
        let (tx, rx) = mpsc::channel();
        self.inner.state.lock().unwrap().observers.push(tx);
        ListingUpdates { rx }
    }

    /// The complete current snapshot, in first-seen order.
    pub fn listings(&self) -> Snapshot {
        self.inner.state.lock().unwrap().store.snapshot()
    }

    pub fn cursor(&self) -> usize {
        self.inner.state.lock().unwrap().cursor
    }
}

fn run_fetch(shared: Arc<FetchShared>, start: usize, count: usize, handle: FetchHandle) {
    eprintln!("📄 Fetching listings start={start} count={count}");

    match fetch_page(&shared, start, count) {
        Ok(buffer) => {
            let records = match decode_page(&buffer.into_bytes()) {
                Ok(records) => records,
                Err(err) => {
                    // A page we cannot read still counts as consumed.
                    eprintln!("⚠️ Listings page undecodable: {err}");
                    Vec::new()
                }
            };

            let mut state = shared.state.lock().unwrap();
            let mut added = 0;
            for record in records {
                if state.store.insert(record) {
                    added += 1;
                }
            }
            // The page was consumed even if nothing new arrived.
            state.cursor += count;
            let total = state.store.len();

            if added > 0 {
                let snapshot = state.store.snapshot();
                state
                    .observers
                    .retain(|observer| observer.send(snapshot.clone()).is_ok());
            }
            state.in_flight = None;
            drop(state);

            eprintln!("✅ Page merged ({added} new, {total} total)");
            handle.complete(FetchOutcome::Completed { added, total });
        }
        Err(err) => {
            eprintln!("⚠️ Listings fetch failed: {err}");
            shared.state.lock().unwrap().in_flight = None;
            handle.complete(FetchOutcome::Failed(err));
        }
    }
}

/// Issue the page request and reassemble the response body chunk by chunk.
fn fetch_page(shared: &FetchShared, start: usize, count: usize) -> Result<PageBuffer, FetchError> {
    let mut response = shared
        .client
        .get(shared.config.endpoint.as_str())
        .query(&[("start", start.to_string()), ("count", count.to_string())])
        .send()
        .map_err(|e| FetchError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Network(format!(
            "listings endpoint returned HTTP {status}"
        )));
    }

    let mut buffer = PageBuffer::new();
    let mut chunk = [0u8; READ_CHUNK_BYTES];
    loop {
        let n = response
            .read(&mut chunk)
            .map_err(|e| FetchError::Network(e.to_string()))?;
        if n == 0 {
            break;
        }
        buffer.append(&chunk[..n]);
    }

    Ok(buffer)
}

/// Decode a completed page body into records. A malformed element is
/// skipped and the rest of the batch survives; only a body that is not a
/// JSON array at all is an error.
fn decode_page(bytes: &[u8]) -> Result<Vec<ListingRecord>, FetchError> {
    let body: Value =
        serde_json::from_slice(bytes).map_err(|e| FetchError::JsonParse(e.to_string()))?;

    let elements = match body {
        Value::Array(elements) => elements,
        _ => {
            return Err(FetchError::UnexpectedShape(
                "listings array expected".to_string(),
            ))
        }
    };

    let mut records = Vec::with_capacity(elements.len());
    for element in elements {
        match serde_json::from_value::<ListingRecord>(element) {
            Ok(record) => records.push(record),
            Err(err) => eprintln!("Skipping record: {err}"),
        }
    }
    Ok(records)
}

/// Accumulates one in-flight response body. Owned by the worker driving
/// that request, so appends never race between requests.
struct PageBuffer {
    bytes: Vec<u8>,
}

impl PageBuffer {
    fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    fn append(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// How one page fetch ended.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// The page was consumed. `added` is the number of records merged for
    /// the first time; `total` the store size afterwards.
    Completed { added: usize, total: usize },
    Failed(FetchError),
}

/// Shared completion cell for one page fetch. Clones refer to the same
/// fetch; late `request_more` callers receive a clone of the in-flight
/// handle.
#[derive(Clone)]
pub struct FetchHandle {
    shared: Arc<HandleShared>,
}

struct HandleShared {
    outcome: Mutex<Option<FetchOutcome>>,
    ready: Condvar,
}

impl FetchHandle {
    fn new() -> Self {
        Self {
            shared: Arc::new(HandleShared {
                outcome: Mutex::new(None),
                ready: Condvar::new(),
            }),
        }
    }

    fn complete(&self, outcome: FetchOutcome) {
        let mut slot = self.shared.outcome.lock().unwrap();
        *slot = Some(outcome);
        self.shared.ready.notify_all();
    }

    /// Block until the fetch finishes.
    pub fn wait(&self) -> FetchOutcome {
        let mut slot = self.shared.outcome.lock().unwrap();
        loop {
            match &*slot {
                Some(outcome) => return outcome.clone(),
                None => slot = self.shared.ready.wait(slot).unwrap(),
            }
        }
    }

    pub fn try_outcome(&self) -> Option<FetchOutcome> {
        self.shared.outcome.lock().unwrap().clone()
    }
}

/// Receiving half of an observer registration; see
/// [`FetchCoordinator::subscribe`].
pub struct ListingUpdates {
    rx: Receiver<Snapshot>,
}

impl ListingUpdates {
    /// Block until the next snapshot. `None` once the coordinator is gone.
    pub fn recv(&self) -> Option<Snapshot> {
        self.rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Snapshot> {
        self.rx.recv_timeout(timeout).ok()
    }

    pub fn try_recv(&self) -> Option<Snapshot> {
        self.rx.try_recv().ok()
    }
}
