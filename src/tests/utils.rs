use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A unique directory path under the system temp dir. Not created.
pub fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}_{nanos}"))
}

/// A unique file path under the system temp dir. Not created.
pub fn unique_temp_file(prefix: &str, extension: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}_{nanos}.{extension}"))
}

/// A tiny valid PNG; `shade` varies the pixels so fixtures are
/// distinguishable after a decode round trip.
pub fn png_bytes(shade: u8) -> Vec<u8> {
    let pixels = image::RgbaImage::from_pixel(4, 4, image::Rgba([shade, 0, 0, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(pixels)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageOutputFormat::Png,
        )
        .expect("encode png fixture");
    bytes
}

pub fn write_png(path: &Path, shade: u8) {
    std::fs::write(path, png_bytes(shade)).expect("write png fixture");
}

/// One listing object in the endpoint's wire format.
pub fn listing_json(id: &str) -> String {
    format!(
        r#"{{"id":"{id}","price":500000,"bedrooms":3,"bathrooms":2,"city":"Seattle","photos":["http://photos.example.com/{id}.jpg"]}}"#
    )
}

/// A whole response page: a JSON array of listing objects.
pub fn listings_page(ids: &[&str]) -> Vec<u8> {
    let objects: Vec<String> = ids.iter().map(|id| listing_json(id)).collect();
    format!("[{}]", objects.join(",")).into_bytes()
}

/// An address nothing is listening on, for transport-failure scenarios.
pub fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind probe listener");
    let addr = listener.local_addr().expect("probe listener addr");
    drop(listener);
    addr
}

/// Minimal in-process HTTP endpoint serving canned bodies, one per
/// request in order (the last body repeats). Runs until the test process
/// exits; every connection is answered with `Connection: close` so each
/// client request opens a fresh, countable connection.
pub struct StubEndpoint {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    targets: Arc<Mutex<Vec<String>>>,
}

impl StubEndpoint {
    pub fn spawn(bodies: Vec<Vec<u8>>) -> Self {
        Self::spawn_with_delay(bodies, Duration::ZERO)
    }

    /// `delay` holds every response open, keeping a fetch in flight long
    /// enough for a test to overlap a second request with it.
    pub fn spawn_with_delay(bodies: Vec<Vec<u8>>, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub endpoint");
        let addr = listener.local_addr().expect("stub endpoint addr");
        let hits = Arc::new(AtomicUsize::new(0));
        let targets = Arc::new(Mutex::new(Vec::new()));

        let worker_hits = Arc::clone(&hits);
        let worker_targets = Arc::clone(&targets);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let served = worker_hits.fetch_add(1, Ordering::SeqCst);
                let body = bodies
                    .get(served)
                    .or_else(|| bodies.last())
                    .cloned()
                    .unwrap_or_default();

                worker_targets
                    .lock()
                    .unwrap()
                    .push(read_request_target(&mut stream));
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                let _ = write_http_ok(&mut stream, &body);
            }
        });

        Self {
            addr,
            hits,
            targets,
        }
    }

    /// The URL clients should fetch.
    pub fn url(&self) -> String {
        format!("http://{}/listings", self.addr)
    }

    /// How many requests have arrived so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Request targets (path + query) in arrival order.
    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }
}

/// Read request headers and return the target from the request line.
fn read_request_target(stream: &mut TcpStream) -> String {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut raw = Vec::new();
    let mut chunk = [0u8; 1024];
    while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => raw.extend_from_slice(&chunk[..n]),
        }
    }

    String::from_utf8_lossy(&raw)
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or_default()
        .to_string()
}

fn write_http_ok(stream: &mut TcpStream, body: &[u8]) -> std::io::Result<()> {
    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    stream.flush()
}
