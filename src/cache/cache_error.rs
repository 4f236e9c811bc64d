use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum CacheError {
    Storage(String),
    Io(String),
    Decode(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Storage(msg) => write!(f, "Cache storage error: {msg}"),
            CacheError::Io(msg) => write!(f, "Cache I/O error: {msg}"),
            CacheError::Decode(msg) => write!(f, "Image decode error: {msg}"),
        }
    }
}

impl Error for CacheError {}
