use std::error::Error;
use std::fmt;

#[derive(Debug, Clone)]
pub enum FetchError {
    Network(String),
    JsonParse(String),
    UnexpectedShape(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "Network error: {msg}"),
            FetchError::JsonParse(msg) => write!(f, "JSON parse error: {msg}"),
            FetchError::UnexpectedShape(msg) => write!(f, "Unexpected data shape: {msg}"),
        }
    }
}

impl Error for FetchError {}
