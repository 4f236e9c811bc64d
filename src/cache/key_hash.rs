// key_hash.rs
use base64::Engine;
use sha2::{Digest, Sha256};

/// Hash an arbitrary cache key (usually a photo URL) into a fixed-length
/// identifier that is safe as both a filename and a map key.
/// - SHA-256, so identity ignores anything unsafe in the key itself.
/// - Base64 URL-safe, no padding: 32 bytes -> 43 chars of `A-Z a-z 0-9 - _`.
pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        let h1 = hash_key("http://example.com/a.jpg");
        let h2 = hash_key("http://example.com/a.jpg");
        assert_eq!(h1, h2);
    }

    #[test]
    fn hash_changes_with_input() {
        let h1 = hash_key("http://example.com/a.jpg");
        let h2 = hash_key("http://example.com/b.jpg");
        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_is_filename_safe() {
        // Keys can contain characters that must never reach the filesystem.
        let h = hash_key("http://example.com/p?size=600x400&fmt=jpg#frag");
        assert_eq!(h.len(), 43);
        assert!(h
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
