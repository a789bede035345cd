//! Hash functions.

use aws_lc_rs::digest;
use base64::Engine;

/// Computes a SHA-384 hash of the input data.
#[must_use]
pub fn sha384(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA384, data).as_ref().to_vec()
}

/// Derives a short, stable identifier for a key from its public bytes.
#[must_use]
pub fn key_id(public_key: &[u8]) -> String {
    let hash = sha384(public_key);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&hash[..12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha384_produces_correct_length() {
        assert_eq!(sha384(b"test").len(), 48);
    }

    #[test]
    fn key_id_is_deterministic_and_distinct() {
        assert_eq!(key_id(b"key-a"), key_id(b"key-a"));
        assert_ne!(key_id(b"key-a"), key_id(b"key-b"));
        assert_eq!(key_id(b"key-a").len(), 16);
    }
}
