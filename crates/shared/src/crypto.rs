//! Cryptographic utilities for admin key generation and hashing.

use sha2::{Digest, Sha256};

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a new admin key with the `bg_` prefix.
///
/// Only the sha256 hex digest of the generated key should ever be stored
/// (see the `security.admin_key_hash` config value).
pub fn generate_admin_key() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";
    let mut rng = rand::thread_rng();

    let suffix: String = (0..32)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();

    format!("bg_{}", suffix)
}

/// Extracts the prefix from an admin key (first 8 characters after "bg_").
///
/// The prefix is safe to log; the full key is not.
pub fn extract_key_prefix(key: &str) -> Option<&str> {
    if key.starts_with("bg_") && key.len() >= 11 {
        Some(&key[3..11])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex("test");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_sha256_hex_deterministic() {
        assert_eq!(sha256_hex("same_input"), sha256_hex("same_input"));
    }

    #[test]
    fn test_sha256_hex_different_inputs() {
        assert_ne!(sha256_hex("input1"), sha256_hex("input2"));
    }

    #[test]
    fn test_generate_admin_key_format() {
        let key = generate_admin_key();
        assert!(key.starts_with("bg_"));
        assert_eq!(key.len(), 35);
        // No confusing characters in the generated part
        for c in key[3..].chars() {
            assert!(c != '0' && c != 'O' && c != '1' && c != 'l' && c != 'I');
        }
    }

    #[test]
    fn test_generate_admin_key_unique() {
        assert_ne!(generate_admin_key(), generate_admin_key());
    }

    #[test]
    fn test_extract_key_prefix() {
        assert_eq!(extract_key_prefix("bg_abcdefgh12345"), Some("abcdefgh"));
        assert_eq!(extract_key_prefix("bg_1234567"), None);
        assert_eq!(extract_key_prefix("sk_abcdefgh12345"), None);
    }
}
