//! Log-safe identifiers for clinical text.
//!
//! Transcripts are PHI and never appear in logs; a short SHA-256 prefix lets
//! log lines for the same text be correlated.

use sha2::{Digest, Sha256};

/// Hex characters kept from the digest.
const FINGERPRINT_LEN: usize = 12;

/// Short SHA-256 fingerprint of `text`.
pub fn fingerprint(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}
