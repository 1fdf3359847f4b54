//! Weak-ETag fingerprints over normalized quotes.
//!
//! The fingerprint is a cache-validation token, not a security primitive:
//! a 32-bit rolling hash (multiply-by-31, wrapping) over the JSON-serialized
//! quote list, with the serialized length appended to shave off collisions.
//! Two lists that serialize identically always fingerprint identically.

use crate::models::Quote;

/// Compute the weak ETag for a quote list, e.g. `W/"1a2b3c4d-117"`.
///
/// Hashes UTF-16 code units of the serialized JSON, so fingerprints agree
/// with caches written by the original JavaScript service for the same
/// serialized content.
pub fn fingerprint(quotes: &[Quote]) -> String {
    let serialized = serde_json::to_string(quotes).unwrap_or_default();
    let mut hash: u32 = 0;
    let mut len: usize = 0;
    for unit in serialized.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(u32::from(unit));
        len += 1;
    }
    format!("W/\"{:x}-{}\"", hash, len)
}
