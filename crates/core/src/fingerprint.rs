//! Content fingerprints.
//!
//! A fingerprint is the SHA-256 of `title \n content \n link`, rendered as 64
//! lowercase hex characters. It is the sole deduplication key: identical triples
//! always hash identically, across runs and process restarts.
//!
//! Exact hashing means any edit, however small (a typo fix, trailing whitespace,
//! an entity encoded differently), produces an unrelated fingerprint and the
//! article is ingested again as new.

use sha2::{Digest, Sha256};

/// Separator placed between the seed fields.
pub const SEED_SEPARATOR: char = '\n';

/// Length of a rendered fingerprint.
pub const FINGERPRINT_LEN: usize = 64;

/// Build the digest seed. Absent fields contribute an empty string.
pub fn fingerprint_seed(title: Option<&str>, content: Option<&str>, link: &str) -> String {
    let title = title.unwrap_or_default();
    let content = content.unwrap_or_default();

    let mut seed = String::with_capacity(title.len() + content.len() + link.len() + 2);
    seed.push_str(title);
    seed.push(SEED_SEPARATOR);
    seed.push_str(content);
    seed.push(SEED_SEPARATOR);
    seed.push_str(link);
    seed
}

/// Fingerprint an article's semantic fields.
pub fn fingerprint(title: Option<&str>, content: Option<&str>, link: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fingerprint_seed(title, content, link).as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Whether `s` has the shape of a fingerprint produced by [`fingerprint`].
pub fn is_fingerprint(s: &str) -> bool {
    s.len() == FINGERPRINT_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
