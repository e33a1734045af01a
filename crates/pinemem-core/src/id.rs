//! Memory id generation.

use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};

/// Prefix shared by every generated memory id.
pub const MEMORY_ID_PREFIX: &str = "mem_";

/// Generate a SHA256 hash of the input.
pub fn sha256(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a short hash (first 8 characters of SHA256).
pub fn short_hash(input: &str) -> String {
    sha256(input)[..8].to_string()
}

/// Generate a memory id such as `mem_20240101_120000_1a2b3c4d`.
///
/// The readable part is the second-resolution timestamp; the suffix digests
/// the text together with the full-precision timestamp, so two memories
/// stored in the same second still get distinct ids.
pub fn memory_id_at(text: &str, at: DateTime<Local>) -> String {
    let digest = short_hash(&format!("{}{}", text, at.to_rfc3339()));
    format!(
        "{}{}_{}",
        MEMORY_ID_PREFIX,
        at.format("%Y%m%d_%H%M%S"),
        digest
    )
}

/// Check whether a string looks like a generated memory id.
pub fn is_memory_id(id: &str) -> bool {
    let Some(rest) = id.strip_prefix(MEMORY_ID_PREFIX) else {
        return false;
    };
    let parts: Vec<&str> = rest.split('_').collect();
    matches!(parts.as_slice(), [date, time, hash]
        if date.len() == 8
            && time.len() == 6
            && hash.len() == 8
            && date.chars().all(|c| c.is_ascii_digit())
            && time.chars().all(|c| c.is_ascii_digit())
            && hash.chars().all(|c| c.is_ascii_hexdigit()))
}
