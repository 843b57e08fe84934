//! Bounded, deterministic object names.

use sha2::{Digest, Sha256};

/// Maximum length of a Kubernetes object name (DNS label).
pub const MAX_NAME_LENGTH: usize = 63;
/// Hex characters of the name digest kept in the suffix.
pub const HASH_LENGTH: usize = 6;

/// Build `{name}-{hash}-{suffix}`, truncating `name` so the result never
/// exceeds [`MAX_NAME_LENGTH`]. The hash is taken over the untruncated name,
/// so long names that share a prefix still differ.
pub fn generate_name(name: &str, suffix: &str) -> String {
    let digest = hex::encode(Sha256::digest(name.as_bytes()));
    let full_suffix = format!("{}-{}", &digest[..HASH_LENGTH], suffix);
    let full_name = format!("{}-{}", name, full_suffix);
    if full_name.len() <= MAX_NAME_LENGTH {
        return full_name;
    }

    // -1 for the separator between name and suffix
    let mut max = MAX_NAME_LENGTH.saturating_sub(full_suffix.len() + 1).min(name.len());
    while !name.is_char_boundary(max) { max -= 1; }
    let mut truncated = name[..max].to_string();
    if !truncated.ends_with('-') {
        truncated.push('-');
    }
    truncated + &full_suffix
}
