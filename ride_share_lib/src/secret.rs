use sha2::{Digest, Sha256};

use crate::DEFAULT_PASSWORD;

/// Hex encoded SHA256 of the password. These are shared per-record secrets,
/// not account credentials, so no salt.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Empty or blank passwords fall back to the default.
pub fn hash_or_default(password: Option<&str>) -> String {
    match password.map(str::trim) {
        Some(p) if !p.is_empty() => hash_password(p),
        _ => hash_password(DEFAULT_PASSWORD),
    }
}

pub fn verify_password(hash: &str, candidate: &str) -> bool {
    hash_password(candidate) == hash
}
