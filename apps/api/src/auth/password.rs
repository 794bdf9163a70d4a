use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const SCHEME: &str = "sha256";

/// Hashes a password as `sha256$<salt>$<hex digest of salt + password>`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = hex::encode(salt);
    format!("{SCHEME}${salt}${}", digest(&salt, password))
}

/// Checks a password against a stored hash.
///
/// Accepts the salted format and bare 64-char hex digests left by older accounts.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let stored = stored.trim();
    let (salt, expected) = match stored.split('$').collect::<Vec<_>>().as_slice() {
        [SCHEME, salt, hex] => (*salt, *hex),
        [hex] if is_legacy_digest(hex) => ("", *hex),
        _ => return false,
    };
    let actual = digest(salt, password);
    actual
        .as_bytes()
        .ct_eq(expected.to_ascii_lowercase().as_bytes())
        .into()
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn is_legacy_digest(value: &str) -> bool {
    value.len() == 64 && value.chars().all(|c| c.is_ascii_hexdigit())
}
