//! One-way password hashing and verification.
//!
//! Hashes are PBKDF2-HMAC-SHA256 with a random per-user salt, stored as
//! `pbkdf2:iterations:hex_salt:hex_hash`. The iteration count is embedded
//! in the stored string, so it can be raised later without invalidating
//! existing credentials.

use hmac::Hmac;
use rand::RngCore;
use sha2::Sha256;

/// PBKDF2 iteration count for newly created hashes.
const ITERATIONS: u32 = 210_000;

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// Derived key length in bytes.
const HASH_LEN: usize = 32;

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, iterations, &mut out)
        .expect("HMAC can take a key of any size");
    out
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for i in 0..a.len() {
        diff |= a[i] ^ b[i];
    }
    diff == 0
}

/// Hash a password for storage.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let hash = derive(password, &salt, ITERATIONS);
    format!(
        "pbkdf2:{}:{}:{}",
        ITERATIONS,
        hex::encode(salt),
        hex::encode(hash)
    )
}

/// Verify a password against a stored hash string.
///
/// Returns false for malformed stored strings rather than erroring; a
/// corrupted hash behaves like a wrong password.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split(':');
    let (Some("pbkdf2"), Some(iterations), Some(salt_hex), Some(hash_hex), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(hash_hex) else {
        return false;
    };

    let actual = derive(password, &salt, iterations);
    constant_time_eq(&actual, &expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let stored = hash_password("correct horse battery staple");
        assert!(stored.starts_with("pbkdf2:"));
        assert!(verify_password("correct horse battery staple", &stored));
    }

    #[test]
    fn wrong_password_rejected() {
        let stored = hash_password("password123");
        assert!(!verify_password("password124", &stored));
        assert!(!verify_password("", &stored));
    }

    #[test]
    fn salts_are_unique_per_hash() {
        let a = hash_password("same");
        let b = hash_password("same");
        assert_ne!(a, b);
        assert!(verify_password("same", &a));
        assert!(verify_password("same", &b));
    }

    #[test]
    fn malformed_stored_hash_rejected() {
        assert!(!verify_password("pw", ""));
        assert!(!verify_password("pw", "plaintext"));
        assert!(!verify_password("pw", "pbkdf2:abc:00:00"));
        assert!(!verify_password("pw", "pbkdf2:1000:zz:00"));
        assert!(!verify_password("pw", "pbkdf2:1000:00:00:extra"));
        assert!(!verify_password("pw", "scrypt:1000:00:00"));
    }

    #[test]
    fn verify_honors_embedded_iteration_count() {
        // A hash created with a lower iteration count still verifies.
        let salt = [7u8; SALT_LEN];
        let hash = derive("pw", &salt, 1_000);
        let stored = format!("pbkdf2:1000:{}:{}", hex::encode(salt), hex::encode(hash));
        assert!(verify_password("pw", &stored));
        assert!(!verify_password("other", &stored));
    }
}
