// Password hashing for note, document and app locks
// Salted records use PBKDF2-HMAC-SHA256; bare SHA-256 digests are still accepted

use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::{Result, UninoteError};
use crate::models::PasswordHash;

const SALT_SIZE: usize = 16;
const KEY_SIZE: usize = 32;
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Derive a 256-bit key from a password with PBKDF2-HMAC-SHA256
fn derive_key(password: &str, salt: &[u8], iterations: u32) -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, key.as_mut_slice());
    key
}

/// Hash a new password into a salted record
pub fn hash_password(password: &str, iterations: u32) -> Result<PasswordHash> {
    if password.is_empty() {
        return Err(UninoteError::validation("Password cannot be empty"));
    }
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill(&mut salt);

    let key = derive_key(password, &salt, iterations);
    Ok(PasswordHash::Salted {
        hash: hex::encode(key.as_slice()),
        salt: hex::encode(salt),
        iterations,
    })
}

/// Unsalted SHA-256 hex digest, the format older data carries
pub fn legacy_hash(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Check a candidate password against either stored shape
pub fn verify_password(password: &str, stored: &PasswordHash) -> bool {
    if password.is_empty() {
        return false;
    }
    match stored {
        PasswordHash::Legacy(digest) => legacy_hash(password).eq_ignore_ascii_case(digest),
        PasswordHash::Salted { hash, salt, iterations } => {
            let Ok(salt) = hex::decode(salt) else {
                return false;
            };
            let Ok(expected) = hex::decode(hash) else {
                return false;
            };
            let key = derive_key(password, &salt, *iterations);
            key.as_slice() == expected.as_slice()
        }
    }
}

/// New passwords must be non-empty and typed the same way twice
pub fn validate_new_password(password: &str, confirmation: &str) -> Result<()> {
    if password.is_empty() {
        return Err(UninoteError::validation("Password cannot be empty"));
    }
    if password != confirmation {
        return Err(UninoteError::validation("Passwords do not match"));
    }
    Ok(())
}

/// Hash on the blocking pool; PBKDF2 at full iteration count is slow
pub async fn hash_password_async(password: String, iterations: u32) -> Result<PasswordHash> {
    let password = Zeroizing::new(password);
    tokio::task::spawn_blocking(move || hash_password(&password, iterations))
        .await
        .map_err(|e| UninoteError::validation(format!("Hashing task failed: {}", e)))?
}

pub async fn verify_password_async(password: String, stored: PasswordHash) -> bool {
    let password = Zeroizing::new(password);
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salted_roundtrip() {
        let stored = hash_password("hunter2", 1_000).unwrap();
        assert!(verify_password("hunter2", &stored));
        assert!(!verify_password("hunter3", &stored));
        assert!(!verify_password("", &stored));
    }

    #[test]
    fn test_salts_differ() {
        let a = hash_password("same", 1_000).unwrap();
        let b = hash_password("same", 1_000).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_legacy_digest() {
        // SHA-256("password")
        let stored = PasswordHash::Legacy(
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8".to_string(),
        );
        assert!(verify_password("password", &stored));
        assert!(!verify_password("Password", &stored));
    }

    #[test]
    fn test_known_pbkdf2_vector() {
        // RFC 7914 test vector, truncated to 32 bytes
        let key = derive_key("passwd", b"salt", 1);
        assert_eq!(
            hex::encode(key.as_slice()),
            "55ac046e56e3089fec1691c22544b605f94185216dde0465e68b9d57c20dacbc"
        );
    }

    #[test]
    fn test_corrupt_record_never_verifies() {
        let stored = PasswordHash::Salted {
            hash: "zz".into(),
            salt: "not-hex".into(),
            iterations: 10,
        };
        assert!(!verify_password("anything", &stored));
    }

    #[test]
    fn test_validate_new_password() {
        assert!(validate_new_password("a", "a").is_ok());
        assert!(validate_new_password("", "").is_err());
        assert!(validate_new_password("a", "b").is_err());
    }
}
