// Password hash records stored on notes and in app data
// Two shapes coexist in persisted data: a bare hex digest and a salted record

use serde::{Deserialize, Serialize};

/// Stored password verifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PasswordHash {
    /// PBKDF2-HMAC-SHA256, hex-encoded hash and salt
    Salted {
        hash: String,
        salt: String,
        iterations: u32,
    },
    /// Unsalted SHA-256 hex digest written by older versions
    Legacy(String),
}

impl PasswordHash {
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_shapes() {
        let legacy: PasswordHash = serde_json::from_str("\"abc123\"").unwrap();
        assert_eq!(legacy, PasswordHash::Legacy("abc123".to_string()));
        assert!(legacy.is_legacy());

        let salted: PasswordHash =
            serde_json::from_str(r#"{"hash":"ff","salt":"00","iterations":100000}"#).unwrap();
        assert!(!salted.is_legacy());
        assert!(matches!(salted, PasswordHash::Salted { iterations: 100000, .. }));
    }
}
