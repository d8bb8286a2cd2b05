//! Subject keys: normalization and log-safe fingerprints.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use lodge_common::LodgeError;
use sha2::{Digest, Sha256};

/// Fingerprint length in base64url characters
const FINGERPRINT_LEN: usize = 12;

/// Normalize an email into a subject key (trimmed, ASCII-lowercased)
pub fn normalize_subject(email: &str) -> Result<String, LodgeError> {
    let subject = email.trim().to_ascii_lowercase();

    if subject.is_empty() {
        return Err(LodgeError::InvalidInput("email is required".to_string()));
    }
    match subject.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(subject),
        _ => Err(LodgeError::InvalidInput(
            "email must look like name@domain".to_string(),
        )),
    }
}

/// Stable, non-reversible identifier for a subject, used in logs instead of
/// the address itself
pub fn fingerprint(subject: &str) -> String {
    let digest = Sha256::digest(subject.as_bytes());
    let mut encoded = URL_SAFE_NO_PAD.encode(digest);
    encoded.truncate(FINGERPRINT_LEN);
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_subject() {
        assert_eq!(
            normalize_subject("  Guest@Example.COM ").unwrap(),
            "guest@example.com"
        );
        assert!(normalize_subject("   ").is_err());
        assert!(normalize_subject("no-at-sign").is_err());
        assert!(normalize_subject("@example.com").is_err());
    }

    #[test]
    fn test_fingerprint_is_stable_and_opaque() {
        let a = fingerprint("guest@example.com");
        assert_eq!(a.len(), FINGERPRINT_LEN);
        assert_eq!(a, fingerprint("guest@example.com"));
        assert_ne!(a, fingerprint("other@example.com"));
        assert!(!a.contains('@'));
    }
}
