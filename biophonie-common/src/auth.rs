//! API token hashing
//!
//! Accounts never store their API token, only its SHA-256 digest (lowercase hex).
//! Tokens are 32 random bytes encoded as hex.
//!
//! Pure functions only. HTTP extraction lives in the service crate.

use rand::RngCore;
use sha2::digest::Output;
use sha2::{Digest, Sha256};

/// Generate a new random API token
pub fn generate_token() -> String {
    let mut bytes = Output::<Sha256>::default();
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{:x}", bytes)
}

/// Digest stored in `accounts.token_hash` for a given token
///
/// # Examples
///
/// ```
/// use biophonie_common::auth::hash_token;
///
/// let digest = hash_token("abc");
/// assert_eq!(digest.len(), 64);
/// assert_eq!(digest, hash_token("abc"));
/// ```
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Extract the token from an `Authorization` header value (`Bearer <token>`)
pub fn parse_bearer(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_known_value() {
        // SHA-256("abc")
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_generated_tokens_differ() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_bearer() {
        assert_eq!(parse_bearer("Bearer abc123"), Some("abc123"));
        assert_eq!(parse_bearer("bearer  abc123 "), Some("abc123"));
        assert_eq!(parse_bearer("Basic abc123"), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("abc123"), None);
    }
}
