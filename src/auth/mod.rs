//! Credential issuance and bearer-key handling
//!
//! The api_key is the sole authentication token: an opaque, prefixed hex
//! secret handed out once at registration. There is no rotation and no
//! secondary factor; compromise equals impersonation.

pub mod registry;

use rand::RngCore;

pub use registry::AgentRegistry;

/// Prefix on every issued credential
pub const API_KEY_PREFIX: &str = "grf_";

/// Bytes of entropy behind each credential (192 bits)
const API_KEY_ENTROPY_BYTES: usize = 24;

/// Generate a fresh api_key: prefix + 48 hex chars.
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; API_KEY_ENTROPY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{}{}", API_KEY_PREFIX, hex::encode(bytes))
}

/// Extract the credential from an Authorization header.
/// Supports "Bearer <key>" format and raw keys.
pub fn extract_key_from_header(auth_header: Option<&str>) -> Option<&str> {
    let header = auth_header?;

    if let Some(key) = header.strip_prefix("Bearer ") {
        let key = key.trim();
        if !key.is_empty() {
            return Some(key);
        }
    }

    if !header.contains(' ') {
        let key = header.trim();
        if !key.is_empty() {
            return Some(key);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_have_prefix_and_entropy() {
        let key = generate_api_key();
        assert!(key.starts_with(API_KEY_PREFIX));
        assert_eq!(key.len(), API_KEY_PREFIX.len() + API_KEY_ENTROPY_BYTES * 2);
        assert!(key[API_KEY_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_keys_are_unique() {
        assert_ne!(generate_api_key(), generate_api_key());
    }

    #[test]
    fn extracts_bearer_keys() {
        assert_eq!(
            extract_key_from_header(Some("Bearer grf_abc")),
            Some("grf_abc")
        );
        assert_eq!(extract_key_from_header(Some("grf_abc")), Some("grf_abc"));
        assert_eq!(extract_key_from_header(Some("Bearer ")), None);
        assert_eq!(extract_key_from_header(Some("Basic foo")), None);
        assert_eq!(extract_key_from_header(None), None);
    }
}
