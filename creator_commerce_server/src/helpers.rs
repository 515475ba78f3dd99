use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Base64-encoded HMAC-SHA256 over the raw request body, as the platform computes it for the
/// `X-Shopify-Hmac-Sha256` header.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data);
    base64::encode(mac.finalize().into_bytes())
}

/// Constant-time byte comparison for credentials, so the admin key check doesn't leak prefix
/// lengths through timing.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hmac_is_stable_and_key_sensitive() {
        let body = br#"{"id": 1001}"#;
        let sig = calculate_hmac("topsecret", body);
        assert_eq!(sig, calculate_hmac("topsecret", body));
        assert_ne!(sig, calculate_hmac("othersecret", body));
        assert_ne!(sig, calculate_hmac("topsecret", b"{}"));
        // Base64 of a 32-byte digest is always 44 chars with padding.
        assert_eq!(sig.len(), 44);
    }

    #[test]
    fn constant_time_eq_compares_correctly() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"ab"));
        assert!(constant_time_eq(b"", b""));
    }
}
