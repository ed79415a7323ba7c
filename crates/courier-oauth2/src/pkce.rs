//! PKCE verifier/challenge pairs and the CSRF `state` value.

use base64::Engine;
use rand::Rng;
use sha2::Digest;

/// 32 random bytes, hex-encoded.
pub fn generate_state() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.r#gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// 32 random bytes, base64url without padding (43 chars, inside RFC 7636's 43..=128).
pub fn generate_verifier() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.r#gen();
    base64_url(&bytes)
}

/// S256 code challenge for `verifier`.
pub fn challenge_for(verifier: &str) -> String {
    base64_url(&sha2::Sha256::digest(verifier.as_bytes()))
}

fn base64_url(bytes: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_is_64_hex_chars() {
        let s = generate_state();
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(s, generate_state());
    }

    #[test]
    fn verifier_length_within_rfc_bounds() {
        let v = generate_verifier();
        assert_eq!(v.len(), 43);
        assert!(v.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn challenge_matches_rfc7636_example() {
        // Appendix B of RFC 7636.
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }
}
