use sha2::{Digest, Sha224};

/// Length of the client-facing refresh token identifier.
pub const REFRESH_HASH_LEN: usize = 20;

/// Short identifier handed to the client instead of the refresh token itself.
pub fn refresh_token_hash(token: &str) -> String {
    let mut h = Sha224::new();
    h.update(token.as_bytes());
    let mut hex = hex::encode(h.finalize());
    hex.truncate(REFRESH_HASH_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_short_hex_and_stable() {
        let h = refresh_token_hash("header.payload.signature");
        assert_eq!(h.len(), REFRESH_HASH_LEN);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h, refresh_token_hash("header.payload.signature"));
        assert_ne!(h, refresh_token_hash("header.payload.signaturf"));
    }

    #[test]
    fn hash_is_sha224_prefix() {
        // sha224("abc") = 23097d22 3405d822 8642a477 bda255b3 2aadbce4 bda0b3f7 e36c9da7
        assert_eq!(refresh_token_hash("abc"), "23097d223405d8228642");
    }
}
