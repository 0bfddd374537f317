//! Base64 helpers used consistently across the `passkey-rp` crates.
//!
//! Webauthn messages use `base64url` without padding; these helpers also
//! tolerate padded input since not every client library strips it.

use data_encoding::{BASE64URL_NOPAD, BASE64_NOPAD};

/// Convert bytes to base64url without padding.
pub fn base64url(data: &[u8]) -> String {
    BASE64URL_NOPAD.encode(data)
}

/// Try parsing from base64url, with or without padding.
pub fn try_from_base64url(input: &str) -> Option<Vec<u8>> {
    BASE64URL_NOPAD
        .decode(input.trim_end_matches('=').as_bytes())
        .ok()
}

/// Try parsing from standard base64, with or without padding.
pub fn try_from_base64(input: &str) -> Option<Vec<u8>> {
    BASE64_NOPAD
        .decode(input.trim_end_matches('=').as_bytes())
        .ok()
}
