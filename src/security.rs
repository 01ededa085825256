use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Header carrying the webhook signature
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Base64 HMAC-SHA256 of `body` keyed with the channel secret.
pub fn sign(channel_secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(channel_secret.as_bytes()).ok()?;
    mac.update(body);
    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Check a webhook's `x-line-signature` against the raw request body.
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    sign(channel_secret, body)
        .is_some_and(|expected| constant_time_compare(&expected, signature.trim()))
}
