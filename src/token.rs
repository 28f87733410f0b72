//! Opaque token generation.
//!
//! Session IDs, read/write credentials, and message IDs are all URL-safe
//! base64 encodings of bytes drawn from the OS random source.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::TryRngCore;
use rand::rngs::OsRng;

/// Raw byte length of a session ID (16 chars encoded).
pub const SESSION_ID_BYTES: usize = 12;
/// Raw byte length of a read or write token (32 chars encoded).
pub const ACCESS_TOKEN_BYTES: usize = 24;
/// Raw byte length of a message ID (12 chars encoded).
pub const MESSAGE_ID_BYTES: usize = 9;

/// Generate an unpadded URL-safe token from `n` cryptographically random bytes.
///
/// Returns an empty string if the OS random source fails. Callers treat that
/// as a degraded token rather than failing the request; the failure itself is
/// logged.
#[must_use]
pub fn generate(n: usize) -> String {
    let mut bytes = vec![0u8; n];
    if let Err(e) = OsRng.try_fill_bytes(&mut bytes) {
        tracing::error!(error = %e, "failed to read from OS random source");
        return String::new();
    }
    URL_SAFE_NO_PAD.encode(bytes)
}
