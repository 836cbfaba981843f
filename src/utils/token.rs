use rand::{RngCore, rngs::OsRng};

use crate::config::SESSION_TOKEN_BYTES;

/// Generates an unguessable session handle: 256 bits from the OS RNG, hex-encoded.
pub fn generate_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
