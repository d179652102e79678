//! Token and nonce generation for authentication.

use base64::{Engine as _, engine::general_purpose};
use rand::Rng;

/// Prefix of every challenge message. Wallets show this text to the user.
pub const CHALLENGE_PREFIX: &str = "Sign this message to authenticate: ";

/// Generate a cryptographically random session token.
///
/// Returns a URL-safe base64 string (43 characters) from 32 random bytes.
pub fn generate_session_token() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a cryptographically random challenge message.
///
/// 32 random bytes, hex encoded after [`CHALLENGE_PREFIX`].
pub fn generate_challenge_nonce() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);
    format!("{}{}", CHALLENGE_PREFIX, hex::encode(bytes))
}
