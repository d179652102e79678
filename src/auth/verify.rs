//! EIP-191 personal-message signature recovery.

use crate::address::WalletAddress;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Invalid signature hex")]
    InvalidHex,

    #[error("Invalid signature length: expected 65 bytes, got {0}")]
    InvalidLength(usize),

    #[error("Invalid recovery byte: {0}")]
    InvalidRecoveryId(u8),

    #[error("Malformed signature")]
    Malformed,

    #[error("Public key recovery failed")]
    RecoveryFailed,
}

/// Hash `message` the way `personal_sign` does:
/// `keccak256("\x19Ethereum Signed Message:\n" + len(message) + message)`.
pub fn eth_message_hash(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(format!("\x19Ethereum Signed Message:\n{}", message.len()).as_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Derive the address controlled by a public key: the last 20 bytes of the
/// keccak256 hash of the uncompressed point without its tag byte.
pub fn address_of(key: &VerifyingKey) -> WalletAddress {
    let point = key.to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);

    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    WalletAddress::from_bytes(bytes)
}

/// Recover the address that signed `message`.
///
/// # Arguments
/// * `message` - The exact string the wallet was asked to sign
/// * `signature_hex` - 65-byte `r || s || v` signature, optional `0x` prefix.
///   `v` may be `0`/`1` or `27`/`28`.
pub fn recover_address(message: &str, signature_hex: &str) -> Result<WalletAddress, SignatureError> {
    let trimmed = signature_hex.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits).map_err(|_| SignatureError::InvalidHex)?;

    if bytes.len() != 65 {
        return Err(SignatureError::InvalidLength(bytes.len()));
    }

    let v = bytes[64];
    let recovery_id = match v {
        0 | 1 => RecoveryId::from_byte(v),
        27 | 28 => RecoveryId::from_byte(v - 27),
        _ => None,
    }
    .ok_or(SignatureError::InvalidRecoveryId(v))?;

    let signature = Signature::from_slice(&bytes[..64]).map_err(|_| SignatureError::Malformed)?;

    // High-s signatures are valid on the curve; normalize and flip parity
    let (signature, recovery_id) = match signature.normalize_s() {
        Some(normalized) => (
            normalized,
            RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
        ),
        None => (signature, recovery_id),
    };

    let key = VerifyingKey::recover_from_prehash(&eth_message_hash(message), &signature, recovery_id)
        .map_err(|_| SignatureError::RecoveryFailed)?;

    Ok(address_of(&key))
}
