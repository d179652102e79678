//! Message signing with a local private key.
//!
//! In the browser the wallet extension signs the challenge. [`LocalWallet`]
//! does the same thing with a raw secp256k1 key so the flow can be driven
//! from tests and from the `sign` CLI subcommand.

use crate::address::WalletAddress;
use crate::auth::verify::{address_of, eth_message_hash};
use k256::ecdsa::SigningKey;
use zeroize::{Zeroize, Zeroizing};

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Invalid private key hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// The "sign arbitrary message" capability of a wallet.
pub trait MessageSigner {
    fn address(&self) -> WalletAddress;

    /// Sign `message` with the EIP-191 personal-message scheme and return
    /// the 65-byte `r || s || v` signature as `0x`-prefixed hex.
    fn sign_message(&self, message: &str) -> Result<String, WalletError>;
}

pub struct LocalWallet {
    key: SigningKey,
    address: WalletAddress,
}

impl LocalWallet {
    /// Generate a fresh random key.
    pub fn random() -> Self {
        loop {
            let mut seed = [0u8; 32];
            rand::fill(&mut seed);
            let key = SigningKey::from_slice(&seed);
            seed.zeroize();
            // Out-of-range scalars are astronomically rare; draw again
            if let Ok(key) = key {
                return Self::from_key(key);
            }
        }
    }

    /// Load a key from hex (with or without `0x`).
    pub fn from_hex(private_key: &str) -> Result<Self, WalletError> {
        let trimmed = private_key.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = Zeroizing::new(hex::decode(digits)?);
        let key =
            SigningKey::from_slice(&bytes).map_err(|e| WalletError::InvalidKey(e.to_string()))?;
        Ok(Self::from_key(key))
    }

    fn from_key(key: SigningKey) -> Self {
        let address = address_of(key.verifying_key());
        Self { key, address }
    }
}

impl MessageSigner for LocalWallet {
    fn address(&self) -> WalletAddress {
        self.address
    }

    fn sign_message(&self, message: &str) -> Result<String, WalletError> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&eth_message_hash(message))
            .map_err(|e| WalletError::Signing(e.to_string()))?;

        let mut bytes = Vec::with_capacity(65);
        bytes.extend_from_slice(&signature.to_bytes());
        bytes.push(recovery_id.to_byte() + 27);
        Ok(format!("0x{}", hex::encode(bytes)))
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("key", &"[REDACTED]")
            .field("address", &self.address)
            .finish()
    }
}
