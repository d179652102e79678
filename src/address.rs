//! Ethereum wallet addresses.
//!
//! Addresses are accepted as `0x` + 40 hex digits in all-lowercase,
//! all-uppercase or EIP-55 mixed case. Mixed case input must carry a valid
//! EIP-55 checksum. Equality is byte-wise, so comparison is case-insensitive.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// A validated 20-byte wallet address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress([u8; 20]);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidAddressError {
    #[error("address must start with 0x")]
    MissingPrefix,

    #[error("address must have 40 hex digits, got {0}")]
    InvalidLength(usize),

    #[error("address contains non-hex characters")]
    NotHex,

    #[error("address has an invalid EIP-55 checksum")]
    InvalidChecksum,
}

impl WalletAddress {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        WalletAddress(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Render the EIP-55 mixed-case checksum form.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0x0f
            };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for WalletAddress {
    type Err = InvalidAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(InvalidAddressError::MissingPrefix)?;

        if digits.len() != 40 {
            return Err(InvalidAddressError::InvalidLength(digits.len()));
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(InvalidAddressError::NotHex);
        }

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes).map_err(|_| InvalidAddressError::NotHex)?;
        let address = WalletAddress(bytes);

        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper && address.to_checksum()[2..] != *digits {
            return Err(InvalidAddressError::InvalidChecksum);
        }

        Ok(address)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = InvalidAddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WalletAddress> for String {
    fn from(address: WalletAddress) -> Self {
        address.to_string()
    }
}

/// Lowercase `0x`-prefixed form, used as the storage key.
impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletAddress({})", self)
    }
}
