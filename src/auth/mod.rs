//! Challenge-response wallet authentication.
//!
//! [`NonceIssuer`] hands out single-use challenges, [`SignatureVerifier`]
//! consumes them and mints sessions.

pub mod issuer;
pub mod middleware;
pub mod session;
pub mod verifier;
pub mod verify;

pub use issuer::NonceIssuer;
pub use middleware::{AppState, AuthSession};
pub use session::{generate_challenge_nonce, generate_session_token};
pub use verifier::SignatureVerifier;
pub use verify::recover_address;

use crate::address::{InvalidAddressError, WalletAddress};
use crate::storage::StoreError;

/// Failures of the sign-in flow.
///
/// All but `ExpiryOutOfRange` are recoverable by requesting a fresh nonce
/// and retrying; that one means the configured TTL cannot be represented.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] InvalidAddressError),

    #[error("No pending challenge for {0}")]
    NoPendingChallenge(WalletAddress),

    #[error("Challenge for {0} expired")]
    ChallengeExpired(WalletAddress),

    #[error("Signature does not match {0}")]
    SignatureMismatch(WalletAddress),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StoreError),

    #[error("Expiry out of range for {0}")]
    ExpiryOutOfRange(WalletAddress),
}

impl AuthError {
    /// Stable name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::InvalidAddress(_) => "invalid_address",
            AuthError::NoPendingChallenge(_) => "no_pending_challenge",
            AuthError::ChallengeExpired(_) => "challenge_expired",
            AuthError::SignatureMismatch(_) => "signature_mismatch",
            AuthError::StorageUnavailable(_) => "storage_unavailable",
            AuthError::ExpiryOutOfRange(_) => "expiry_out_of_range",
        }
    }
}
