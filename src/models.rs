//! Request and response models for the API.
//!
//! All models use serde for serialization/deserialization.
//! Storage models are shared by the in-memory and Redis stores.

use crate::address::WalletAddress;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Auth Models
// ============================================================================

/// Query for `GET /api/nonce`.
#[derive(Debug, Deserialize)]
pub struct NonceQuery {
    #[serde(default)]
    pub address: String,
}

/// Response containing the message to sign.
#[derive(Debug, Serialize, Deserialize)]
pub struct NonceResponse {
    pub address: WalletAddress,
    pub nonce: String,
}

/// Request to verify a signed challenge.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub address: String,
    pub signature: String, // hex, 65 bytes
}

/// Response after successful verification.
#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Response for `GET /api/me`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    pub address: WalletAddress,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Storage Models
// ============================================================================

/// A pending sign-in challenge. At most one exists per address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    pub address: WalletAddress,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// An authenticated session bound to the address that proved key ownership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub address: WalletAddress,
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        SessionInfo {
            address: session.address,
            issued_at: session.issued_at,
            expires_at: session.expires_at,
        }
    }
}
