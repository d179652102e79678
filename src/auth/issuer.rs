//! Challenge issuance.

use super::session::generate_challenge_nonce;
use super::AuthError;
use crate::address::WalletAddress;
use crate::clock::Clock;
use crate::models::Challenge;
use crate::storage::ChallengeStore;
use chrono::Duration;
use std::sync::Arc;

/// Issues single-use sign-in challenges.
pub struct NonceIssuer {
    store: Arc<dyn ChallengeStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl NonceIssuer {
    pub fn new(store: Arc<dyn ChallengeStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Issue a fresh challenge for `address`, replacing any pending one.
    pub async fn issue(&self, address: &str) -> Result<Challenge, AuthError> {
        let address: WalletAddress = address.parse()?;
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or(AuthError::ExpiryOutOfRange(address))?;

        let challenge = Challenge {
            address,
            nonce: generate_challenge_nonce(),
            issued_at: now,
            expires_at,
        };

        self.store.put(&challenge).await?;

        tracing::debug!(action = "challenge_issued", address = %address, expires_at = %challenge.expires_at, "Challenge issued");

        Ok(challenge)
    }
}
