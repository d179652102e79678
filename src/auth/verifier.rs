//! Signature verification and session issuance.

use super::session::generate_session_token;
use super::verify::recover_address;
use super::AuthError;
use crate::address::WalletAddress;
use crate::clock::Clock;
use crate::models::Session;
use crate::storage::{ChallengeStore, SessionStore};
use chrono::Duration;
use std::sync::Arc;

/// Consumes pending challenges and mints sessions.
pub struct SignatureVerifier {
    challenges: Arc<dyn ChallengeStore>,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
}

impl SignatureVerifier {
    pub fn new(
        challenges: Arc<dyn ChallengeStore>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            challenges,
            sessions,
            clock,
            session_ttl,
        }
    }

    /// Verify that `signature` over the pending nonce for `address` was made
    /// by that address, and open a session for it.
    ///
    /// The pending challenge is consumed whether or not the signature
    /// matches; a failed attempt needs a fresh nonce.
    pub async fn verify(&self, address: &str, signature: &str) -> Result<Session, AuthError> {
        let address: WalletAddress = address.parse()?;

        let challenge = self
            .challenges
            .take(&address)
            .await?
            .ok_or(AuthError::NoPendingChallenge(address))?;

        let now = self.clock.now();
        if challenge.is_expired(now) {
            return Err(AuthError::ChallengeExpired(address));
        }

        match recover_address(&challenge.nonce, signature) {
            Ok(signer) if signer == address => {}
            Ok(signer) => {
                tracing::debug!(address = %address, signer = %signer, "Recovered signer differs from claimed address");
                return Err(AuthError::SignatureMismatch(address));
            }
            Err(e) => {
                tracing::debug!(address = %address, error = %e, "Signature could not be recovered");
                return Err(AuthError::SignatureMismatch(address));
            }
        }

        let expires_at = now
            .checked_add_signed(self.session_ttl)
            .ok_or(AuthError::ExpiryOutOfRange(address))?;

        let session = Session {
            address,
            token: generate_session_token(),
            issued_at: now,
            expires_at,
        };
        self.sessions.insert(&session).await?;

        tracing::info!(action = "auth_success", address = %address, expires_at = %session.expires_at, "Wallet authenticated");

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::NonceIssuer;
    use crate::clock::ManualClock;
    use crate::storage::memory::MemoryStore;
    use crate::wallet::{LocalWallet, MessageSigner};

    struct Harness {
        issuer: NonceIssuer,
        verifier: Arc<SignatureVerifier>,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new(clock.clone()));
        Harness {
            issuer: NonceIssuer::new(store.clone(), clock.clone(), Duration::minutes(5)),
            verifier: Arc::new(SignatureVerifier::new(
                store.clone(),
                store.clone(),
                clock.clone(),
                Duration::hours(1),
            )),
            store,
            clock,
        }
    }

    async fn sign_in_material(h: &Harness, wallet: &LocalWallet) -> (String, String) {
        let address = wallet.address().to_checksum();
        let challenge = h.issuer.issue(&address).await.unwrap();
        let signature = wallet.sign_message(&challenge.nonce).unwrap();
        (address, signature)
    }

    #[tokio::test]
    async fn test_verify_success() {
        let h = harness();
        let wallet = LocalWallet::random();
        let (address, signature) = sign_in_material(&h, &wallet).await;

        let session = h.verifier.verify(&address, &signature).await.unwrap();
        assert_eq!(session.address, wallet.address());
        assert_eq!(session.issued_at, h.clock.now());
        assert_eq!(session.expires_at, h.clock.now() + Duration::hours(1));

        let stored = h.store.get(&session.token).await.unwrap();
        assert_eq!(stored, Some(session));
    }

    #[tokio::test]
    async fn test_verify_is_case_insensitive() {
        let h = harness();
        let wallet = LocalWallet::random();
        let (address, signature) = sign_in_material(&h, &wallet).await;

        let session = h
            .verifier
            .verify(&address.to_lowercase(), &signature)
            .await
            .unwrap();
        assert_eq!(session.address, wallet.address());
    }

    #[tokio::test]
    async fn test_verify_replay_fails() {
        let h = harness();
        let wallet = LocalWallet::random();
        let (address, signature) = sign_in_material(&h, &wallet).await;

        h.verifier.verify(&address, &signature).await.unwrap();
        let replay = h.verifier.verify(&address, &signature).await;
        assert!(matches!(replay, Err(AuthError::NoPendingChallenge(_))));
    }

    #[tokio::test]
    async fn test_verify_previous_nonce_fails() {
        let h = harness();
        let wallet = LocalWallet::random();
        let (address, old_signature) = sign_in_material(&h, &wallet).await;

        // A second issue replaces the nonce the old signature covers
        h.issuer.issue(&address).await.unwrap();

        let result = h.verifier.verify(&address, &old_signature).await;
        assert!(matches!(result, Err(AuthError::SignatureMismatch(_))));
    }

    #[tokio::test]
    async fn test_verify_expired_challenge() {
        let h = harness();
        let wallet = LocalWallet::random();
        let (address, signature) = sign_in_material(&h, &wallet).await;

        h.clock.advance(Duration::minutes(5));

        let result = h.verifier.verify(&address, &signature).await;
        assert!(matches!(result, Err(AuthError::ChallengeExpired(_))));

        // The expired challenge is gone as well
        let retry = h.verifier.verify(&address, &signature).await;
        assert!(matches!(retry, Err(AuthError::NoPendingChallenge(_))));
    }

    #[tokio::test]
    async fn test_verify_just_before_expiry() {
        let h = harness();
        let wallet = LocalWallet::random();
        let (address, signature) = sign_in_material(&h, &wallet).await;

        h.clock.advance(Duration::minutes(5) - Duration::seconds(1));
        assert!(h.verifier.verify(&address, &signature).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_wrong_signer() {
        let h = harness();
        let wallet = LocalWallet::random();
        let impostor = LocalWallet::random();

        let address = wallet.address().to_checksum();
        let challenge = h.issuer.issue(&address).await.unwrap();
        let signature = impostor.sign_message(&challenge.nonce).unwrap();

        let result = h.verifier.verify(&address, &signature).await;
        assert!(matches!(result, Err(AuthError::SignatureMismatch(_))));
    }

    #[tokio::test]
    async fn test_verify_bogus_signature_consumes_challenge() {
        let h = harness();
        let wallet = LocalWallet::random();
        let (address, signature) = sign_in_material(&h, &wallet).await;

        let result = h.verifier.verify(&address, "bogus-signature").await;
        assert!(matches!(result, Err(AuthError::SignatureMismatch(_))));

        // The correct signature no longer helps: the nonce was consumed
        let result = h.verifier.verify(&address, &signature).await;
        assert!(matches!(result, Err(AuthError::NoPendingChallenge(_))));
    }

    #[tokio::test]
    async fn test_verify_without_challenge() {
        let h = harness();
        let wallet = LocalWallet::random();
        let signature = wallet.sign_message("anything").unwrap();

        let result = h
            .verifier
            .verify(&wallet.address().to_string(), &signature)
            .await;
        assert!(matches!(result, Err(AuthError::NoPendingChallenge(_))));
    }

    #[tokio::test]
    async fn test_verify_invalid_address() {
        let h = harness();
        let result = h.verifier.verify("0xnope", "0x00").await;
        assert!(matches!(result, Err(AuthError::InvalidAddress(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_verify_single_winner() {
        let h = harness();
        let wallet = LocalWallet::random();
        let (address, signature) = sign_in_material(&h, &wallet).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let verifier = h.verifier.clone();
            let address = address.clone();
            let signature = signature.clone();
            handles.push(tokio::spawn(async move {
                verifier.verify(&address, &signature).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AuthError::NoPendingChallenge(_)) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_verify_unrepresentable_session_expiry() {
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let issuer = NonceIssuer::new(store.clone(), clock.clone(), Duration::minutes(5));
        let verifier = SignatureVerifier::new(store.clone(), store.clone(), clock, Duration::MAX);

        let wallet = LocalWallet::random();
        let address = wallet.address().to_checksum();
        let challenge = issuer.issue(&address).await.unwrap();
        let signature = wallet.sign_message(&challenge.nonce).unwrap();

        let result = verifier.verify(&address, &signature).await;
        assert!(matches!(result, Err(AuthError::ExpiryOutOfRange(_))));
    }
}
