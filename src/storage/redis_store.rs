//! Redis-backed store.
//!
//! Expiry is delegated to key TTLs, so `purge_expired` is a no-op here.

use super::session as ops;
use super::{ChallengeStore, RateLimitStore, SessionStore, StoreError};
use crate::address::WalletAddress;
use crate::clock::Clock;
use crate::models::{Challenge, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use std::sync::Arc;

pub struct RedisStore {
    client: redis::Client,
    challenge_grace_secs: u64,
    clock: Arc<dyn Clock>,
}

impl RedisStore {
    pub fn new(client: redis::Client, challenge_grace_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            client,
            challenge_grace_secs,
            clock,
        }
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StoreError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl ChallengeStore for RedisStore {
    async fn put(&self, challenge: &Challenge) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        ops::store_challenge(&mut con, challenge, self.challenge_grace_secs).await
    }

    async fn take(&self, address: &WalletAddress) -> Result<Option<Challenge>, StoreError> {
        let mut con = self.connection().await?;
        ops::take_challenge(&mut con, address).await
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<usize, StoreError> {
        Ok(0)
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn insert(&self, session: &Session) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        ops::store_session(&mut con, session).await
    }

    async fn get(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let mut con = self.connection().await?;
        match ops::get_session(&mut con, token).await? {
            // Key TTLs are whole seconds, so the key can briefly outlive the session
            Some(session) if session.is_expired(self.clock.now()) => {
                ops::delete_session(&mut con, token).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn remove(&self, token: &str) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;
        ops::delete_session(&mut con, token).await
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<usize, StoreError> {
        Ok(0)
    }
}

#[async_trait]
impl RateLimitStore for RedisStore {
    async fn check(&self, key: &str, max: u32, window_secs: u64) -> Result<bool, StoreError> {
        let mut con = self.connection().await?;
        ops::check_rate_limit(&mut con, key, max, window_secs).await
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<usize, StoreError> {
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, NonceIssuer, SignatureVerifier};
    use crate::clock::ManualClock;
    use crate::wallet::{LocalWallet, MessageSigner};
    use chrono::Duration;

    // Note: these tests require a running Redis instance.
    // They skip when REDIS_URL is unreachable.
    async fn redis_store(grace_secs: u64) -> Option<(Arc<RedisStore>, Arc<ManualClock>)> {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let client = match redis::Client::open(redis_url) {
            Ok(c) => c,
            Err(_) => {
                eprintln!("Skipping test: Redis not available");
                return None;
            }
        };
        if client.get_multiplexed_async_connection().await.is_err() {
            eprintln!("Skipping test: Redis connection failed");
            return None;
        }

        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(RedisStore::new(client, grace_secs, clock.clone()));
        Some((store, clock))
    }

    #[tokio::test]
    async fn test_expired_challenge_reported_during_grace() {
        let Some((store, clock)) = redis_store(300).await else {
            return;
        };
        let issuer = NonceIssuer::new(store.clone(), clock.clone(), Duration::minutes(5));
        let verifier =
            SignatureVerifier::new(store.clone(), store.clone(), clock.clone(), Duration::hours(1));

        let wallet = LocalWallet::random();
        let address = wallet.address().to_checksum();
        let challenge = issuer.issue(&address).await.unwrap();
        let signature = wallet.sign_message(&challenge.nonce).unwrap();

        // Past the expiry window, but the key is still held for the grace period
        clock.advance(Duration::minutes(6));

        let result = verifier.verify(&address, &signature).await;
        assert!(matches!(result, Err(AuthError::ChallengeExpired(_))));

        let retry = verifier.verify(&address, &signature).await;
        assert!(matches!(retry, Err(AuthError::NoPendingChallenge(_))));
    }

    #[tokio::test]
    async fn test_get_drops_expired_session() {
        let Some((store, clock)) = redis_store(0).await else {
            return;
        };
        let now = clock.now();
        let session = Session {
            address: WalletAddress::from_bytes([0xc3; 20]),
            token: "test-expired-session-token".to_string(),
            issued_at: now,
            expires_at: now + Duration::seconds(60),
        };
        store.insert(&session).await.unwrap();
        assert!(store.get(&session.token).await.unwrap().is_some());

        clock.advance(Duration::seconds(61));
        assert_eq!(store.get(&session.token).await.unwrap(), None);
        assert!(!store.remove(&session.token).await.unwrap());
    }
}
