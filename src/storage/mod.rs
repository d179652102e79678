//! Challenge, session and rate-limit storage.
//!
//! The auth core only talks to the traits below. Two backends implement
//! them: [`memory::MemoryStore`] (single process) and
//! [`redis_store::RedisStore`] (shared across instances).

pub mod memory;
pub mod redis_store;
pub mod session;

use crate::address::WalletAddress;
use crate::clock::Clock;
use crate::models::{Challenge, Session};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pending challenges, keyed by address.
#[async_trait]
pub trait ChallengeStore: Send + Sync {
    /// Store `challenge`, replacing any pending challenge for the same address.
    async fn put(&self, challenge: &Challenge) -> Result<(), StoreError>;

    /// Atomically remove and return the pending challenge for `address`.
    ///
    /// Of several concurrent callers for one address, at most one gets `Some`.
    async fn take(&self, address: &WalletAddress) -> Result<Option<Challenge>, StoreError>;

    /// Drop challenges that expired before `now`. Returns how many were dropped.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

/// Issued sessions, keyed by token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &Session) -> Result<(), StoreError>;

    /// Look up a live session.
    ///
    /// A session past its expiry is removed and reported as `None`.
    async fn get(&self, token: &str) -> Result<Option<Session>, StoreError>;

    /// Returns true if the session existed.
    async fn remove(&self, token: &str) -> Result<bool, StoreError>;

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

/// Fixed-window request counters.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count one request against `key`.
    ///
    /// # Returns
    /// * `Ok(true)` if under limit
    /// * `Ok(false)` if limit exceeded
    async fn check(&self, key: &str, max: u32, window_secs: u64) -> Result<bool, StoreError>;

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}

/// The set of stores a server runs against.
#[derive(Clone)]
pub struct Stores {
    pub challenges: Arc<dyn ChallengeStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub rate_limits: Arc<dyn RateLimitStore>,
}

impl Stores {
    /// In-process stores, all backed by one [`memory::MemoryStore`].
    pub fn memory(clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(memory::MemoryStore::new(clock));
        Stores {
            challenges: store.clone(),
            sessions: store.clone(),
            rate_limits: store,
        }
    }

    /// Redis-backed stores.
    pub fn redis(client: redis::Client, challenge_grace_secs: u64, clock: Arc<dyn Clock>) -> Self {
        let store = Arc::new(redis_store::RedisStore::new(
            client,
            challenge_grace_secs,
            clock,
        ));
        Stores {
            challenges: store.clone(),
            sessions: store.clone(),
            rate_limits: store,
        }
    }
}
