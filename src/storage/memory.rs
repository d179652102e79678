//! In-process store.
//!
//! `DashMap` shards hold a write lock for the duration of `insert` and
//! `remove`, which gives the overwrite and take-once semantics the auth core
//! needs without a global lock.

use super::{ChallengeStore, RateLimitStore, SessionStore, StoreError};
use crate::address::WalletAddress;
use crate::clock::Clock;
use crate::models::{Challenge, Session};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    resets_at: DateTime<Utc>,
}

pub struct MemoryStore {
    challenges: DashMap<WalletAddress, Challenge>,
    sessions: DashMap<String, Session>,
    rate_windows: DashMap<String, RateWindow>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            challenges: DashMap::new(),
            sessions: DashMap::new(),
            rate_windows: DashMap::new(),
            clock,
        }
    }
}

#[async_trait]
impl ChallengeStore for MemoryStore {
    async fn put(&self, challenge: &Challenge) -> Result<(), StoreError> {
        self.challenges.insert(challenge.address, challenge.clone());
        Ok(())
    }

    async fn take(&self, address: &WalletAddress) -> Result<Option<Challenge>, StoreError> {
        Ok(self.challenges.remove(address).map(|(_, challenge)| challenge))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut purged = 0;
        self.challenges.retain(|_, challenge| {
            let keep = !challenge.is_expired(now);
            if !keep {
                purged += 1;
            }
            keep
        });
        Ok(purged)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert(&self, session: &Session) -> Result<(), StoreError> {
        self.sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let now = self.clock.now();
        if self
            .sessions
            .remove_if(token, |_, session| session.is_expired(now))
            .is_some()
        {
            return Ok(None);
        }
        Ok(self
            .sessions
            .get(token)
            .map(|entry| entry.value().clone())
            .filter(|session| !session.is_expired(now)))
    }

    async fn remove(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.sessions.remove(token).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut purged = 0;
        self.sessions.retain(|_, session| {
            let keep = !session.is_expired(now);
            if !keep {
                purged += 1;
            }
            keep
        });
        Ok(purged)
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn check(&self, key: &str, max: u32, window_secs: u64) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let window = Duration::seconds(window_secs as i64);

        let mut entry = self
            .rate_windows
            .entry(key.to_string())
            .or_insert(RateWindow {
                count: 0,
                resets_at: now + window,
            });

        if now >= entry.resets_at {
            *entry = RateWindow {
                count: 0,
                resets_at: now + window,
            };
        }
        entry.count += 1;

        Ok(entry.count <= max)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut purged = 0;
        self.rate_windows.retain(|_, window| {
            let keep = now < window.resets_at;
            if !keep {
                purged += 1;
            }
            keep
        });
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn address(byte: u8) -> WalletAddress {
        WalletAddress::from_bytes([byte; 20])
    }

    fn challenge(addr: WalletAddress, nonce: &str, now: DateTime<Utc>) -> Challenge {
        Challenge {
            address: addr,
            nonce: nonce.to_string(),
            issued_at: now,
            expires_at: now + Duration::seconds(300),
        }
    }

    fn session(token: &str, now: DateTime<Utc>, ttl_secs: i64) -> Session {
        Session {
            address: address(1),
            token: token.to_string(),
            issued_at: now,
            expires_at: now + Duration::seconds(ttl_secs),
        }
    }

    fn store() -> (MemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        (MemoryStore::new(clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_take_is_single_use() {
        let (store, clock) = store();
        let c = challenge(address(1), "n1", clock.now());

        store.put(&c).await.unwrap();
        assert_eq!(store.take(&address(1)).await.unwrap(), Some(c));
        assert_eq!(store.take(&address(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites_prior() {
        let (store, clock) = store();
        store
            .put(&challenge(address(1), "first", clock.now()))
            .await
            .unwrap();
        store
            .put(&challenge(address(1), "second", clock.now()))
            .await
            .unwrap();

        let taken = store.take(&address(1)).await.unwrap().unwrap();
        assert_eq!(taken.nonce, "second");
        assert_eq!(store.take(&address(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_challenges_are_per_address() {
        let (store, clock) = store();
        store
            .put(&challenge(address(1), "a", clock.now()))
            .await
            .unwrap();
        store
            .put(&challenge(address(2), "b", clock.now()))
            .await
            .unwrap();

        assert_eq!(store.take(&address(2)).await.unwrap().unwrap().nonce, "b");
        assert_eq!(store.take(&address(1)).await.unwrap().unwrap().nonce, "a");
    }

    #[tokio::test]
    async fn test_purge_expired_challenges() {
        let (store, clock) = store();
        let now = clock.now();
        store.put(&challenge(address(1), "old", now)).await.unwrap();
        store
            .put(&challenge(address(2), "new", now + Duration::seconds(200)))
            .await
            .unwrap();

        let purged = ChallengeStore::purge_expired(&store, now + Duration::seconds(300))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert_eq!(store.take(&address(1)).await.unwrap(), None);
        assert!(store.take(&address(2)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let (store, clock) = store();
        let s = session("tok", clock.now(), 60);

        store.insert(&s).await.unwrap();
        assert_eq!(store.get("tok").await.unwrap(), Some(s));
        assert_eq!(store.get("other").await.unwrap(), None);

        assert!(store.remove("tok").await.unwrap());
        assert!(!store.remove("tok").await.unwrap());
        assert_eq!(store.get("tok").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_drops_expired_session() {
        let (store, clock) = store();
        store.insert(&session("t", clock.now(), 10)).await.unwrap();

        clock.advance(Duration::seconds(9));
        assert!(store.get("t").await.unwrap().is_some());

        clock.advance(Duration::seconds(11));
        assert_eq!(store.get("t").await.unwrap(), None);

        // Removed on lookup, not just hidden
        assert!(!store.remove("t").await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_expired_sessions() {
        let (store, clock) = store();
        let now = clock.now();
        store.insert(&session("short", now, 10)).await.unwrap();
        store.insert(&session("long", now, 1000)).await.unwrap();

        let purged = SessionStore::purge_expired(&store, now + Duration::seconds(10))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(store.get("short").await.unwrap().is_none());
        assert!(store.get("long").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rate_limit_window() {
        let (store, clock) = store();

        assert!(store.check("ip", 3, 60).await.unwrap());
        assert!(store.check("ip", 3, 60).await.unwrap());
        assert!(store.check("ip", 3, 60).await.unwrap());
        assert!(!store.check("ip", 3, 60).await.unwrap());

        // Other keys are independent
        assert!(store.check("other", 3, 60).await.unwrap());

        // Window resets
        clock.advance(Duration::seconds(60));
        assert!(store.check("ip", 3, 60).await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_rate_windows() {
        let (store, clock) = store();
        store.check("ip", 3, 60).await.unwrap();

        let purged = RateLimitStore::purge_expired(&store, clock.now())
            .await
            .unwrap();
        assert_eq!(purged, 0);

        let purged = RateLimitStore::purge_expired(&store, clock.now() + Duration::seconds(60))
            .await
            .unwrap();
        assert_eq!(purged, 1);
    }
}
