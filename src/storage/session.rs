//! Session, challenge and rate-limit Redis operations.
//!
//! Redis key patterns:
//! - `challenge:{address}` — pending challenge (JSON)
//! - `session:{token}` — session data (JSON)
//! - `ratelimit:{scope}:{id}` — request counter
//!
//! Challenge nonces and session payloads read back from Redis are wrapped in
//! `Zeroizing` so the application's copy is cleared once deserialized.

use super::StoreError;
use crate::address::WalletAddress;
use crate::models::{Challenge, Session};
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use zeroize::Zeroizing;

fn challenge_key(address: &WalletAddress) -> String {
    format!("challenge:{}", address)
}

fn session_key(token: &str) -> String {
    format!("session:{}", token)
}

/// Seconds until `expires_at`, never less than one.
fn ttl_secs(issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> u64 {
    (expires_at - issued_at).num_seconds().max(1) as u64
}

/// Store a challenge, replacing any previous one for the address.
///
/// The key outlives the challenge by `grace_secs` so that a late
/// verification still finds it and can report it as expired.
pub async fn store_challenge<C>(
    con: &mut C,
    challenge: &Challenge,
    grace_secs: u64,
) -> Result<(), StoreError>
where
    C: AsyncCommands,
{
    let key = challenge_key(&challenge.address);
    let json = serde_json::to_string(challenge)?;
    let ttl = ttl_secs(challenge.issued_at, challenge.expires_at) + grace_secs;

    con.set_ex::<_, _, ()>(&key, json, ttl).await?;
    Ok(())
}

/// Get and delete a challenge atomically (single-use nonce).
///
/// Uses a Lua script so two concurrent callers cannot both read the value.
pub async fn take_challenge<C>(
    con: &mut C,
    address: &WalletAddress,
) -> Result<Option<Challenge>, StoreError>
where
    C: AsyncCommands,
{
    let key = challenge_key(address);

    let script = redis::Script::new(
        r"
        local val = redis.call('GET', KEYS[1])
        if val then
            redis.call('DEL', KEYS[1])
        end
        return val
        ",
    );

    let json: Option<String> = script.key(&key).invoke_async(con).await?;

    match json {
        Some(data) => {
            let data = Zeroizing::new(data);
            Ok(Some(serde_json::from_str(&data)?))
        }
        None => Ok(None),
    }
}

/// Store a session with a TTL matching its expiry.
pub async fn store_session<C>(con: &mut C, session: &Session) -> Result<(), StoreError>
where
    C: AsyncCommands,
{
    let key = session_key(&session.token);
    let json = serde_json::to_string(session)?;

    con.set_ex::<_, _, ()>(&key, json, ttl_secs(session.issued_at, session.expires_at))
        .await?;
    Ok(())
}

/// Get a session by token.
pub async fn get_session<C>(con: &mut C, token: &str) -> Result<Option<Session>, StoreError>
where
    C: AsyncCommands,
{
    let json: Option<String> = con.get(session_key(token)).await?;

    match json {
        Some(data) => {
            let data = Zeroizing::new(data);
            Ok(Some(serde_json::from_str(&data)?))
        }
        None => Ok(None),
    }
}

/// Delete a session. Returns true if it existed.
pub async fn delete_session<C>(con: &mut C, token: &str) -> Result<bool, StoreError>
where
    C: AsyncCommands,
{
    let deleted: i32 = con.del(session_key(token)).await?;
    Ok(deleted > 0)
}

/// Check rate limit using Redis INCR with TTL.
///
/// # Arguments
/// * `con` - Redis connection
/// * `key` - Rate limit key (e.g., "ratelimit:nonce:127.0.0.1")
/// * `max` - Maximum requests allowed in window
/// * `window_secs` - Time window in seconds
///
/// # Returns
/// * `Ok(true)` if under limit
/// * `Ok(false)` if limit exceeded
pub async fn check_rate_limit<C>(
    con: &mut C,
    key: &str,
    max: u32,
    window_secs: u64,
) -> Result<bool, StoreError>
where
    C: AsyncCommands,
{
    let count: u32 = con.incr(key, 1).await?;

    // Set TTL on first request
    if count == 1 {
        con.expire::<_, ()>(key, window_secs as i64).await?;
    }

    Ok(count <= max)
}
