//! Shared handler state and the bearer-token extractor.

use super::{NonceIssuer, SignatureVerifier};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::AppError;
use crate::models::Session;
use crate::storage::{RateLimitStore, SessionStore, Stores};
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::Duration;
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<NonceIssuer>,
    pub verifier: Arc<SignatureVerifier>,
    pub sessions: Arc<dyn SessionStore>,
    pub rate_limits: Arc<dyn RateLimitStore>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, stores: Stores, clock: Arc<dyn Clock>) -> Self {
        let issuer = NonceIssuer::new(
            stores.challenges.clone(),
            clock.clone(),
            ttl(config.challenge_ttl_secs),
        );
        let verifier = SignatureVerifier::new(
            stores.challenges,
            stores.sessions.clone(),
            clock.clone(),
            ttl(config.session_ttl_secs),
        );

        AppState {
            issuer: Arc::new(issuer),
            verifier: Arc::new(verifier),
            sessions: stores.sessions,
            rate_limits: stores.rate_limits,
            clock,
            config: Arc::new(config),
        }
    }
}

/// Seconds to a `Duration`, saturating at `Duration::MAX`.
///
/// An unrepresentable expiry is then reported by the issuer or verifier
/// instead of wrapping here.
fn ttl(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}

/// Authenticated session extractor.
///
/// Extracts session from `Authorization: Bearer {token}` header.
/// Returns 401 Unauthorized if missing, unknown or expired.
#[derive(Debug)]
pub struct AuthSession(pub Session);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid authorization format".to_string()))?;

        let session = state
            .sessions
            .get(token)
            .await
            .map_err(|e| AppError::ServiceUnavailable(format!("Session lookup failed: {}", e)))?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))?;

        if session.is_expired(state.clock.now()) {
            // Expired but not yet swept
            if let Err(e) = state.sessions.remove(token).await {
                tracing::warn!(error = %e, "Failed to remove expired session");
            }
            return Err(AppError::Unauthorized(
                "Invalid or expired session".to_string(),
            ));
        }

        Ok(AuthSession(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_saturates() {
        assert_eq!(ttl(300), Duration::seconds(300));
        assert_eq!(ttl(u64::MAX), Duration::MAX);
        assert_eq!(ttl(i64::MAX as u64), Duration::MAX);
        assert!(ttl(u64::MAX) > Duration::zero());
    }
}
