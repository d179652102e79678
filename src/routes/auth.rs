//! Auth API endpoints.

use crate::auth::{AppState, AuthError, AuthSession};
use crate::error::{AppError, AUTH_FAILED};
use crate::models::{NonceQuery, NonceResponse, SessionInfo, VerifyRequest, VerifyResponse};
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;

/// GET /api/nonce?address=0x… — Issue a challenge for a wallet
pub async fn issue_nonce(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<NonceQuery>,
) -> Result<impl IntoResponse, AppError> {
    // Rate limit by IP
    let rate_limit_key = format!("ratelimit:nonce:{}", addr.ip());
    let allowed = state
        .rate_limits
        .check(&rate_limit_key, state.config.rate_limit_nonce_per_min, 60)
        .await
        .map_err(|e| AppError::ServiceUnavailable(format!("Rate limit check failed: {}", e)))?;

    if !allowed {
        let mut hasher = std::hash::DefaultHasher::new();
        addr.ip().hash(&mut hasher);
        let ip_hash = format!("{:x}", hasher.finish());
        tracing::warn!(action = "rate_limited", endpoint = "nonce", ip_hash = %ip_hash, "Rate limit exceeded");
        return Err(AppError::RateLimited);
    }

    let challenge = state.issuer.issue(&query.address).await?;

    Ok(Json(NonceResponse {
        address: challenge.address,
        nonce: challenge.nonce,
    }))
}

/// POST /api/verify — Verify signature and create session
pub async fn verify_signature(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    match state.verifier.verify(&req.address, &req.signature).await {
        Ok(session) => Ok(Json(VerifyResponse {
            success: true,
            token: session.token,
            expires_at: session.expires_at,
        })),
        Err(e) => {
            tracing::warn!(action = "auth_failed", kind = e.kind(), error = %e, "Verification failed");
            Err(match e {
                // Same answer as a bad signature; see AUTH_FAILED
                AuthError::InvalidAddress(_) => AppError::Unauthorized(AUTH_FAILED.to_string()),
                other => other.into(),
            })
        }
    }
}

/// GET /api/me — Describe the current session
pub async fn me(AuthSession(session): AuthSession) -> Json<SessionInfo> {
    Json(SessionInfo::from(&session))
}

/// POST /api/logout — Invalidate current session
pub async fn logout(
    AuthSession(session): AuthSession,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state
        .sessions
        .remove(&session.token)
        .await
        .map_err(|e| AppError::ServiceUnavailable(format!("Session delete failed: {}", e)))?;

    tracing::info!(action = "logout", address = %session.address, "Session revoked");

    Ok(StatusCode::NO_CONTENT)
}
