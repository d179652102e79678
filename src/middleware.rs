//! Security headers middleware.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};

/// Middleware that adds security headers to all responses.
///
/// The service only returns JSON, so the policy is locked down hard:
///
/// - **Cache-Control: no-store**
///   Nonces and session tokens must never land in a shared cache.
///
/// - **X-Content-Type-Options: nosniff**
///   Forces browsers to respect the declared JSON content type.
///
/// - **X-Frame-Options: DENY** and `frame-ancestors 'none'`
///   Responses are never meant to be framed.
///
/// - **Referrer-Policy: no-referrer**
///
/// - **Content-Security-Policy: default-src 'none'**
///   Nothing served here should load any subresource.
///
/// # Usage
///
/// ```rust,no_run
/// use axum::Router;
/// use axum::middleware;
/// use walletgate::middleware::security_headers;
///
/// let app: Router = Router::new()
///     .layer(middleware::from_fn(security_headers));
/// ```
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=63072000; includeSubDomains"),
    );
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );

    response
}
