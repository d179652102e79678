use axum::http::HeaderValue;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Upper bound for every duration setting: one year.
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Where challenges, sessions and rate-limit counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            other => Err(format!("unknown backend '{}', expected memory or redis", other)),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    // Server
    pub bind_addr: SocketAddr,
    pub cors_allowed_origins: Vec<String>,

    // Storage
    pub store_backend: StoreBackend,
    pub redis_url: Option<String>,

    // TTLs (in seconds)
    pub challenge_ttl_secs: u64,
    pub challenge_grace_secs: u64,
    pub session_ttl_secs: u64,

    // Rate limiting
    pub rate_limit_nonce_per_min: u32,

    // Background sweep of the in-memory store
    pub sweep_interval_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("store_backend", &self.store_backend)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("challenge_ttl_secs", &self.challenge_ttl_secs)
            .field("challenge_grace_secs", &self.challenge_grace_secs)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("rate_limit_nonce_per_min", &self.rate_limit_nonce_per_min)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        let _ = dotenvy::dotenv();

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        let cors_allowed_origins: Vec<String> = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in &cors_allowed_origins {
            if HeaderValue::from_str(origin).is_err() {
                return Err(ConfigError::InvalidValue(
                    "CORS_ALLOWED_ORIGINS".to_string(),
                    format!("invalid origin '{}'", origin),
                ));
            }
        }

        // Storage
        let store_backend: StoreBackend = parse_env_or_default("STORE_BACKEND", StoreBackend::Memory)?;
        let redis_url = env::var("REDIS_URL").ok().filter(|s| !s.is_empty());
        if store_backend == StoreBackend::Redis && redis_url.is_none() {
            return Err(ConfigError::MissingVar("REDIS_URL".to_string()));
        }

        // TTLs
        let challenge_ttl_secs = parse_secs("CHALLENGE_TTL_SECS", 300, 1)?;
        let challenge_grace_secs = parse_secs("CHALLENGE_GRACE_SECS", 300, 0)?;
        let session_ttl_secs = parse_secs("SESSION_TTL_SECS", 3_600, 1)?;

        // Rate limiting
        let rate_limit_nonce_per_min = parse_env_or_default("RATE_LIMIT_NONCE_PER_MIN", 30)?;

        let sweep_interval_secs = parse_secs("SWEEP_INTERVAL_SECS", 60, 1)?;

        Ok(Config {
            bind_addr,
            cors_allowed_origins,
            store_backend,
            redis_url,
            challenge_ttl_secs,
            challenge_grace_secs,
            session_ttl_secs,
            rate_limit_nonce_per_min,
            sweep_interval_secs,
        })
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}

/// Parse a duration in seconds bounded to `min..=MAX_DURATION_SECS`.
fn parse_secs(key: &str, default: u64, min: u64) -> Result<u64, ConfigError> {
    let value = parse_env_or_default(key, default)?;
    if value < min {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("must be at least {}", min),
        ));
    }
    if value > MAX_DURATION_SECS {
        return Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("must be at most {} seconds", MAX_DURATION_SECS),
        ));
    }
    Ok(value)
}
