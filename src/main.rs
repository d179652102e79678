//! walletgate entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Build the challenge/session stores (in-memory or Redis)
//! 3. Start the expiry sweep for the in-memory store
//! 4. Build router with API routes, CORS and security headers
//! 5. Start Axum server
//!
//! Also supports a `sign` subcommand that signs a message with a raw
//! private key, for exercising the API with curl.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use walletgate::{
    auth::middleware::AppState,
    cleanup,
    clock::{Clock, SystemClock},
    config::{Config, StoreBackend},
    routes,
    storage::Stores,
    wallet::{LocalWallet, MessageSigner},
};

/// Sign `message` with `private_key` and return (address, signature).
fn sign(private_key: &str, message: &str) -> Result<(String, String), String> {
    let wallet = LocalWallet::from_hex(private_key).map_err(|e| e.to_string())?;
    let signature = wallet.sign_message(message).map_err(|e| e.to_string())?;
    Ok((wallet.address().to_checksum(), signature))
}

fn print_sign_usage() {
    eprintln!("Usage: walletgate sign <private-key-hex> <message>");
    eprintln!();
    eprintln!("Sign a message the way a wallet's personal_sign does.");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  NONCE=$(curl -s 'localhost:5000/api/nonce?address=0x…' | jq -r .nonce)");
    eprintln!("  walletgate sign 0x4c08…2318 \"$NONCE\"");
}

#[tokio::main]
async fn main() {
    // Check for sign subcommand
    let args: Vec<String> = std::env::args().collect();
    if args.len() >= 2 && args[1] == "sign" {
        if args.len() != 4 {
            print_sign_usage();
            std::process::exit(1);
        }

        match sign(&args[2], &args[3]) {
            Ok((address, signature)) => {
                println!("address:   {}", address);
                println!("signature: {}", signature);
            }
            Err(e) => {
                eprintln!("Error signing message: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().expect("Failed to load config");
    tracing::info!(?config, "Starting walletgate on {}", config.bind_addr);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let stores = match config.store_backend {
        StoreBackend::Memory => {
            let stores = Stores::memory(clock.clone());
            tokio::spawn(cleanup::run_sweep_loop(
                stores.clone(),
                clock.clone(),
                Duration::from_secs(config.sweep_interval_secs),
            ));
            stores
        }
        StoreBackend::Redis => {
            let redis_url = config.redis_url.as_deref().expect("REDIS_URL checked by config");
            let redis_client = redis::Client::open(redis_url).expect("Invalid Redis URL");

            // Verify Redis connection
            redis_client
                .get_multiplexed_async_connection()
                .await
                .expect("Failed to connect to Redis");

            Stores::redis(redis_client, config.challenge_grace_secs, clock.clone())
        }
    };
    tracing::info!(backend = ?config.store_backend, "Stores ready");

    let bind_addr = config.bind_addr;
    let app = routes::app(AppState::new(config, stores, clock));

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", bind_addr);

    // with_connect_info is required for the ConnectInfo<SocketAddr> extractor
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
