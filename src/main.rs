//! Graffiti - HTTP gateway for a shared collaborative pixel canvas

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use graffiti::{
    canvas::{CANVAS_HEIGHT, CANVAS_WIDTH, MAX_PIXELS_PER_PAINT},
    config::Args,
    db::{KvStore, MemoryStore, RedisStore},
    gate::{Erc20Oracle, MembershipGate},
    server::{self, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("graffiti={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Graffiti - shared pixel canvas");
    info!("  anyone can leave a mark");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Canvas: {} cols x {} rows", CANVAS_WIDTH, CANVAS_HEIGHT);
    info!("Batch cap: {} pixels", MAX_PIXELS_PER_PAINT);
    match args.token_address {
        Some(ref token) => info!(
            "Gating: enabled (token {}, min balance {} whole token(s))",
            token, args.min_token_balance
        ),
        None => info!("Gating: disabled (no token configured)"),
    }
    info!("======================================");

    // Connect to the store (in-memory fallback in dev mode)
    let store: Arc<dyn KvStore> = match (&args.store_url, &args.store_token) {
        (Some(url), Some(token)) => {
            let timeout = Duration::from_millis(args.store_timeout_ms);
            match RedisStore::connect(url, token, timeout).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    if args.dev_mode {
                        warn!("Store connection failed (dev mode, using in-memory): {}", e);
                        Arc::new(MemoryStore::new())
                    } else {
                        error!("Store connection failed: {}", e);
                        std::process::exit(1);
                    }
                }
            }
        }
        _ => {
            // validate() guarantees dev mode here
            warn!("No store configured (dev mode) - state will not survive restart");
            Arc::new(MemoryStore::new())
        }
    };

    // Membership gate (admits everyone when no token is configured)
    let gate = match args.token_address {
        Some(ref token_address) => {
            let oracle = Erc20Oracle::new(
                args.rpc_url.clone(),
                token_address.clone(),
                args.min_balance_wei(),
                Duration::from_millis(args.oracle_timeout_ms),
            );
            info!("Membership oracle: {} (cache TTL {}s)", args.rpc_url, args.membership_ttl_secs);
            MembershipGate::new(
                Arc::new(oracle),
                Duration::from_secs(args.membership_ttl_secs),
            )
        }
        None => MembershipGate::disabled(),
    };

    let state = Arc::new(AppState::new(args, store, Arc::new(gate)));

    if let Err(e) = server::run(state).await {
        error!("Server error: {:?}", e);
        std::process::exit(1);
    }

    Ok(())
}
