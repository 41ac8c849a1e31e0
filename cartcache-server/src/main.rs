use cartcache::{CartCache, Context};
use shared::CacheConfig;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables before the filter reads RUST_LOG
    let dotenv = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match dotenv {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    info!("Starting cart cache");
    let config = CacheConfig::from_env();

    let startup_ctx = Context::with_timeout(STARTUP_TIMEOUT);
    let cache = match storage_engine::redis_cart_cache(&startup_ctx, &config).await {
        Ok(cache) => Arc::new(cache),
        Err(e) => {
            error!("Cart cache startup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(
        "Cart cache connected to {} (entry TTL {:?})",
        cache.store().address(),
        cache.ttl()
    );

    // Smoke-check the read path so a misbehaving store shows up at boot
    let probe_ctx = Context::with_timeout(Duration::from_secs(2));
    match cache.get(&probe_ctx, "cartcache:startup-probe").await {
        Ok(_) => info!("Startup probe key unexpectedly present"),
        Err(e) if e.is_not_found() => info!("Startup probe ok"),
        Err(e) => {
            error!("Startup probe failed: {}", e);
            return ExitCode::FAILURE;
        }
    }

    shutdown_signal().await;

    drop(cache);
    info!("Cart cache connection released, shutting down");
    ExitCode::SUCCESS
}

// Graceful shutdown handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
