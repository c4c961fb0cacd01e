use std::sync::Arc;

use pool_perf::config::Config;
use pool_perf::server::{AppState, Listener};

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration
    let config = Config::parse_args();

    // Initialize tracing
    let log_level = match config.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("pool-perf v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration: buffer_size={} slots={} max_connections={} bounded_clear={:?} recycled_clear={:?}",
        config.buffer_size,
        config.slots,
        config.max_connections,
        config.bounded_clear,
        config.recycled_clear
    );

    // Pools live exactly as long as the server.
    let state = Arc::new(AppState::new(&config)?);
    info!(
        "Bounded pool ready: {} slots, {} bytes reserved",
        state.bounded().slot_count(),
        state.bounded().capacity_bytes()
    );

    let listener = Listener::bind(&config, state.clone()).await?;

    info!("Ready to accept connections");
    listener
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    let snapshot = state.snapshot();
    for s in &snapshot.strategies {
        info!(
            "{}: {} requests, {} failures, {} rejected, p99={}us",
            s.strategy, s.requests, s.failures, s.rejected, s.latency.p99
        );
    }
    info!(
        "Bounded pool: {} acquisitions, {} contended",
        snapshot.bounded.acquisitions, snapshot.bounded.contended
    );

    Ok(())
}
