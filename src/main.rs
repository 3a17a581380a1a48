use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use netrunner_server::config::SimConfig;
use netrunner_server::game::engine::{TickEngine, World};
use netrunner_server::game::performance::PerformanceMonitor;
use netrunner_server::metrics::Metrics;
use netrunner_server::net::protocol;
use netrunner_server::util::clock::SystemClock;

/// Ticks between performance status lines
const STATUS_EVERY_TICKS: u64 = 600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Netrunner Server v{}", env!("CARGO_PKG_VERSION"));

    let config = SimConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: tick={}ms, seed={}, sentinels_per_player={}",
        config.tick_ms, config.seed, config.sentinels_per_player
    );

    let metrics = Arc::new(Metrics::new());

    #[cfg(all(feature = "metrics_server", not(feature = "minimal")))]
    {
        let metrics = metrics.clone();
        let port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = netrunner_server::metrics::start_metrics_server(metrics, port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let world = Arc::new(World::new(config.seed, Arc::new(SystemClock)));
    let mut engine = TickEngine::new(world, &config);
    let mut monitor = PerformanceMonitor::new(config.tick_ms);

    let mut interval = tokio::time::interval(Duration::from_millis(config.tick_ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    };
    tokio::pin!(shutdown);

    info!("Simulation running");
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = interval.tick() => {
                monitor.tick_start();
                let report = engine.update();
                let frames = engine.broadcast();

                for (id, snapshot) in &frames {
                    match protocol::encode(snapshot) {
                        Ok(bytes) => debug!("Snapshot for {}: {} bytes", id, bytes.len()),
                        Err(e) => warn!("Failed to encode snapshot for {}: {}", id, e),
                    }
                }

                let entities = report.players + report.sentinels + report.projectiles;
                if let Some(elapsed) = monitor.tick_end(entities) {
                    metrics.record_tick_time(elapsed);
                    if elapsed > monitor.budget() {
                        warn!("Tick {} overran budget: {:?} > {:?}", report.tick, elapsed, monitor.budget());
                    }
                }
                metrics.observe(&report);
                metrics.set_performance(monitor.status(), monitor.budget_usage_percent());
                metrics
                    .snapshots_sent
                    .fetch_add(frames.len() as u64, std::sync::atomic::Ordering::Relaxed);

                if report.tick % STATUS_EVERY_TICKS == 0 {
                    info!("Tick {}: {}", report.tick, monitor.status_message());
                }
            }
        }
    }

    info!("Server stopped after {} ticks", engine.tick_count());
    Ok(())
}
