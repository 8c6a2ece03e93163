use anyhow::Result;
use registry_sync::{RegistryConfig, RegistryRuntime};
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Interval between registry status log lines
const STATUS_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting service-discovery daemon...");

    let config = RegistryConfig::from_env()?;
    info!("Using store at {}", config.store_url);
    info!("  - Heartbeat path: {}", config.health.http_path);
    info!("  - Heartbeat interval: {:?}", config.health.check_interval);
    info!("  - Probe timeout: {:?}", config.health.timeout);

    let runtime = RegistryRuntime::init(config).await?;
    info!(
        "Service registry initialized with {} services",
        runtime.registry().service_count().await
    );

    let mut status = tokio::time::interval(STATUS_INTERVAL);
    loop {
        tokio::select! {
            _ = status.tick() => {
                let service_count = runtime.registry().service_count().await;
                debug!("Service registry has {} services", service_count);
                match runtime.metrics().gather() {
                    Ok(metrics) => debug!("Metrics:\n{}", metrics),
                    Err(e) => error!("Error gathering metrics: {}", e),
                }
            }
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("Error waiting for shutdown signal: {}", e);
                }
                break;
            }
        }
    }

    info!("Shutdown signal received, exiting...");
    runtime.shutdown().await?;
    Ok(())
}

/// Install the tracing subscriber, honoring `RUST_LOG` and
/// `REGISTRY_LOG_FORMAT=json`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("REGISTRY_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
