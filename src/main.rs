//! Failover arbiter daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                        FAILOVER ARBITER                          │
//!   │                                                                  │
//!   │  monitor loop ──▶ HealthProbe (HTTP) ──▶ NodeRegistry ◀── admin  │
//!   │        │                                     │            API   │
//!   │        ▼                                     ▼                  │
//!   │  HealthHistory                     evaluation loop              │
//!   │                                     │            │              │
//!   │                              RuleEngine   RollbackEvaluator     │
//!   │                                     │            │              │
//!   │                                     ▼            ▼              │
//!   │                               FailoverCoordinator ──▶ EventLog  │
//!   │                                                                  │
//!   │  config watcher ──▶ rule reload       Ctrl+C ──▶ Shutdown       │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use failover_arbiter::admin::{self, AdminState};
use failover_arbiter::config::{load_config, ConfigWatcher};
use failover_arbiter::health::HttpProbe;
use failover_arbiter::observability::{logging, metrics};
use failover_arbiter::{FailoverService, Shutdown};

/// How long loops get to finish their current tick after Ctrl+C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Parser)]
#[command(name = "failover-arbiter")]
#[command(about = "Node health monitoring and automatic failover", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "arbiter.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init(&config.observability.log_level);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config.display(),
        "failover-arbiter starting"
    );
    tracing::info!(
        nodes = config.nodes.len(),
        rules = config.rules.len(),
        monitor_interval_secs = config.monitor.interval_secs,
        evaluation_interval_secs = config.evaluation.interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let probe = Arc::new(HttpProbe::new(config.probe.clone()));
    let service = Arc::new(FailoverService::new(&config, probe)?);
    let shutdown = Shutdown::new();
    let mut handles = service.spawn(&shutdown);

    // Rule hot reload. The watcher stops when dropped, so keep it in scope.
    let (watcher, mut rule_updates) = ConfigWatcher::new(&args.config, config.rules.clone());
    let _watcher = match watcher.run() {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::error!(error = %e, "Config watcher unavailable; rules will not hot-reload");
            None
        }
    };
    {
        let service = service.clone();
        let mut stop = shutdown.subscribe();
        handles.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop.recv() => break,
                    update = rule_updates.recv() => match update {
                        Some(rules) => {
                            if let Err(e) = service.reload_rules(rules) {
                                tracing::error!(error = %e, "Rule reload refused; keeping current rules");
                            }
                        }
                        None => break,
                    },
                }
            }
        }));
    }

    if config.admin.enabled {
        let listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState::new(service.clone(), &config.admin.api_key);
        let admin_shutdown = shutdown.clone();
        handles.push(tokio::spawn(async move {
            if let Err(e) = admin::serve(listener, state, admin_shutdown).await {
                tracing::error!(error = %e, "Admin API stopped with error");
            }
        }));
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();

    let drained = tokio::time::timeout(SHUTDOWN_GRACE, futures_util::future::join_all(handles)).await;
    if drained.is_err() {
        tracing::warn!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "Background tasks did not stop in time"
        );
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
