//! Monad Fleet - multi-account transaction runner
//!
//! Runs one protocol action (staking, minting, deploying) for every
//! configured account against a single EVM network, with a bounded number of
//! accounts in flight and per-account RPC failover.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

mod abi;
mod accounts;
mod chain;
mod client;
mod config;
mod coordination;
mod error;
mod menu;
mod metrics;
mod modules;
mod results;
mod tx;

use chain::{EndpointPool, HttpConnector, NetworkProfile, RpcConnector};
use client::ClientOptions;
use config::Settings;
use coordination::{AccountScheduler, TaskStatus};
use metrics::MetricsServer;
use modules::RunContext;
use results::ResultSink;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::load()?;

    // Initialize logging
    init_logging(settings.logging.json);

    let run_id = uuid::Uuid::new_v4();
    info!(
        "Starting Monad Fleet v{} (run {})",
        env!("CARGO_PKG_VERSION"),
        run_id
    );
    info!(
        "Loaded configuration for {} (chain {})",
        settings.network.name, settings.network.chain_id
    );

    let module = {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        menu::select_module(&mut input, &mut output)?
    };
    module.ensure_configured(&settings.modules)?;
    info!("Start {} module", module);

    let accounts = accounts::load_accounts(&settings.accounts)?;
    info!("Loaded {} accounts", accounts.len());

    let profile = Arc::new(NetworkProfile::from_settings(&settings));
    let pool = Arc::new(EndpointPool::new(&profile.endpoints)?);
    if pool.len() == 1 {
        warn!(
            "Network {} has a single RPC URL - endpoint failover is unavailable",
            profile.name
        );
    }

    let connector: Arc<dyn RpcConnector> = Arc::new(HttpConnector::new(
        Duration::from_secs(settings.runner.rpc_timeout_secs),
        settings.runner.rpc_via_proxy,
    ));

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    let ctx = Arc::new(RunContext {
        profile,
        pool,
        connector,
        options: ClientOptions::from(&settings.runner),
        modules: settings.modules.clone(),
        sink: Arc::new(ResultSink::new(settings.results.path.clone())),
    });

    let limiter = Arc::new(Semaphore::new(settings.runner.max_concurrent_accounts));
    let scheduler = AccountScheduler::new(limiter);

    let reports = scheduler
        .run_all(accounts, move |account| {
            modules::run_account(ctx.clone(), module, account)
        })
        .await;

    let succeeded = reports
        .iter()
        .filter(|r| r.status == TaskStatus::Succeeded)
        .count();
    let skipped = reports
        .iter()
        .filter(|r| matches!(r.status, TaskStatus::Skipped(_)))
        .count();
    let failed = reports.len() - succeeded - skipped;

    info!(
        "{} work completed (run {}): {} succeeded, {} skipped, {} failed",
        module, run_id, succeeded, skipped, failed
    );
    for report in &reports {
        if let TaskStatus::Failed(reason) = &report.status {
            warn!("[{}] {}", report.account_id, reason);
        }
    }

    if let Some(handle) = metrics_handle {
        handle.abort();
    }

    Ok(())
}

fn init_logging(json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,monad_fleet=debug,hyper=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }
}

