use std::sync::Arc;

use anyhow::Context;

use bench_coordinator::agent::AgentService;
use bench_coordinator::config::CoordinatorConfig;
use bench_coordinator::controller::{BenchExternal, BenchResource, Reconciler, RunOutcome};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("Usage: bench-coordinator <resource.json>");
        std::process::exit(2);
    };

    let config = CoordinatorConfig::from_env().context("invalid coordinator configuration")?;
    let mut resource = BenchResource::load(&path)
        .await
        .with_context(|| format!("failed to load resource from {path}"))?;

    eprintln!("Bench coordinator v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Resource: {} ({})", resource.name, resource.spec.class);
    eprintln!(
        "   Agents: {}:{} (pool {})",
        config.service_name, config.agent_port, config.pool_name
    );
    eprintln!("   Reconcile every {:?}\n", config.reconcile_interval);

    let service = Arc::new(AgentService::from_config(&config).context("failed to build agent client")?);
    let reconciler = Reconciler::new(Arc::new(BenchExternal::new(service)));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    match reconciler
        .run_until_settled(&mut resource, config.reconcile_interval, shutdown)
        .await
    {
        RunOutcome::Settled(outcome) => {
            tracing::info!(resource = %resource.name, ?outcome, "Benchmark settled");
        }
        RunOutcome::Shutdown => {
            resource.deletion_requested = true;
            let outcome = reconciler
                .reconcile(&mut resource)
                .await
                .context("failed to tear down benchmark task")?;
            tracing::info!(resource = %resource.name, ?outcome, "Benchmark torn down");
        }
    }

    println!("{}", serde_json::to_string_pretty(&resource)?);
    Ok(())
}
