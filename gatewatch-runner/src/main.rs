use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use gatewatch_core::{AppContext, Config};
use gatewatch_delivery::FcmTransport;
use gatewatch_notify::NotificationDispatcher;
use gatewatch_provider::provider_from_config;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting GateWatch");

    // Load configuration and wire up the shared context
    let config = Config::from_env();
    let grace = Duration::from_secs(config.scheduler.shutdown_grace_secs);
    let ctx = AppContext::connect(config).await?;

    let provider = provider_from_config(&ctx.config.provider, ctx.clock.clone())?;
    let push = Arc::new(FcmTransport::new(&ctx.config.push)?);
    let dispatcher = Arc::new(NotificationDispatcher::new(ctx.clone(), push));

    tracing::info!("Application context initialized");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let poller = tokio::spawn(gatewatch_poller::run(
        ctx.clone(),
        provider,
        dispatcher.clone(),
        shutdown_rx.clone(),
    ));
    let reminder = tokio::spawn(gatewatch_reminder::run(
        ctx,
        dispatcher,
        shutdown_rx,
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(true);

    // Give in-flight cycles a bounded window to finish.
    let drained = tokio::time::timeout(grace, async {
        for (name, handle) in [("polling", poller), ("reminder", reminder)] {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("{} scheduler error: {}", name, e),
                Err(e) => tracing::error!("{} scheduler task panicked: {}", name, e),
            }
        }
    })
    .await;
    if drained.is_err() {
        tracing::warn!("Schedulers did not stop within {:?}, exiting anyway", grace);
    }

    tracing::info!("GateWatch stopped");
    Ok(())
}
