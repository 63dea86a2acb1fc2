//! Boarding reminder scheduler: once a minute, compare each tracked flight's
//! stored boarding time against the clock and fire the 40/20/10 minute
//! reminders on the exact minute they come due.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Duration, MissedTickBehavior};

use gatewatch_core::types::TrackedFlight;
use gatewatch_core::{AppContext, Clock, Result, Store};
use gatewatch_notify::{BoardingThreshold, NotificationDispatcher};

/// Run until the shutdown signal flips. Reads only stored snapshots kept
/// fresh by the polling scheduler; it never calls the provider itself.
pub async fn run(
    ctx: AppContext,
    dispatcher: Arc<NotificationDispatcher>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let interval = Duration::from_secs(ctx.config.scheduler.reminder_interval_secs);
    tracing::info!("Starting boarding reminder scheduler (every {:?})", interval);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("Stopping boarding reminder scheduler");
                return Ok(());
            }
            _ = ticker.tick() => {
                if let Err(e) = sweep(&ctx, &dispatcher).await {
                    tracing::error!("Reminder sweep failed: {}", e);
                }
            }
        }
    }
}

/// One sweep over all active flights. Per-flight failures are logged and
/// skipped so one bad record cannot silence the rest.
async fn sweep(ctx: &AppContext, dispatcher: &NotificationDispatcher) -> Result<()> {
    let flights = ctx.store.active_tracked_flights().await?;

    for flight in flights {
        if let Err(e) = remind(ctx, dispatcher, &flight).await {
            tracing::warn!(
                "Reminder check failed for flight {}: {}",
                flight.flight_key(),
                e
            );
        }
    }

    Ok(())
}

async fn remind(
    ctx: &AppContext,
    dispatcher: &NotificationDispatcher,
    flight: &TrackedFlight,
) -> Result<()> {
    let key = flight.flight_key();

    let Some(status) = ctx.store.find_flight_status(&key).await? else {
        // The poller hasn't produced a snapshot yet.
        tracing::debug!("No stored status for {}, skipping reminder check", key);
        return Ok(());
    };

    let minutes = (status.boarding_time - ctx.clock.now()).num_minutes();
    // Exact-minute match: with a one-minute cadence each threshold is seen
    // exactly once, so no fired-reminder bookkeeping is needed.
    let Some(threshold) = BoardingThreshold::from_minutes(minutes) else {
        return Ok(());
    };

    tracing::info!(
        "Flight {} boards in {} minutes, reminding user {}",
        key,
        minutes,
        flight.user_id
    );
    dispatcher
        .dispatch_boarding_reminder(flight.user_id, &status, threshold)
        .await
}
