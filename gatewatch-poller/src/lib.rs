//! Polling scheduler: on a fixed interval, re-fetch every actively tracked
//! flight straight from the provider, diff against the stored snapshot and
//! route detected changes to the dispatcher.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use gatewatch_core::types::{GateChange, TimeImpact, TrackedFlight};
use gatewatch_core::{AppContext, Clock, Result, Store};
use gatewatch_flights::{detect_changes, StatusChange, StatusResolver};
use gatewatch_notify::NotificationDispatcher;
use gatewatch_provider::FlightProvider;

/// Run until the shutdown signal flips. Cycles are serialized: the next tick
/// is awaited only after the previous cycle finishes, and ticks missed during
/// an overrun are skipped, never queued, so provider load stays bounded at
/// one cycle's worth.
pub async fn run(
    ctx: AppContext,
    provider: Arc<dyn FlightProvider>,
    dispatcher: Arc<NotificationDispatcher>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let interval = Duration::from_secs(ctx.config.scheduler.poll_interval_secs);
    tracing::info!("Starting flight polling scheduler (every {:?})", interval);

    let resolver = StatusResolver::new(ctx.store.clone(), ctx.cache.clone(), provider);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick of a tokio interval completes immediately; consume it so
    // the first cycle runs one interval after startup, like the Go ticker.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                tracing::info!("Stopping flight polling scheduler");
                return Ok(());
            }
            _ = ticker.tick() => {
                if let Err(e) = poll_active_flights(&ctx, &resolver, &dispatcher).await {
                    tracing::error!("Polling cycle failed: {}", e);
                }
            }
        }
    }
}

/// One full cycle. A failure for one flight is logged and skipped; it never
/// aborts the rest of the cycle.
async fn poll_active_flights(
    ctx: &AppContext,
    resolver: &StatusResolver,
    dispatcher: &NotificationDispatcher,
) -> Result<()> {
    let flights = ctx.store.active_tracked_flights().await?;
    tracing::debug!("Polling {} active flights", flights.len());

    for flight in flights {
        if let Err(e) = check_flight(ctx, resolver, dispatcher, &flight).await {
            tracing::warn!(
                "Skipping flight {} ({}): {}",
                flight.flight_number,
                flight.flight_key(),
                e
            );
        }
    }

    Ok(())
}

async fn check_flight(
    ctx: &AppContext,
    resolver: &StatusResolver,
    dispatcher: &NotificationDispatcher,
    flight: &TrackedFlight,
) -> Result<()> {
    let key = flight.flight_key();

    let previous = ctx.store.find_flight_status(&key).await?;
    // Always hit the provider here: the point is detecting drift, not
    // serving a cheap read.
    let mut latest = resolver.fetch_live(&key).await?;

    let Some(previous) = previous else {
        // No baseline yet (cold store). Persist silently; notifying would
        // report a "change" from nothing.
        ctx.store.upsert_flight_status(&latest).await?;
        resolver.write_back(&latest).await;
        return Ok(());
    };

    let changes = detect_changes(&previous, &latest);
    if changes.is_empty() {
        return Ok(());
    }

    if let Some(StatusChange::Gate { old, new }) = changes
        .iter()
        .find(|c| matches!(c, StatusChange::Gate { .. }))
    {
        latest.gate_change = Some(GateChange {
            old_gate: old.clone(),
            new_gate: new.clone(),
            reason: String::new(),
            time_impact: TimeImpact::None,
            changed_at: ctx.clock.now(),
        });
    }

    // The durable upsert must land before anyone is notified; a cache
    // refresh failure is tolerable because the store stays authoritative.
    ctx.store.upsert_flight_status(&latest).await?;
    resolver.write_back(&latest).await;

    if let Err(e) = dispatcher
        .dispatch_changes(flight.user_id, &latest, &changes)
        .await
    {
        tracing::warn!(
            "Dispatch failed for flight {} owner {}: {}",
            key,
            flight.user_id,
            e
        );
    }

    tracing::info!("Flight {} updated ({} changes)", key, changes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use gatewatch_core::testkit::{ManualClock, MemoryCache, MemoryStore};
    use gatewatch_core::types::{
        FlightKey, FlightStatus, LifecycleStatus, NotificationCategory, NotificationPreferences,
        User,
    };
    use gatewatch_core::{Config, ProviderError};
    use gatewatch_delivery::testkit::RecordingPush;
    use gatewatch_provider::testkit::ScriptedProvider;
    use uuid::Uuid;

    fn status_with(gate: &str, delay: i32, flight_number: &str) -> FlightStatus {
        let departure = Utc.with_ymd_and_hms(2025, 6, 1, 14, 30, 0).unwrap();
        FlightStatus {
            flight_key: FlightKey::new(
                flight_number,
                NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            ),
            flight_number: flight_number.to_string(),
            airline_code: "AA".to_string(),
            status: LifecycleStatus::OnTime,
            gate: gate.to_string(),
            terminal: "4".to_string(),
            boarding_time: departure - chrono::Duration::minutes(40),
            departure_time: departure,
            arrival_time: departure + chrono::Duration::hours(3),
            delay_minutes: delay,
            gate_change: None,
            last_updated: departure - chrono::Duration::hours(5),
            raw_data: None,
        }
    }

    fn tracked(user_id: Uuid, flight_number: &str, created_minute: u32) -> TrackedFlight {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 0, created_minute, 0).unwrap();
        TrackedFlight {
            id: Uuid::new_v4(),
            user_id,
            flight_number: flight_number.to_string(),
            airline_code: "AA".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            departure_airport: "JFK".to_string(),
            arrival_airport: "LAX".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn user(preferences: NotificationPreferences) -> User {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        User {
            id: Uuid::new_v4(),
            email: "traveler@example.com".to_string(),
            push_token: Some("tok-1".to_string()),
            preferences,
            created_at: now,
            updated_at: now,
        }
    }

    struct Fixture {
        ctx: AppContext,
        store: Arc<MemoryStore>,
        provider: Arc<ScriptedProvider>,
        push: Arc<RecordingPush>,
        resolver: StatusResolver,
        dispatcher: NotificationDispatcher,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        ));
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        let provider = Arc::new(ScriptedProvider::new());
        let push = Arc::new(RecordingPush::new());
        let ctx = AppContext::new(
            Arc::new(Config::from_env()),
            store.clone(),
            cache,
            clock,
        );
        let resolver = StatusResolver::new(ctx.store.clone(), ctx.cache.clone(), provider.clone());
        let dispatcher = NotificationDispatcher::new(ctx.clone(), push.clone());
        Fixture {
            ctx,
            store,
            provider,
            push,
            resolver,
            dispatcher,
        }
    }

    async fn cycle(f: &Fixture) {
        poll_active_flights(&f.ctx, &f.resolver, &f.dispatcher)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn gate_change_across_cycles_notifies_exactly_once() {
        let f = fixture();
        let owner = user(NotificationPreferences::default());
        let owner_id = owner.id;
        f.store.put_user(owner);
        f.store.put_tracked(tracked(owner_id, "AA123", 0));
        f.store.put_status(status_with("A1", 0, "AA123"));

        // First cycle: same gate, nothing to report.
        f.provider.push(Ok(status_with("A1", 0, "AA123")));
        cycle(&f).await;
        assert!(f.store.all_notifications().is_empty());

        // Second cycle: gate moved A1 -> A2.
        f.provider.push(Ok(status_with("A2", 0, "AA123")));
        cycle(&f).await;

        let records = f.store.all_notifications();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, NotificationCategory::GateChange);
        assert!(records[0].body.contains("Gate A1"));
        assert!(records[0].body.contains("Gate A2"));

        let sent = f.push.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].data["old_gate"], "A1");
        assert_eq!(sent[0].data["new_gate"], "A2");

        let key = FlightKey::new("AA123", NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        let stored = f.store.stored_status(&key).unwrap();
        assert_eq!(stored.gate, "A2");
        let gate_change = stored.gate_change.unwrap();
        assert_eq!(gate_change.old_gate, "A1");
        assert_eq!(gate_change.new_gate, "A2");
    }

    #[tokio::test]
    async fn unchanged_snapshot_writes_nothing() {
        let f = fixture();
        let owner = user(NotificationPreferences::default());
        let owner_id = owner.id;
        f.store.put_user(owner);
        f.store.put_tracked(tracked(owner_id, "AA123", 0));
        f.store.put_status(status_with("A1", 0, "AA123"));
        let upserts_before = f.store.status_upsert_count();

        f.provider.push(Ok(status_with("A1", 0, "AA123")));
        cycle(&f).await;

        assert_eq!(f.store.status_upsert_count(), upserts_before);
        assert!(f.push.sent().is_empty());
    }

    #[tokio::test]
    async fn disabled_delay_preference_filters_only_that_category() {
        let f = fixture();
        let owner = user(NotificationPreferences {
            notify_delay: false,
            ..NotificationPreferences::default()
        });
        let owner_id = owner.id;
        f.store.put_user(owner);
        f.store.put_tracked(tracked(owner_id, "AA123", 0));
        f.store.put_status(status_with("A1", 0, "AA123"));

        // Gate change and delay increase land in the same cycle.
        f.provider.push(Ok(status_with("A2", 15, "AA123")));
        cycle(&f).await;

        let records = f.store.all_notifications();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, NotificationCategory::GateChange);
        assert!(records
            .iter()
            .all(|n| n.category != NotificationCategory::Delay));

        // The snapshot still records the new delay.
        let key = FlightKey::new("AA123", NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert_eq!(f.store.stored_status(&key).unwrap().delay_minutes, 15);
    }

    #[tokio::test]
    async fn provider_failure_skips_one_flight_not_the_cycle() {
        let f = fixture();
        let owner = user(NotificationPreferences::default());
        let owner_id = owner.id;
        f.store.put_user(owner);
        // Two tracked flights; the provider fails for the first one.
        f.store.put_tracked(tracked(owner_id, "AA123", 0));
        f.store.put_tracked(tracked(owner_id, "BA456", 1));
        f.store.put_status(status_with("A1", 0, "AA123"));
        f.store.put_status(status_with("C3", 0, "BA456"));

        f.provider
            .push(Err(ProviderError::Upstream("timeout".to_string())));
        f.provider.push(Ok(status_with("C9", 0, "BA456")));
        cycle(&f).await;

        let records = f.store.all_notifications();
        assert_eq!(records.len(), 1);
        assert!(records[0].body.contains("Gate C9"));
    }

    #[tokio::test]
    async fn first_snapshot_is_persisted_without_notifying() {
        let f = fixture();
        let owner = user(NotificationPreferences::default());
        let owner_id = owner.id;
        f.store.put_user(owner);
        f.store.put_tracked(tracked(owner_id, "AA123", 0));
        // No stored baseline.

        f.provider.push(Ok(status_with("A1", 0, "AA123")));
        cycle(&f).await;

        let key = FlightKey::new("AA123", NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert!(f.store.stored_status(&key).is_some());
        assert!(f.store.all_notifications().is_empty());
    }
}
