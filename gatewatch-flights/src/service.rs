use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use gatewatch_core::types::{
    FlightKey, FlightStatus, TrackFlightRequest, TrackedFlight,
};
use gatewatch_core::urgency::{classify, UrgencyTier};
use gatewatch_core::{validate, AppContext, Clock, Error, Result, Store};
use gatewatch_provider::FlightProvider;

use crate::resolver::StatusResolver;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeUntil {
    pub boarding_minutes: i64,
    pub departure_minutes: i64,
}

/// Status snapshot enriched with time-remaining and boarding urgency, the
/// shape handed to user-facing callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusView {
    pub flight: FlightStatus,
    pub time_until: TimeUntil,
    pub urgency_level: UrgencyTier,
}

/// User-facing flight tracking operations.
pub struct FlightTracker {
    ctx: AppContext,
    resolver: StatusResolver,
}

impl FlightTracker {
    pub fn new(ctx: AppContext, provider: Arc<dyn FlightProvider>) -> Self {
        let resolver = StatusResolver::new(ctx.store.clone(), ctx.cache.clone(), provider);
        Self { ctx, resolver }
    }

    pub fn resolver(&self) -> &StatusResolver {
        &self.resolver
    }

    /// Start tracking a flight. The flight must be resolvable at the
    /// provider before anything is persisted.
    pub async fn track(&self, user_id: Uuid, req: &TrackFlightRequest) -> Result<TrackedFlight> {
        validate::flight_number(&req.flight_number)?;
        validate::airport_code(&req.departure_airport)?;
        validate::airport_code(&req.arrival_airport)?;
        let departure_date = validate::departure_date(&req.departure_date)?;

        let key = FlightKey::new(req.flight_number.clone(), departure_date);
        let status = self.resolver.fetch_live(&key).await?;

        let now = self.ctx.clock.now();
        let flight = TrackedFlight {
            id: Uuid::new_v4(),
            user_id,
            flight_number: req.flight_number.clone(),
            airline_code: status.airline_code.clone(),
            departure_date,
            departure_airport: req.departure_airport.clone(),
            arrival_airport: req.arrival_airport.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.ctx.store.insert_tracked_flight(&flight).await?;

        // Seed both tiers so the polling scheduler has a baseline snapshot.
        // Losing this write is tolerable; the next poll re-creates it.
        if let Err(e) = self.ctx.store.upsert_flight_status(&status).await {
            tracing::warn!("Failed to seed status for {}: {}", key, e);
        }
        self.resolver.write_back(&status).await;

        Ok(flight)
    }

    /// Stop tracking. Soft delete only; the record stays for audit.
    pub async fn untrack(&self, flight_id: Uuid, user_id: Uuid) -> Result<()> {
        let matched = self
            .ctx
            .store
            .deactivate_tracked_flight(flight_id, user_id, self.ctx.clock.now())
            .await?;
        if matched {
            Ok(())
        } else {
            Err(Error::NotFound("flight"))
        }
    }

    pub async fn user_flights(&self, user_id: Uuid) -> Result<Vec<TrackedFlight>> {
        self.ctx.store.user_tracked_flights(user_id).await
    }

    /// Resolve a flight's status and derive boarding urgency for it.
    pub async fn status_view(&self, flight_number: &str, date: &str) -> Result<StatusView> {
        validate::flight_number(flight_number)?;
        let departure_date = validate::departure_date(date)?;

        let key = FlightKey::new(flight_number, departure_date);
        let flight = self.resolver.resolve(&key).await?;

        Ok(self.build_view(flight))
    }

    fn build_view(&self, flight: FlightStatus) -> StatusView {
        let now = self.ctx.clock.now();
        let boarding_minutes = (flight.boarding_time - now).num_minutes();
        let departure_minutes = (flight.departure_time - now).num_minutes();
        StatusView {
            urgency_level: classify(boarding_minutes),
            time_until: TimeUntil {
                boarding_minutes,
                departure_minutes,
            },
            flight,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use gatewatch_core::testkit::{ManualClock, MemoryCache, MemoryStore};
    use gatewatch_core::types::LifecycleStatus;
    use gatewatch_core::{Config, ProviderError};
    use gatewatch_provider::testkit::ScriptedProvider;

    fn sample_status() -> FlightStatus {
        let departure = Utc.with_ymd_and_hms(2025, 6, 1, 14, 30, 0).unwrap();
        FlightStatus {
            flight_key: FlightKey::new("AA123", NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
            flight_number: "AA123".to_string(),
            airline_code: "AA".to_string(),
            status: LifecycleStatus::OnTime,
            gate: "A1".to_string(),
            terminal: "4".to_string(),
            boarding_time: departure - chrono::Duration::minutes(40),
            departure_time: departure,
            arrival_time: departure + chrono::Duration::hours(3),
            delay_minutes: 0,
            gate_change: None,
            last_updated: departure - chrono::Duration::hours(5),
            raw_data: None,
        }
    }

    fn request() -> TrackFlightRequest {
        TrackFlightRequest {
            flight_number: "AA123".to_string(),
            departure_date: "2025-06-01".to_string(),
            departure_airport: "JFK".to_string(),
            arrival_airport: "LAX".to_string(),
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        provider: Arc<ScriptedProvider>,
        clock: Arc<ManualClock>,
        tracker: FlightTracker,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        ));
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        let provider = Arc::new(ScriptedProvider::new());
        let ctx = AppContext::new(
            Arc::new(Config::from_env()),
            store.clone(),
            cache,
            clock.clone(),
        );
        let tracker = FlightTracker::new(ctx, provider.clone());
        Fixture {
            store,
            provider,
            clock,
            tracker,
        }
    }

    #[tokio::test]
    async fn track_validates_before_any_io() {
        let f = fixture();
        let mut req = request();
        req.flight_number = "not-a-flight".to_string();

        let err = f.tracker.track(Uuid::new_v4(), &req).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(f.provider.calls(), 0);
    }

    #[tokio::test]
    async fn track_requires_the_provider_to_know_the_flight() {
        let f = fixture();
        f.provider.push(Err(ProviderError::NotFound));

        let err = f.tracker.track(Uuid::new_v4(), &request()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound("flight")));
        assert!(f
            .tracker
            .user_flights(Uuid::new_v4())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn track_persists_flight_and_seeds_status() {
        let f = fixture();
        f.provider.push(Ok(sample_status()));
        let user_id = Uuid::new_v4();

        let flight = f.tracker.track(user_id, &request()).await.unwrap();

        assert!(flight.is_active);
        assert_eq!(flight.airline_code, "AA");
        assert_eq!(flight.flight_key().to_string(), "AA123_2025-06-01");
        assert_eq!(f.tracker.user_flights(user_id).await.unwrap().len(), 1);
        assert!(f.store.stored_status(&flight.flight_key()).is_some());
    }

    #[tokio::test]
    async fn untrack_soft_deletes_for_the_owner_only() {
        let f = fixture();
        f.provider.push(Ok(sample_status()));
        let user_id = Uuid::new_v4();
        let flight = f.tracker.track(user_id, &request()).await.unwrap();

        let err = f
            .tracker
            .untrack(flight.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound("flight")));

        f.tracker.untrack(flight.id, user_id).await.unwrap();
        assert!(f.tracker.user_flights(user_id).await.unwrap().is_empty());
        // The record itself survives the untrack.
        assert!(f
            .store
            .find_tracked_flight(flight.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn status_view_derives_urgency_from_boarding_time() {
        let f = fixture();
        f.store.put_status(sample_status());
        // Boarding at 13:50; 13:35 leaves 15 minutes.
        f.clock
            .set(Utc.with_ymd_and_hms(2025, 6, 1, 13, 35, 0).unwrap());

        let view = f.tracker.status_view("AA123", "2025-06-01").await.unwrap();

        assert_eq!(view.time_until.boarding_minutes, 15);
        assert_eq!(view.time_until.departure_minutes, 55);
        assert_eq!(view.urgency_level, UrgencyTier::Urgent);
    }
}
