//! Airport proximity: user location reports, gate walk-time estimates and
//! security wait lookups. Locations are cache-only with a short TTL; an
//! expired location simply means "whereabouts unknown".

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gatewatch_core::cache::{
    security_wait_key, user_location_key, SECURITY_WAIT_TTL, USER_LOCATION_TTL,
};
use gatewatch_core::types::{SecurityWaitTime, UserLocation};
use gatewatch_core::urgency::{classify_walk, UrgencyTier};
use gatewatch_core::{validate, AppContext, Cache, Clock, Error, Result, Store};

/// Mean radius, meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;
/// Average airport walking pace, meters per second.
const WALK_SPEED_MPS: f64 = 1.4;

/// Walk-time estimate for a tracked flight, relative to its boarding time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkEstimate {
    pub distance_meters: f64,
    pub walk_minutes: i64,
    pub minutes_until_boarding: i64,
    pub urgency_level: UrgencyTier,
    pub recommended_action: String,
}

pub struct ProximityService {
    ctx: AppContext,
}

impl ProximityService {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Record the user's position. Cache-only with a 10 minute TTL; a stale
    /// report ages out rather than being treated as current.
    pub async fn update_location(
        &self,
        user_id: Uuid,
        latitude: f64,
        longitude: f64,
    ) -> Result<()> {
        validate::coordinates(latitude, longitude)?;

        let location = UserLocation {
            user_id,
            latitude,
            longitude,
            timestamp: self.ctx.clock.now(),
        };
        let payload = serde_json::to_vec(&location).map_err(Error::store)?;
        self.ctx
            .cache
            .set(&user_location_key(user_id), &payload, USER_LOCATION_TTL)
            .await
    }

    /// Estimate the walk from the user's last known position to the
    /// departure airport of one of their tracked flights, graded against
    /// the minutes left until boarding.
    pub async fn walk_time(&self, user_id: Uuid, flight_id: Uuid) -> Result<WalkEstimate> {
        let location = self
            .location(user_id)
            .await?
            .ok_or(Error::NotFound("location"))?;

        let flight = self
            .ctx
            .store
            .find_tracked_flight(flight_id)
            .await?
            .ok_or(Error::NotFound("flight"))?;
        let airport = self
            .ctx
            .store
            .find_airport(&flight.departure_airport)
            .await?
            .ok_or(Error::NotFound("airport"))?;
        let status = self
            .ctx
            .store
            .find_flight_status(&flight.flight_key())
            .await?
            .ok_or(Error::NotFound("flight"))?;

        let distance_meters = haversine(
            location.latitude,
            location.longitude,
            airport.latitude,
            airport.longitude,
        );
        let walk_minutes = (distance_meters / WALK_SPEED_MPS / 60.0) as i64;
        let minutes_until_boarding = (status.boarding_time - self.ctx.clock.now()).num_minutes();
        let urgency_level = classify_walk(walk_minutes, minutes_until_boarding);

        Ok(WalkEstimate {
            distance_meters,
            walk_minutes,
            minutes_until_boarding,
            urgency_level,
            recommended_action: recommended_action(urgency_level).to_string(),
        })
    }

    /// Current security wait for an airport, served from cache for 15
    /// minutes before falling back to the airport's historical average.
    pub async fn security_wait(&self, airport_code: &str) -> Result<SecurityWaitTime> {
        validate::airport_code(airport_code)?;

        let key = security_wait_key(airport_code);
        if let Some(raw) = self.ctx.cache.get(&key).await? {
            match serde_json::from_slice::<SecurityWaitTime>(&raw) {
                Ok(wait) => return Ok(wait),
                Err(e) => {
                    tracing::warn!("Discarding corrupt security wait entry for {key}: {e}");
                }
            }
        }

        let airport = self
            .ctx
            .store
            .find_airport(airport_code)
            .await?
            .ok_or(Error::NotFound("airport"))?;
        let wait = SecurityWaitTime {
            airport_code: airport.code,
            current_wait_minutes: airport.security_wait_avg,
            timestamp: self.ctx.clock.now(),
        };

        match serde_json::to_vec(&wait) {
            Ok(payload) => {
                if let Err(e) = self.ctx.cache.set(&key, &payload, SECURITY_WAIT_TTL).await {
                    tracing::warn!("Failed to cache security wait for {key}: {e}");
                }
            }
            Err(e) => tracing::warn!("Failed to serialize security wait for {key}: {e}"),
        }

        Ok(wait)
    }

    async fn location(&self, user_id: Uuid) -> Result<Option<UserLocation>> {
        let Some(raw) = self.ctx.cache.get(&user_location_key(user_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_slice(&raw) {
            Ok(location) => Ok(Some(location)),
            Err(e) => {
                tracing::warn!("Discarding corrupt location entry for user {user_id}: {e}");
                Ok(None)
            }
        }
    }
}

fn recommended_action(tier: UrgencyTier) -> &'static str {
    match tier {
        UrgencyTier::Critical => "Head to gate immediately!",
        UrgencyTier::Urgent => "Start heading to gate now",
        UrgencyTier::Moderate => "Consider heading to gate soon",
        UrgencyTier::Calm => "You have plenty of time",
    }
}

/// Great-circle distance in meters.
fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}
