use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::types::{
    Airport, FlightKey, FlightStatus, Notification, NotificationPreferences, TrackedFlight, User,
};

/// Durable document store as seen by the pipeline: single-key finds, inserts
/// and upserts with equality filters on flight key, user reference and the
/// active flag. No multi-key transactions; every call is an atomic
/// single-record operation and concurrent writers converge last-write-wins.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_tracked_flight(&self, flight: &TrackedFlight) -> Result<()>;
    async fn find_tracked_flight(&self, id: Uuid) -> Result<Option<TrackedFlight>>;
    async fn user_tracked_flights(&self, user_id: Uuid) -> Result<Vec<TrackedFlight>>;
    async fn active_tracked_flights(&self) -> Result<Vec<TrackedFlight>>;
    /// Soft delete. Returns false when no active flight matched the id/owner
    /// pair.
    async fn deactivate_tracked_flight(
        &self,
        id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    async fn find_flight_status(&self, key: &FlightKey) -> Result<Option<FlightStatus>>;
    /// Idempotent upsert keyed by flight key.
    async fn upsert_flight_status(&self, status: &FlightStatus) -> Result<()>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: NotificationPreferences,
        now: DateTime<Utc>,
    ) -> Result<bool>;
    async fn set_push_token(&self, user_id: Uuid, token: &str, now: DateTime<Utc>)
        -> Result<bool>;

    async fn find_airport(&self, code: &str) -> Result<Option<Airport>>;

    async fn insert_notification(&self, notification: &Notification) -> Result<()>;
    async fn user_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>>;
    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool>;
}
