//! In-memory collaborator implementations for tests. Enabled with the
//! `testkit` feature; downstream crates pull it in through dev-dependencies.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::cache::Cache;
use crate::clock::Clock;
use crate::error::Result;
use crate::store::Store;
use crate::types::{
    Airport, FlightKey, FlightStatus, Notification, NotificationPreferences, TrackedFlight, User,
};

/// Clock that only moves when a test tells it to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

struct CacheInner {
    entries: HashMap<String, (Vec<u8>, DateTime<Utc>)>,
    sets: usize,
}

/// TTL cache with expiry driven by an injected clock.
pub struct MemoryCache {
    clock: std::sync::Arc<dyn Clock>,
    inner: Mutex<CacheInner>,
}

impl MemoryCache {
    pub fn new(clock: std::sync::Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                sets: 0,
            }),
        }
    }

    /// Total number of `set` calls, for asserting write-back counts.
    pub fn set_count(&self) -> usize {
        self.inner.lock().unwrap().sets
    }

    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();
        let inner = self.inner.lock().unwrap();
        inner
            .entries
            .get(key)
            .map(|(_, expires)| *expires > now)
            .unwrap_or(false)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let now = self.clock.now();
        let inner = self.inner.lock().unwrap();
        Ok(inner.entries.get(key).and_then(|(value, expires)| {
            if *expires > now {
                Some(value.clone())
            } else {
                None
            }
        }))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let expires = self.clock.now() + ChronoDuration::from_std(ttl).unwrap();
        let mut inner = self.inner.lock().unwrap();
        inner.sets += 1;
        inner.entries.insert(key.to_string(), (value.to_vec(), expires));
        Ok(())
    }
}

#[derive(Default)]
struct StoreInner {
    tracked: HashMap<Uuid, TrackedFlight>,
    statuses: HashMap<String, FlightStatus>,
    users: HashMap<Uuid, User>,
    airports: HashMap<String, Airport>,
    notifications: Vec<Notification>,
    status_upserts: usize,
}

/// Hash-map document store with the same last-write-wins semantics as the
/// Postgres implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_user(&self, user: User) {
        self.inner.lock().unwrap().users.insert(user.id, user);
    }

    pub fn put_airport(&self, airport: Airport) {
        self.inner
            .lock()
            .unwrap()
            .airports
            .insert(airport.code.clone(), airport);
    }

    pub fn remove_airport(&self, code: &str) {
        self.inner.lock().unwrap().airports.remove(code);
    }

    pub fn put_status(&self, status: FlightStatus) {
        self.inner
            .lock()
            .unwrap()
            .statuses
            .insert(status.flight_key.to_string(), status);
    }

    pub fn put_tracked(&self, flight: TrackedFlight) {
        self.inner.lock().unwrap().tracked.insert(flight.id, flight);
    }

    pub fn stored_status(&self, key: &FlightKey) -> Option<FlightStatus> {
        self.inner
            .lock()
            .unwrap()
            .statuses
            .get(&key.to_string())
            .cloned()
    }

    pub fn all_notifications(&self) -> Vec<Notification> {
        self.inner.lock().unwrap().notifications.clone()
    }

    pub fn status_upsert_count(&self) -> usize {
        self.inner.lock().unwrap().status_upserts
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_tracked_flight(&self, flight: &TrackedFlight) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .tracked
            .insert(flight.id, flight.clone());
        Ok(())
    }

    async fn find_tracked_flight(&self, id: Uuid) -> Result<Option<TrackedFlight>> {
        Ok(self.inner.lock().unwrap().tracked.get(&id).cloned())
    }

    async fn user_tracked_flights(&self, user_id: Uuid) -> Result<Vec<TrackedFlight>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .tracked
            .values()
            .filter(|f| f.user_id == user_id && f.is_active)
            .cloned()
            .collect())
    }

    async fn active_tracked_flights(&self) -> Result<Vec<TrackedFlight>> {
        let mut flights: Vec<TrackedFlight> = self
            .inner
            .lock()
            .unwrap()
            .tracked
            .values()
            .filter(|f| f.is_active)
            .cloned()
            .collect();
        flights.sort_by_key(|f| f.created_at);
        Ok(flights)
    }

    async fn deactivate_tracked_flight(
        &self,
        id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        match inner.tracked.get_mut(&id) {
            Some(flight) if flight.user_id == user_id => {
                flight.is_active = false;
                flight.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_flight_status(&self, key: &FlightKey) -> Result<Option<FlightStatus>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .statuses
            .get(&key.to_string())
            .cloned())
    }

    async fn upsert_flight_status(&self, status: &FlightStatus) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.status_upserts += 1;
        inner
            .statuses
            .insert(status.flight_key.to_string(), status.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.inner.lock().unwrap().users.get(&id).cloned())
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: NotificationPreferences,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        match inner.users.get_mut(&user_id) {
            Some(user) => {
                user.preferences = preferences;
                user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_push_token(
        &self,
        user_id: Uuid,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        match inner.users.get_mut(&user_id) {
            Some(user) => {
                user.push_token = Some(token.to_string());
                user.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_airport(&self, code: &str) -> Result<Option<Airport>> {
        Ok(self.inner.lock().unwrap().airports.get(code).cloned())
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .notifications
            .push(notification.clone());
        Ok(())
    }

    async fn user_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let mut list: Vec<Notification> = self
            .inner
            .lock()
            .unwrap()
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(list)
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        for n in inner.notifications.iter_mut() {
            if n.id == id && n.user_id == user_id {
                n.read_at = Some(now);
                return Ok(true);
            }
        }
        Ok(false)
    }
}
