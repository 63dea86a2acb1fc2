use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{Error, Result};
use crate::schema::{airports, flight_statuses, notifications, tracked_flights, users};
use crate::store::Store;
use crate::types::{
    Airport, FlightKey, FlightStatus, LifecycleStatus, Notification, NotificationCategory,
    NotificationPreferences, Priority, TrackedFlight, User,
};

/// Postgres-backed document store.
pub struct PgStore {
    pool: Arc<DbPool>,
}

impl PgStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::tracked_flights)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct TrackedFlightRow {
    id: Uuid,
    user_id: Uuid,
    flight_number: String,
    airline_code: String,
    departure_date: NaiveDate,
    departure_airport: String,
    arrival_airport: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TrackedFlightRow> for TrackedFlight {
    fn from(row: TrackedFlightRow) -> Self {
        TrackedFlight {
            id: row.id,
            user_id: row.user_id,
            flight_number: row.flight_number,
            airline_code: row.airline_code,
            departure_date: row.departure_date,
            departure_airport: row.departure_airport,
            arrival_airport: row.arrival_airport,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<&TrackedFlight> for TrackedFlightRow {
    fn from(flight: &TrackedFlight) -> Self {
        TrackedFlightRow {
            id: flight.id,
            user_id: flight.user_id,
            flight_number: flight.flight_number.clone(),
            airline_code: flight.airline_code.clone(),
            departure_date: flight.departure_date,
            departure_airport: flight.departure_airport.clone(),
            arrival_airport: flight.arrival_airport.clone(),
            is_active: flight.is_active,
            created_at: flight.created_at,
            updated_at: flight.updated_at,
        }
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::flight_statuses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct FlightStatusRow {
    flight_key: String,
    flight_number: String,
    airline_code: String,
    status: String,
    gate: String,
    terminal: String,
    boarding_time: DateTime<Utc>,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    delay_minutes: i32,
    gate_change: Option<serde_json::Value>,
    last_updated: DateTime<Utc>,
    raw_data: Option<serde_json::Value>,
}

impl TryFrom<FlightStatusRow> for FlightStatus {
    type Error = Error;

    fn try_from(row: FlightStatusRow) -> Result<Self> {
        let flight_key = FlightKey::from_str(&row.flight_key).map_err(Error::Store)?;
        let gate_change = match row.gate_change {
            Some(value) => match serde_json::from_value(value) {
                Ok(gc) => Some(gc),
                Err(e) => {
                    tracing::warn!("Dropping unreadable gate_change for {}: {}", flight_key, e);
                    None
                }
            },
            None => None,
        };
        Ok(FlightStatus {
            flight_key,
            flight_number: row.flight_number,
            airline_code: row.airline_code,
            status: LifecycleStatus::parse(&row.status),
            gate: row.gate,
            terminal: row.terminal,
            boarding_time: row.boarding_time,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            delay_minutes: row.delay_minutes,
            gate_change,
            last_updated: row.last_updated,
            raw_data: row.raw_data,
        })
    }
}

impl TryFrom<&FlightStatus> for FlightStatusRow {
    type Error = Error;

    fn try_from(status: &FlightStatus) -> Result<Self> {
        let gate_change = status
            .gate_change
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(Error::store)?;
        Ok(FlightStatusRow {
            flight_key: status.flight_key.to_string(),
            flight_number: status.flight_number.clone(),
            airline_code: status.airline_code.clone(),
            status: status.status.as_str().to_string(),
            gate: status.gate.clone(),
            terminal: status.terminal.clone(),
            boarding_time: status.boarding_time,
            departure_time: status.departure_time,
            arrival_time: status.arrival_time,
            delay_minutes: status.delay_minutes,
            gate_change,
            last_updated: status.last_updated,
            raw_data: status.raw_data.clone(),
        })
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct UserRow {
    id: Uuid,
    email: String,
    push_token: Option<String>,
    notify_gate_change: bool,
    notify_boarding: bool,
    notify_delay: bool,
    boarding_reminder_40: bool,
    boarding_reminder_20: bool,
    boarding_reminder_10: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            push_token: row.push_token,
            preferences: NotificationPreferences {
                notify_gate_change: row.notify_gate_change,
                notify_boarding: row.notify_boarding,
                notify_delay: row.notify_delay,
                boarding_reminder_40: row.boarding_reminder_40,
                boarding_reminder_20: row.boarding_reminder_20,
                boarding_reminder_10: row.boarding_reminder_10,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = crate::schema::airports)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct AirportRow {
    code: String,
    name: String,
    city: String,
    country: String,
    timezone: String,
    security_wait_avg: i32,
    latitude: f64,
    longitude: f64,
}

impl From<AirportRow> for Airport {
    fn from(row: AirportRow) -> Self {
        Airport {
            code: row.code,
            name: row.name,
            city: row.city,
            country: row.country,
            timezone: row.timezone,
            security_wait_avg: row.security_wait_avg,
            latitude: row.latitude,
            longitude: row.longitude,
        }
    }
}

#[derive(Queryable, Selectable, Insertable)]
#[diesel(table_name = crate::schema::notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct NotificationRow {
    id: Uuid,
    user_id: Uuid,
    flight_key: String,
    category: String,
    title: String,
    body: String,
    priority: String,
    sent_at: DateTime<Utc>,
    read_at: Option<DateTime<Utc>>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = Error;

    fn try_from(row: NotificationRow) -> Result<Self> {
        let category = NotificationCategory::parse(&row.category)
            .ok_or_else(|| Error::Store(format!("unknown notification category: {}", row.category)))?;
        Ok(Notification {
            id: row.id,
            user_id: row.user_id,
            flight_key: row.flight_key,
            category,
            title: row.title,
            body: row.body,
            priority: if row.priority == "high" {
                Priority::High
            } else {
                Priority::Normal
            },
            sent_at: row.sent_at,
            read_at: row.read_at,
        })
    }
}

impl From<&Notification> for NotificationRow {
    fn from(n: &Notification) -> Self {
        NotificationRow {
            id: n.id,
            user_id: n.user_id,
            flight_key: n.flight_key.clone(),
            category: n.category.as_str().to_string(),
            title: n.title.clone(),
            body: n.body.clone(),
            priority: n.priority.as_str().to_string(),
            sent_at: n.sent_at,
            read_at: n.read_at,
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_tracked_flight(&self, flight: &TrackedFlight) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(Error::store)?;
        diesel::insert_into(tracked_flights::table)
            .values(TrackedFlightRow::from(flight))
            .execute(&mut conn)
            .await
            .map_err(Error::store)?;
        Ok(())
    }

    async fn find_tracked_flight(&self, id: Uuid) -> Result<Option<TrackedFlight>> {
        let mut conn = self.pool.get().await.map_err(Error::store)?;
        let row: Option<TrackedFlightRow> = tracked_flights::table
            .filter(tracked_flights::id.eq(id))
            .select(TrackedFlightRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(Error::store)?;
        Ok(row.map(Into::into))
    }

    async fn user_tracked_flights(&self, user_id: Uuid) -> Result<Vec<TrackedFlight>> {
        let mut conn = self.pool.get().await.map_err(Error::store)?;
        let rows: Vec<TrackedFlightRow> = tracked_flights::table
            .filter(tracked_flights::user_id.eq(user_id))
            .filter(tracked_flights::is_active.eq(true))
            .select(TrackedFlightRow::as_select())
            .load(&mut conn)
            .await
            .map_err(Error::store)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn active_tracked_flights(&self) -> Result<Vec<TrackedFlight>> {
        let mut conn = self.pool.get().await.map_err(Error::store)?;
        let rows: Vec<TrackedFlightRow> = tracked_flights::table
            .filter(tracked_flights::is_active.eq(true))
            .order(tracked_flights::created_at.asc())
            .select(TrackedFlightRow::as_select())
            .load(&mut conn)
            .await
            .map_err(Error::store)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn deactivate_tracked_flight(
        &self,
        id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = self.pool.get().await.map_err(Error::store)?;
        let updated = diesel::update(
            tracked_flights::table
                .filter(tracked_flights::id.eq(id))
                .filter(tracked_flights::user_id.eq(user_id)),
        )
        .set((
            tracked_flights::is_active.eq(false),
            tracked_flights::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .await
        .map_err(Error::store)?;
        Ok(updated > 0)
    }

    async fn find_flight_status(&self, key: &FlightKey) -> Result<Option<FlightStatus>> {
        let mut conn = self.pool.get().await.map_err(Error::store)?;
        let row: Option<FlightStatusRow> = flight_statuses::table
            .filter(flight_statuses::flight_key.eq(key.to_string()))
            .select(FlightStatusRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(Error::store)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn upsert_flight_status(&self, status: &FlightStatus) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(Error::store)?;
        let row = FlightStatusRow::try_from(status)?;
        diesel::insert_into(flight_statuses::table)
            .values(&row)
            .on_conflict(flight_statuses::flight_key)
            .do_update()
            .set((
                flight_statuses::status.eq(excluded(flight_statuses::status)),
                flight_statuses::gate.eq(excluded(flight_statuses::gate)),
                flight_statuses::terminal.eq(excluded(flight_statuses::terminal)),
                flight_statuses::boarding_time.eq(excluded(flight_statuses::boarding_time)),
                flight_statuses::departure_time.eq(excluded(flight_statuses::departure_time)),
                flight_statuses::arrival_time.eq(excluded(flight_statuses::arrival_time)),
                flight_statuses::delay_minutes.eq(excluded(flight_statuses::delay_minutes)),
                flight_statuses::gate_change.eq(excluded(flight_statuses::gate_change)),
                flight_statuses::last_updated.eq(excluded(flight_statuses::last_updated)),
                flight_statuses::raw_data.eq(excluded(flight_statuses::raw_data)),
            ))
            .execute(&mut conn)
            .await
            .map_err(Error::store)?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let mut conn = self.pool.get().await.map_err(Error::store)?;
        let row: Option<UserRow> = users::table
            .filter(users::id.eq(id))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(Error::store)?;
        Ok(row.map(Into::into))
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: NotificationPreferences,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = self.pool.get().await.map_err(Error::store)?;
        let updated = diesel::update(users::table.filter(users::id.eq(user_id)))
            .set((
                users::notify_gate_change.eq(preferences.notify_gate_change),
                users::notify_boarding.eq(preferences.notify_boarding),
                users::notify_delay.eq(preferences.notify_delay),
                users::boarding_reminder_40.eq(preferences.boarding_reminder_40),
                users::boarding_reminder_20.eq(preferences.boarding_reminder_20),
                users::boarding_reminder_10.eq(preferences.boarding_reminder_10),
                users::updated_at.eq(now),
            ))
            .execute(&mut conn)
            .await
            .map_err(Error::store)?;
        Ok(updated > 0)
    }

    async fn set_push_token(
        &self,
        user_id: Uuid,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = self.pool.get().await.map_err(Error::store)?;
        let updated = diesel::update(users::table.filter(users::id.eq(user_id)))
            .set((users::push_token.eq(token), users::updated_at.eq(now)))
            .execute(&mut conn)
            .await
            .map_err(Error::store)?;
        Ok(updated > 0)
    }

    async fn find_airport(&self, code: &str) -> Result<Option<Airport>> {
        let mut conn = self.pool.get().await.map_err(Error::store)?;
        let row: Option<AirportRow> = airports::table
            .filter(airports::code.eq(code))
            .select(AirportRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(Error::store)?;
        Ok(row.map(Into::into))
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(Error::store)?;
        diesel::insert_into(notifications::table)
            .values(NotificationRow::from(notification))
            .execute(&mut conn)
            .await
            .map_err(Error::store)?;
        Ok(())
    }

    async fn user_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let mut conn = self.pool.get().await.map_err(Error::store)?;
        let rows: Vec<NotificationRow> = notifications::table
            .filter(notifications::user_id.eq(user_id))
            .order(notifications::sent_at.desc())
            .select(NotificationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(Error::store)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = self.pool.get().await.map_err(Error::store)?;
        let updated = diesel::update(
            notifications::table
                .filter(notifications::id.eq(id))
                .filter(notifications::user_id.eq(user_id)),
        )
        .set(notifications::read_at.eq(Some(now)))
        .execute(&mut conn)
        .await
        .map_err(Error::store)?;
        Ok(updated > 0)
    }
}
