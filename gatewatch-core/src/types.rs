use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Composite flight identifier. Flight numbers are reused daily, so a flight
/// is only unambiguous together with its calendar departure date.
///
/// The string form `"{flightNumber}_{YYYY-MM-DD}"` is an external contract:
/// it is the store key, the cache key suffix and the value carried in push
/// payloads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlightKey {
    pub flight_number: String,
    pub departure_date: NaiveDate,
}

impl FlightKey {
    pub fn new(flight_number: impl Into<String>, departure_date: NaiveDate) -> Self {
        Self {
            flight_number: flight_number.into(),
            departure_date,
        }
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}",
            self.flight_number,
            self.departure_date.format("%Y-%m-%d")
        )
    }
}

impl FromStr for FlightKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (number, date) = s
            .rsplit_once('_')
            .ok_or_else(|| format!("malformed flight key: {s}"))?;
        let departure_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| format!("malformed flight key date in {s}: {e}"))?;
        if number.is_empty() {
            return Err(format!("malformed flight key: {s}"));
        }
        Ok(FlightKey::new(number, departure_date))
    }
}

/// Flight lifecycle as reported by the provider, normalized to a closed set.
/// Unrecognized provider strings become `Unknown`, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleStatus {
    #[serde(rename = "On Time")]
    OnTime,
    #[serde(rename = "Boarding Soon")]
    BoardingSoon,
    #[serde(rename = "Arrived")]
    Arrived,
    #[serde(rename = "Cancelled")]
    Cancelled,
    #[serde(rename = "Delayed")]
    Delayed,
    #[serde(rename = "Diverted")]
    Diverted,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl LifecycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::OnTime => "On Time",
            LifecycleStatus::BoardingSoon => "Boarding Soon",
            LifecycleStatus::Arrived => "Arrived",
            LifecycleStatus::Cancelled => "Cancelled",
            LifecycleStatus::Delayed => "Delayed",
            LifecycleStatus::Diverted => "Diverted",
            LifecycleStatus::Unknown => "Unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "On Time" => LifecycleStatus::OnTime,
            "Boarding Soon" => LifecycleStatus::BoardingSoon,
            "Arrived" => LifecycleStatus::Arrived,
            "Cancelled" => LifecycleStatus::Cancelled,
            "Delayed" => LifecycleStatus::Delayed,
            "Diverted" => LifecycleStatus::Diverted,
            _ => LifecycleStatus::Unknown,
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rough time impact of a gate change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeImpact {
    None,
    Minor,
    Major,
}

/// Attached to a `FlightStatus` when the most recent detected change was a
/// gate change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateChange {
    pub old_gate: String,
    pub new_gate: String,
    pub reason: String,
    pub time_impact: TimeImpact,
    pub changed_at: DateTime<Utc>,
}

/// Canonical provider-agnostic status snapshot for one flight key.
///
/// Exactly one exists per flight key at any time; concurrent resolutions
/// converge by last-write-wins upsert. `boarding_time` is always derived
/// from the departure time minus the configured boarding offset and never
/// stored as independent ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightStatus {
    pub flight_key: FlightKey,
    pub flight_number: String,
    pub airline_code: String,
    pub status: LifecycleStatus,
    pub gate: String,
    pub terminal: String,
    pub boarding_time: DateTime<Utc>,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub delay_minutes: i32,
    pub gate_change: Option<GateChange>,
    pub last_updated: DateTime<Utc>,
    /// Untransformed provider payload, kept for audit only.
    pub raw_data: Option<serde_json::Value>,
}

/// A flight a user asked us to watch. Soft-deleted by flipping `is_active`;
/// rows are never removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedFlight {
    pub id: Uuid,
    pub user_id: Uuid,
    pub flight_number: String,
    pub airline_code: String,
    pub departure_date: NaiveDate,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackedFlight {
    pub fn flight_key(&self) -> FlightKey {
        FlightKey::new(self.flight_number.clone(), self.departure_date)
    }
}

/// What the user asked for when tracking a flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackFlightRequest {
    pub flight_number: String,
    /// YYYY-MM-DD
    pub departure_date: String,
    pub departure_airport: String,
    pub arrival_airport: String,
}

/// Per-user notification switches. Read-only input to the dispatcher and
/// reminder scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub notify_gate_change: bool,
    pub notify_boarding: bool,
    pub notify_delay: bool,
    pub boarding_reminder_40: bool,
    pub boarding_reminder_20: bool,
    pub boarding_reminder_10: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            notify_gate_change: true,
            notify_boarding: true,
            notify_delay: true,
            boarding_reminder_40: true,
            boarding_reminder_20: true,
            boarding_reminder_10: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub push_token: Option<String>,
    pub preferences: NotificationPreferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    GateChange,
    StatusChange,
    Delay,
    #[serde(rename = "boarding_40")]
    Boarding40,
    #[serde(rename = "boarding_20")]
    Boarding20,
    #[serde(rename = "boarding_10")]
    Boarding10,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::GateChange => "gate_change",
            NotificationCategory::StatusChange => "status_change",
            NotificationCategory::Delay => "delay",
            NotificationCategory::Boarding40 => "boarding_40",
            NotificationCategory::Boarding20 => "boarding_20",
            NotificationCategory::Boarding10 => "boarding_10",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "gate_change" => Some(NotificationCategory::GateChange),
            "status_change" => Some(NotificationCategory::StatusChange),
            "delay" => Some(NotificationCategory::Delay),
            "boarding_40" => Some(NotificationCategory::Boarding40),
            "boarding_20" => Some(NotificationCategory::Boarding20),
            "boarding_10" => Some(NotificationCategory::Boarding10),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

/// Append-only notification record. The persisted row, not push delivery,
/// is the artifact of record. Mutated only to set `read_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub flight_key: String,
    pub category: NotificationCategory,
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Last reported user position. Lives only in the cache with a fixed
/// retention window; anything older is "unknown location".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLocation {
    pub user_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airport {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub timezone: String,
    /// Average security wait in minutes.
    pub security_wait_avg: i32,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityWaitTime {
    pub airport_code: String,
    pub current_wait_minutes: i32,
    pub timestamp: DateTime<Utc>,
}
