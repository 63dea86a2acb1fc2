use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;

use gatewatch_core::clock::Clock;
use gatewatch_core::config::ProviderConfig;
use gatewatch_core::types::{FlightKey, FlightStatus, LifecycleStatus};
use gatewatch_core::ProviderError;

use crate::FlightProvider;

const BASE_URL: &str = "http://api.aviationstack.com/v1/flights";

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AviationStackResponse {
    #[serde(default)]
    data: Vec<AviationStackFlight>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AviationStackFlight {
    #[serde(default)]
    flight_status: String,
    departure: AviationStackEndpoint,
    arrival: AviationStackEndpoint,
    airline: AviationStackAirline,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AviationStackEndpoint {
    #[serde(default)]
    terminal: Option<String>,
    #[serde(default)]
    gate: Option<String>,
    #[serde(default)]
    delay: Option<i32>,
    #[serde(default)]
    scheduled: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct AviationStackAirline {
    #[serde(default)]
    iata: Option<String>,
}

pub struct AviationStackProvider {
    client: reqwest::Client,
    access_key: String,
    boarding_offset: Duration,
    clock: Arc<dyn Clock>,
}

impl AviationStackProvider {
    pub fn new(config: &ProviderConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            access_key: config.aviationstack_key.clone(),
            boarding_offset: Duration::minutes(config.boarding_offset_minutes),
            clock,
        })
    }
}

#[async_trait]
impl FlightProvider for AviationStackProvider {
    async fn fetch_status(
        &self,
        flight_number: &str,
        date: NaiveDate,
    ) -> Result<FlightStatus, ProviderError> {
        let response = self
            .client
            .get(BASE_URL)
            .query(&[
                ("access_key", self.access_key.as_str()),
                ("flight_iata", flight_number),
                ("flight_date", &date.format("%Y-%m-%d").to_string()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Upstream(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Upstream(format!(
                "aviationstack returned {}",
                response.status()
            )));
        }

        let body: AviationStackResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Upstream(format!("malformed response: {e}")))?;

        let flight = body.data.into_iter().next().ok_or(ProviderError::NotFound)?;

        canonicalize(
            flight,
            flight_number,
            date,
            self.clock.now(),
            self.boarding_offset,
        )
    }
}

fn parse_time(value: &Option<String>, field: &str) -> Result<DateTime<Utc>, ProviderError> {
    let raw = value
        .as_deref()
        .ok_or_else(|| ProviderError::Upstream(format!("missing {field} time")))?;
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ProviderError::Upstream(format!("malformed {field} time {raw}: {e}")))
}

/// Normalize one AviationStack flight into the canonical snapshot. Lifecycle
/// strings outside the known set become `Unknown`; boarding time is derived
/// from the scheduled departure.
pub(crate) fn canonicalize(
    flight: AviationStackFlight,
    flight_number: &str,
    date: NaiveDate,
    now: DateTime<Utc>,
    boarding_offset: Duration,
) -> Result<FlightStatus, ProviderError> {
    let departure_time = parse_time(&flight.departure.scheduled, "departure")?;
    let arrival_time = parse_time(&flight.arrival.scheduled, "arrival")?;

    let raw_data = serde_json::json!({
        "flight_status": flight.flight_status,
        "departure": {
            "terminal": flight.departure.terminal,
            "gate": flight.departure.gate,
            "delay": flight.departure.delay,
            "scheduled": flight.departure.scheduled,
        },
        "arrival": {
            "terminal": flight.arrival.terminal,
            "gate": flight.arrival.gate,
            "delay": flight.arrival.delay,
            "scheduled": flight.arrival.scheduled,
        },
        "airline": { "iata": flight.airline.iata },
    });

    Ok(FlightStatus {
        flight_key: FlightKey::new(flight_number, date),
        flight_number: flight_number.to_string(),
        airline_code: flight.airline.iata.unwrap_or_default(),
        status: map_lifecycle(&flight.flight_status),
        gate: flight.departure.gate.unwrap_or_default(),
        terminal: flight.departure.terminal.unwrap_or_default(),
        boarding_time: departure_time - boarding_offset,
        departure_time,
        arrival_time,
        delay_minutes: flight.departure.delay.unwrap_or(0),
        gate_change: None,
        last_updated: now,
        raw_data: Some(raw_data),
    })
}

fn map_lifecycle(provider_status: &str) -> LifecycleStatus {
    match provider_status {
        "scheduled" => LifecycleStatus::OnTime,
        "active" => LifecycleStatus::BoardingSoon,
        "landed" => LifecycleStatus::Arrived,
        "cancelled" => LifecycleStatus::Cancelled,
        "incident" => LifecycleStatus::Delayed,
        "diverted" => LifecycleStatus::Diverted,
        _ => LifecycleStatus::Unknown,
    }
}
