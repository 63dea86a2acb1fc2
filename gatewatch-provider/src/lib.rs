pub mod aviationstack;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

use gatewatch_core::clock::Clock;
use gatewatch_core::config::ProviderConfig;
use gatewatch_core::types::FlightStatus;
use gatewatch_core::ProviderError;

pub use aviationstack::AviationStackProvider;

/// Gateway to the external aviation data source. Implementations return the
/// canonical status shape; provider-specific wire formats never leave this
/// crate.
#[async_trait]
pub trait FlightProvider: Send + Sync {
    async fn fetch_status(
        &self,
        flight_number: &str,
        date: NaiveDate,
    ) -> Result<FlightStatus, ProviderError>;
}

/// Adapter stub kept so the provider tag stays selectable in config; every
/// call fails closed.
pub struct FlightAwareProvider;

#[async_trait]
impl FlightProvider for FlightAwareProvider {
    async fn fetch_status(
        &self,
        _flight_number: &str,
        _date: NaiveDate,
    ) -> Result<FlightStatus, ProviderError> {
        Err(ProviderError::Unsupported(
            "flightaware integration not implemented".to_string(),
        ))
    }
}

pub struct AmadeusProvider;

#[async_trait]
impl FlightProvider for AmadeusProvider {
    async fn fetch_status(
        &self,
        _flight_number: &str,
        _date: NaiveDate,
    ) -> Result<FlightStatus, ProviderError> {
        Err(ProviderError::Unsupported(
            "amadeus integration not implemented".to_string(),
        ))
    }
}

/// Resolve the configured provider tag to an adapter. Unknown tags fail here,
/// at startup, rather than on every fetch.
pub fn provider_from_config(
    config: &ProviderConfig,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<Arc<dyn FlightProvider>> {
    match config.name.as_str() {
        "aviationstack" => Ok(Arc::new(AviationStackProvider::new(config, clock)?)),
        "flightaware" => Ok(Arc::new(FlightAwareProvider)),
        "amadeus" => Ok(Arc::new(AmadeusProvider)),
        other => anyhow::bail!("unknown flight data provider: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatewatch_core::clock::SystemClock;

    fn config(name: &str) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            aviationstack_key: "test-key".to_string(),
            flightaware_key: String::new(),
            amadeus_client_id: String::new(),
            amadeus_client_secret: String::new(),
            request_timeout_secs: 5,
            boarding_offset_minutes: 40,
        }
    }

    #[test]
    fn known_tags_resolve() {
        for name in ["aviationstack", "flightaware", "amadeus"] {
            assert!(provider_from_config(&config(name), Arc::new(SystemClock)).is_ok());
        }
    }

    #[test]
    fn unknown_tag_fails_at_config_time() {
        assert!(provider_from_config(&config("pigeon-post"), Arc::new(SystemClock)).is_err());
    }

    #[tokio::test]
    async fn stubs_fail_closed() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let err = FlightAwareProvider
            .fetch_status("AA123", date)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported(_)));
        let err = AmadeusProvider.fetch_status("AA123", date).await.unwrap_err();
        assert!(matches!(err, ProviderError::Unsupported(_)));
    }
}
