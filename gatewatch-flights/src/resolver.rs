use std::sync::Arc;

use gatewatch_core::cache::{self, Cache, FLIGHT_STATUS_TTL};
use gatewatch_core::store::Store;
use gatewatch_core::types::{FlightKey, FlightStatus};
use gatewatch_core::{Error, ProviderError, Result};
use gatewatch_provider::FlightProvider;

/// Layered status lookup: TTL cache, then durable store, then provider.
///
/// The provider is the expensive, rate-limited dependency, so the two
/// cheaper tiers absorb the bulk of reads. A snapshot always comes from a
/// single tier; partial data is never mixed.
pub struct StatusResolver {
    store: Arc<dyn Store>,
    cache: Arc<dyn Cache>,
    provider: Arc<dyn FlightProvider>,
}

impl StatusResolver {
    pub fn new(
        store: Arc<dyn Store>,
        cache: Arc<dyn Cache>,
        provider: Arc<dyn FlightProvider>,
    ) -> Self {
        Self {
            store,
            cache,
            provider,
        }
    }

    /// Full resolution chain. A provider miss-then-hit writes back to both
    /// the store and the cache so the next read is cheap.
    pub async fn resolve(&self, key: &FlightKey) -> Result<FlightStatus> {
        if let Some(status) = self.cached(key).await {
            return Ok(status);
        }

        if let Some(status) = self.store.find_flight_status(key).await? {
            self.write_back(&status).await;
            return Ok(status);
        }

        let status = self.fetch_live(key).await?;
        self.store.upsert_flight_status(&status).await?;
        self.write_back(&status).await;
        Ok(status)
    }

    /// Provider-only fetch, bypassing cache and store. The polling scheduler
    /// uses this: its goal is detecting drift, not serving a cheap read.
    pub async fn fetch_live(&self, key: &FlightKey) -> Result<FlightStatus> {
        match self
            .provider
            .fetch_status(&key.flight_number, key.departure_date)
            .await
        {
            Ok(status) => Ok(status),
            Err(ProviderError::NotFound) => Err(Error::NotFound("flight")),
            Err(e) => Err(Error::Provider(e)),
        }
    }

    /// Store-only read. The reminder scheduler uses this so reminders never
    /// add provider load.
    pub async fn stored(&self, key: &FlightKey) -> Result<Option<FlightStatus>> {
        self.store.find_flight_status(key).await
    }

    /// Refresh the cache tier after a store write or store hit. Failures are
    /// non-fatal: the store stays authoritative.
    pub async fn write_back(&self, status: &FlightStatus) {
        let key = cache::flight_status_key(&status.flight_key);
        let bytes = match serde_json::to_vec(status) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to serialize status for {}: {}", status.flight_key, e);
                return;
            }
        };
        if let Err(e) = self.cache.set(&key, &bytes, FLIGHT_STATUS_TTL).await {
            tracing::warn!("Cache write-back failed for {}: {}", status.flight_key, e);
        }
    }

    async fn cached(&self, key: &FlightKey) -> Option<FlightStatus> {
        let cache_key = cache::flight_status_key(key);
        match self.cache.get(&cache_key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(status) => Some(status),
                Err(e) => {
                    // Unreadable entries are a miss; the store can serve it.
                    tracing::warn!("Dropping unreadable cached status for {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use gatewatch_core::testkit::{ManualClock, MemoryCache, MemoryStore};
    use gatewatch_core::types::LifecycleStatus;
    use gatewatch_provider::testkit::ScriptedProvider;

    fn key() -> FlightKey {
        FlightKey::new("AA123", NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
    }

    fn sample_status() -> FlightStatus {
        let departure = Utc.with_ymd_and_hms(2025, 6, 1, 14, 30, 0).unwrap();
        FlightStatus {
            flight_key: key(),
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

    struct Fixture {
        store: Arc<MemoryStore>,
        cache: Arc<MemoryCache>,
        provider: Arc<ScriptedProvider>,
        resolver: StatusResolver,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        ));
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCache::new(clock));
        let provider = Arc::new(ScriptedProvider::new());
        let resolver = StatusResolver::new(store.clone(), cache.clone(), provider.clone());
        Fixture {
            store,
            cache,
            provider,
            resolver,
        }
    }

    #[tokio::test]
    async fn cache_hit_never_calls_the_provider() {
        let f = fixture();
        let status = sample_status();
        let bytes = serde_json::to_vec(&status).unwrap();
        f.cache
            .set(&cache::flight_status_key(&key()), &bytes, FLIGHT_STATUS_TTL)
            .await
            .unwrap();
        let before = f.cache.set_count();

        let resolved = f.resolver.resolve(&key()).await.unwrap();

        assert_eq!(resolved.gate, "A1");
        assert_eq!(f.provider.calls(), 0);
        // A cache hit needs no write-back either.
        assert_eq!(f.cache.set_count(), before);
    }

    #[tokio::test]
    async fn store_hit_writes_back_to_cache_exactly_once() {
        let f = fixture();
        f.store.put_status(sample_status());

        let resolved = f.resolver.resolve(&key()).await.unwrap();

        assert_eq!(resolved.gate, "A1");
        assert_eq!(f.provider.calls(), 0);
        assert_eq!(f.cache.set_count(), 1);
        assert!(f.cache.contains(&cache::flight_status_key(&key())));
    }

    #[tokio::test]
    async fn cold_key_fetches_once_and_populates_both_tiers() {
        let f = fixture();
        f.provider.push(Ok(sample_status()));

        let resolved = f.resolver.resolve(&key()).await.unwrap();

        assert_eq!(resolved.gate, "A1");
        assert_eq!(f.provider.calls(), 1);
        assert!(f.store.stored_status(&key()).is_some());
        assert!(f.cache.contains(&cache::flight_status_key(&key())));

        // The next read is served without another provider call.
        f.resolver.resolve(&key()).await.unwrap();
        assert_eq!(f.provider.calls(), 1);
    }

    #[tokio::test]
    async fn provider_miss_surfaces_not_found() {
        let f = fixture();
        f.provider.push(Err(ProviderError::NotFound));

        let err = f.resolver.resolve(&key()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound("flight")));
        assert!(f.store.stored_status(&key()).is_none());
    }

    #[tokio::test]
    async fn corrupt_cache_entry_falls_through_to_the_store() {
        let f = fixture();
        f.cache
            .set(
                &cache::flight_status_key(&key()),
                b"{not json",
                FLIGHT_STATUS_TTL,
            )
            .await
            .unwrap();
        f.store.put_status(sample_status());

        let resolved = f.resolver.resolve(&key()).await.unwrap();
        assert_eq!(resolved.gate, "A1");
        assert_eq!(f.provider.calls(), 0);
    }

    #[tokio::test]
    async fn upstream_provider_error_is_surfaced() {
        let f = fixture();
        f.provider
            .push(Err(ProviderError::Upstream("timeout".to_string())));

        let err = f.resolver.resolve(&key()).await.unwrap_err();
        assert!(matches!(err, Error::Provider(ProviderError::Upstream(_))));
    }
}
