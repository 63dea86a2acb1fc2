use std::sync::Arc;

use crate::cache::{Cache, RedisCache};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::create_pool as create_db_pool;
use crate::pg::PgStore;
use crate::redis::create_pool as create_redis_pool;
use crate::store::Store;

/// Capability bundle shared by services and schedulers. The store, cache and
/// clock are trait objects so tests can substitute deterministic
/// implementations; the provider and push transport are passed separately by
/// the crates that own those traits.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub cache: Arc<dyn Cache>,
    pub clock: Arc<dyn Clock>,
}

impl AppContext {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn Store>,
        cache: Arc<dyn Cache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            cache,
            clock,
        }
    }

    /// Production wiring: Postgres store, Redis cache, system clock.
    pub async fn connect(config: Config) -> anyhow::Result<Self> {
        let db_pool = create_db_pool(&config.database).await?;
        let redis_pool = create_redis_pool(&config.redis).await?;

        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(PgStore::new(db_pool)),
            cache: Arc::new(RedisCache::new(redis_pool)),
            clock: Arc::new(SystemClock),
        })
    }
}
