use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::redis::{get_connection, RedisPool};
use crate::types::FlightKey;

/// How long a resolved flight status stays hot.
pub const FLIGHT_STATUS_TTL: Duration = Duration::from_secs(5 * 60);
/// Retention window for a reported user location; older is "unknown".
pub const USER_LOCATION_TTL: Duration = Duration::from_secs(10 * 60);
/// Security wait estimates change slowly.
pub const SECURITY_WAIT_TTL: Duration = Duration::from_secs(15 * 60);

pub fn flight_status_key(key: &FlightKey) -> String {
    format!("flight:{key}")
}

pub fn user_location_key(user_id: Uuid) -> String {
    format!("user:location:{user_id}")
}

pub fn security_wait_key(airport_code: &str) -> String {
    format!("airport:wait:{airport_code}")
}

/// TTL key-value cache as seen by the pipeline. Single-key atomic get and
/// set-with-TTL only.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()>;
}

pub struct RedisCache {
    pool: RedisPool,
}

impl RedisCache {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = get_connection(&self.pool).await.map_err(Error::store)?;
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(Error::store)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<()> {
        let mut conn = get_connection(&self.pool).await.map_err(Error::store)?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs())
            .await
            .map_err(Error::store)?;
        Ok(())
    }
}
