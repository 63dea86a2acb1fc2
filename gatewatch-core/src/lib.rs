pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod pg;
pub mod redis;
pub mod schema;
pub mod store;
#[cfg(feature = "testkit")]
pub mod testkit;
pub mod types;
pub mod urgency;
pub mod validate;

pub use cache::{Cache, RedisCache};
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use context::AppContext;
pub use db::DbPool;
pub use error::{Error, ProviderError, Result};
pub use pg::PgStore;
pub use redis::RedisPool;
pub use store::Store;
pub use urgency::{classify, classify_walk, UrgencyTier};
