pub mod fcm;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

use async_trait::async_trait;

pub use crate::fcm::FcmTransport;

/// Best-effort push delivery. A failed send is logged by the caller and
/// never rolls anything back; the persisted notification record is the
/// durable artifact.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(
        &self,
        token: &str,
        title: &str,
        body: &str,
        data: &serde_json::Value,
    ) -> anyhow::Result<()>;
}
