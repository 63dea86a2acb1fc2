use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use fcm::{Client, MessageBuilder, NotificationBuilder, Priority};
use tracing;

use gatewatch_core::config::PushConfig;

use crate::PushTransport;

pub struct FcmTransport {
    client: Option<Client>,
    server_key: Option<String>,
    send_timeout: Duration,
}

impl FcmTransport {
    pub fn new(config: &PushConfig) -> Result<Self> {
        let (client, server_key) = if let Some(key) = &config.fcm_server_key {
            tracing::info!("Initializing FCM client");
            (Some(Client::new()), Some(key.clone()))
        } else {
            tracing::warn!("FCM delivery disabled (missing configuration)");
            (None, None)
        };

        Ok(Self {
            client,
            server_key,
            send_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }
}

/// Bound a delivery attempt. The fcm client carries no timeout of its own,
/// and the dispatcher awaits sends inside serialized scheduler cycles, so an
/// unbounded request would stall every subsequent tick.
async fn bounded<T>(limit: Duration, fut: impl Future<Output = T>) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| anyhow!("FCM send timed out after {:?}", limit))
}

#[async_trait]
impl PushTransport for FcmTransport {
    async fn send(
        &self,
        token: &str,
        title: &str,
        body: &str,
        data: &serde_json::Value,
    ) -> Result<()> {
        let (client, server_key) = match (&self.client, &self.server_key) {
            (Some(client), Some(key)) => (client, key),
            _ => {
                tracing::debug!("FCM not configured, skipping");
                return Ok(());
            }
        };

        let mut notification = NotificationBuilder::new();
        notification.title(title);
        notification.body(body);

        let mut message = MessageBuilder::new(server_key, token);
        message.notification(notification.finalize());
        message.priority(Priority::High);
        message
            .data(data)
            .map_err(|e| anyhow!("Failed to attach FCM payload: {}", e))?;

        let response = bounded(self.send_timeout, client.send(message.finalize()))
            .await?
            .map_err(|e| anyhow!("FCM send failed: {}", e))?;

        tracing::debug!("FCM message accepted: {:?}", response.message_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: Option<&str>, timeout: u64) -> PushConfig {
        PushConfig {
            fcm_server_key: key.map(str::to_string),
            request_timeout_secs: timeout,
        }
    }

    #[test]
    fn timeout_comes_from_config() {
        let transport = FcmTransport::new(&config(Some("server-key"), 7)).unwrap();
        assert_eq!(transport.send_timeout, Duration::from_secs(7));
    }

    #[tokio::test]
    async fn unconfigured_transport_skips_silently() {
        let transport = FcmTransport::new(&config(None, 10)).unwrap();
        transport
            .send("tok-1", "t", "b", &serde_json::json!({}))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_send_surfaces_a_timeout_error() {
        let err = bounded(Duration::from_secs(10), std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn prompt_send_passes_through() {
        let value = bounded(Duration::from_secs(10), async { 42 }).await.unwrap();
        assert_eq!(value, 42);
    }
}
