use uuid::Uuid;

use gatewatch_core::types::{Notification, NotificationPreferences};
use gatewatch_core::{AppContext, Clock, Error, Result, Store};

/// Account-facing notification operations: listing, read receipts and
/// preference management. The dispatcher only ever reads preferences.
pub struct NotificationOps {
    ctx: AppContext,
}

impl NotificationOps {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn user_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        self.ctx.store.user_notifications(user_id).await
    }

    pub async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<()> {
        let matched = self
            .ctx
            .store
            .mark_notification_read(notification_id, user_id, self.ctx.clock.now())
            .await?;
        if matched {
            Ok(())
        } else {
            Err(Error::NotFound("notification"))
        }
    }

    pub async fn update_preferences(
        &self,
        user_id: Uuid,
        preferences: NotificationPreferences,
    ) -> Result<()> {
        let matched = self
            .ctx
            .store
            .update_preferences(user_id, preferences, self.ctx.clock.now())
            .await?;
        if matched {
            Ok(())
        } else {
            Err(Error::NotFound("user"))
        }
    }

    pub async fn set_push_token(&self, user_id: Uuid, token: &str) -> Result<()> {
        let matched = self
            .ctx
            .store
            .set_push_token(user_id, token, self.ctx.clock.now())
            .await?;
        if matched {
            Ok(())
        } else {
            Err(Error::NotFound("user"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gatewatch_core::testkit::{ManualClock, MemoryCache, MemoryStore};
    use gatewatch_core::types::User;
    use gatewatch_core::Config;
    use std::sync::Arc;

    fn fixture() -> (Arc<MemoryStore>, Arc<ManualClock>, NotificationOps) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ));
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(MemoryCache::new(clock.clone()));
        let ctx = AppContext::new(
            Arc::new(Config::from_env()),
            store.clone(),
            cache,
            clock.clone(),
        );
        (store.clone(), clock, NotificationOps::new(ctx))
    }

    fn sample_user() -> User {
        let now = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();
        User {
            id: Uuid::new_v4(),
            email: "traveler@example.com".to_string(),
            push_token: None,
            preferences: NotificationPreferences::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn preference_updates_require_an_existing_user() {
        let (store, _clock, ops) = fixture();
        let prefs = NotificationPreferences {
            notify_delay: false,
            ..NotificationPreferences::default()
        };

        let err = ops
            .update_preferences(Uuid::new_v4(), prefs)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound("user")));

        let user = sample_user();
        let user_id = user.id;
        store.put_user(user);
        ops.update_preferences(user_id, prefs).await.unwrap();
        let stored = store.find_user(user_id).await.unwrap().unwrap();
        assert!(!stored.preferences.notify_delay);
    }

    #[tokio::test]
    async fn set_push_token_updates_the_user() {
        let (store, _clock, ops) = fixture();
        let user = sample_user();
        let user_id = user.id;
        store.put_user(user);

        ops.set_push_token(user_id, "tok-9").await.unwrap();
        let stored = store.find_user(user_id).await.unwrap().unwrap();
        assert_eq!(stored.push_token.as_deref(), Some("tok-9"));
    }

    #[tokio::test]
    async fn mark_read_is_owner_scoped() {
        let (store, clock, ops) = fixture();
        let user = sample_user();
        let user_id = user.id;
        store.put_user(user);

        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            flight_key: "AA123_2025-06-01".to_string(),
            category: gatewatch_core::types::NotificationCategory::Delay,
            title: "t".to_string(),
            body: "b".to_string(),
            priority: gatewatch_core::types::Priority::Normal,
            sent_at: clock.now(),
            read_at: None,
        };
        store.insert_notification(&notification).await.unwrap();

        let err = ops
            .mark_read(notification.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound("notification")));

        ops.mark_read(notification.id, user_id).await.unwrap();
        let listed = ops.user_notifications(user_id).await.unwrap();
        assert!(listed[0].read_at.is_some());
    }
}
