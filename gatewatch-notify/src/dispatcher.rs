use std::sync::Arc;
use uuid::Uuid;

use gatewatch_core::types::{
    FlightStatus, Notification, NotificationCategory, NotificationPreferences, Priority, User,
};
use gatewatch_core::{AppContext, Clock, Error, Result, Store};
use gatewatch_delivery::PushTransport;
use gatewatch_flights::StatusChange;

/// Fixed boarding-reminder thresholds, in minutes before boarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardingThreshold {
    T40,
    T20,
    T10,
}

impl BoardingThreshold {
    pub fn from_minutes(minutes: i64) -> Option<Self> {
        match minutes {
            40 => Some(BoardingThreshold::T40),
            20 => Some(BoardingThreshold::T20),
            10 => Some(BoardingThreshold::T10),
            _ => None,
        }
    }

    pub fn minutes(&self) -> i64 {
        match self {
            BoardingThreshold::T40 => 40,
            BoardingThreshold::T20 => 20,
            BoardingThreshold::T10 => 10,
        }
    }

    pub fn category(&self) -> NotificationCategory {
        match self {
            BoardingThreshold::T40 => NotificationCategory::Boarding40,
            BoardingThreshold::T20 => NotificationCategory::Boarding20,
            BoardingThreshold::T10 => NotificationCategory::Boarding10,
        }
    }

    fn enabled(&self, prefs: &NotificationPreferences) -> bool {
        match self {
            BoardingThreshold::T40 => prefs.boarding_reminder_40,
            BoardingThreshold::T20 => prefs.boarding_reminder_20,
            BoardingThreshold::T10 => prefs.boarding_reminder_10,
        }
    }
}

/// Turns detected changes and boarding thresholds into persisted
/// notification records plus best-effort pushes.
pub struct NotificationDispatcher {
    ctx: AppContext,
    push: Arc<dyn PushTransport>,
}

impl NotificationDispatcher {
    pub fn new(ctx: AppContext, push: Arc<dyn PushTransport>) -> Self {
        Self { ctx, push }
    }

    /// Emit one notification per change category the user opted into.
    /// Without a registered push token this is a no-op, not an error.
    pub async fn dispatch_changes(
        &self,
        user_id: Uuid,
        status: &FlightStatus,
        changes: &[StatusChange],
    ) -> Result<()> {
        let user = self
            .ctx
            .store
            .find_user(user_id)
            .await?
            .ok_or(Error::NotFound("user"))?;

        let Some(token) = user.push_token.clone() else {
            tracing::debug!("User {} has no push token, skipping dispatch", user.id);
            return Ok(());
        };

        for change in changes {
            if !change_enabled(&user.preferences, change) {
                tracing::debug!(
                    "User {} disabled {} notifications, skipping",
                    user.id,
                    change.category()
                );
                continue;
            }
            let (title, body, priority, data) = render_change(status, change);
            self.emit(&user, &token, status, change.category(), title, body, priority, data)
                .await;
        }

        Ok(())
    }

    /// Emit one boarding reminder for a threshold the flight just crossed,
    /// if the user opted into that threshold.
    pub async fn dispatch_boarding_reminder(
        &self,
        user_id: Uuid,
        status: &FlightStatus,
        threshold: BoardingThreshold,
    ) -> Result<()> {
        let user = self
            .ctx
            .store
            .find_user(user_id)
            .await?
            .ok_or(Error::NotFound("user"))?;

        let Some(token) = user.push_token.clone() else {
            return Ok(());
        };

        if !threshold.enabled(&user.preferences) {
            return Ok(());
        }

        let (title, priority) = match threshold {
            BoardingThreshold::T40 => ("⏰ Start Heading to Gate", Priority::Normal),
            BoardingThreshold::T20 => ("🚨 Boarding Soon", Priority::High),
            BoardingThreshold::T10 => ("🔴 FINAL CALL", Priority::High),
        };
        let body = format!(
            "{} boards in {} minutes - Gate {}",
            status.flight_number,
            threshold.minutes(),
            status.gate
        );
        let data = serde_json::json!({
            "category": threshold.category().as_str(),
            "flight_key": status.flight_key.to_string(),
            "gate": status.gate,
        });

        self.emit(
            &user,
            &token,
            status,
            threshold.category(),
            title.to_string(),
            body,
            priority,
            data,
        )
        .await;

        Ok(())
    }

    /// Persist the record, then push. The record is the artifact of record:
    /// if persisting fails the push is skipped, and a failed push never
    /// rolls the record back.
    #[allow(clippy::too_many_arguments)]
    async fn emit(
        &self,
        user: &User,
        token: &str,
        status: &FlightStatus,
        category: NotificationCategory,
        title: String,
        body: String,
        priority: Priority,
        data: serde_json::Value,
    ) {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: user.id,
            flight_key: status.flight_key.to_string(),
            category,
            title: title.clone(),
            body: body.clone(),
            priority,
            sent_at: self.ctx.clock.now(),
            read_at: None,
        };

        if let Err(e) = self.ctx.store.insert_notification(&notification).await {
            tracing::error!(
                "Failed to persist {} notification for user {}: {}",
                category,
                user.id,
                e
            );
            return;
        }

        if let Err(e) = self.push.send(token, &title, &body, &data).await {
            tracing::warn!(
                "Push delivery failed for user {} ({}): {}",
                user.id,
                category,
                e
            );
        }
    }
}

fn change_enabled(prefs: &NotificationPreferences, change: &StatusChange) -> bool {
    match change {
        StatusChange::Gate { .. } => prefs.notify_gate_change,
        StatusChange::Lifecycle { .. } => prefs.notify_boarding,
        StatusChange::Delay { .. } => prefs.notify_delay,
    }
}

fn render_change(
    status: &FlightStatus,
    change: &StatusChange,
) -> (String, String, Priority, serde_json::Value) {
    let flight_key = status.flight_key.to_string();
    match change {
        StatusChange::Gate { old, new } => (
            "⚡ Gate Changed".to_string(),
            format!(
                "{} moved from Gate {} to Gate {}",
                status.flight_number, old, new
            ),
            Priority::High,
            serde_json::json!({
                "category": "gate_change",
                "flight_key": flight_key,
                "old_gate": old,
                "new_gate": new,
            }),
        ),
        StatusChange::Lifecycle { new, .. } => (
            format!("Flight {}", new),
            format!("{} status changed to {}", status.flight_number, new),
            Priority::Normal,
            serde_json::json!({
                "category": "status_change",
                "flight_key": flight_key,
                "status": new.as_str(),
            }),
        ),
        StatusChange::Delay { new, .. } => (
            "⏰ Flight Delayed".to_string(),
            format!("{} is delayed by {} minutes", status.flight_number, new),
            Priority::High,
            serde_json::json!({
                "category": "delay",
                "flight_key": flight_key,
                "delay": new,
            }),
        ),
    }
}
