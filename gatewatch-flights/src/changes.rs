use gatewatch_core::types::{FlightStatus, LifecycleStatus, NotificationCategory};

/// One operationally relevant difference between two status snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange {
    Gate {
        old: String,
        new: String,
    },
    Lifecycle {
        old: LifecycleStatus,
        new: LifecycleStatus,
    },
    Delay {
        old: i32,
        new: i32,
    },
}

impl StatusChange {
    pub fn category(&self) -> NotificationCategory {
        match self {
            StatusChange::Gate { .. } => NotificationCategory::GateChange,
            StatusChange::Lifecycle { .. } => NotificationCategory::StatusChange,
            StatusChange::Delay { .. } => NotificationCategory::Delay,
        }
    }
}

/// Compare two snapshots of the same flight key. Only gate, lifecycle status
/// and cumulative delay participate; an empty result means no operationally
/// relevant change even if the raw payloads differ.
///
/// A gate change is only reported when the old snapshot actually had a gate:
/// going from "no gate assigned yet" to a first assignment is not a change.
pub fn detect_changes(old: &FlightStatus, new: &FlightStatus) -> Vec<StatusChange> {
    let mut changes = Vec::new();

    if !old.gate.is_empty() && old.gate != new.gate {
        changes.push(StatusChange::Gate {
            old: old.gate.clone(),
            new: new.gate.clone(),
        });
    }

    if old.status != new.status {
        changes.push(StatusChange::Lifecycle {
            old: old.status,
            new: new.status,
        });
    }

    if old.delay_minutes != new.delay_minutes {
        changes.push(StatusChange::Delay {
            old: old.delay_minutes,
            new: new.delay_minutes,
        });
    }

    changes
}
