use serde::{Deserialize, Serialize};
use std::fmt;

/// Four ordinal urgency tiers. The wire strings `calm|moderate|urgent|critical`
/// are an external contract shared by flight-boarding urgency and gate-walk
/// urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyTier {
    Calm,
    Moderate,
    Urgent,
    Critical,
}

impl UrgencyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyTier::Calm => "calm",
            UrgencyTier::Moderate => "moderate",
            UrgencyTier::Urgent => "urgent",
            UrgencyTier::Critical => "critical",
        }
    }
}

impl fmt::Display for UrgencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an absolute minutes-remaining value. Boundaries are inclusive at
/// the lower tier: exactly 10 is critical, exactly 40 is moderate. Negative
/// values mean the threshold already passed and are critical.
pub fn classify(minutes_remaining: i64) -> UrgencyTier {
    if minutes_remaining <= 10 {
        UrgencyTier::Critical
    } else if minutes_remaining <= 20 {
        UrgencyTier::Urgent
    } else if minutes_remaining <= 40 {
        UrgencyTier::Moderate
    } else {
        UrgencyTier::Calm
    }
}

/// Classify a walk time against the minutes left until boarding. Unlike
/// [`classify`] this is relative: critical once the walk no longer fits in
/// the remaining time, with 10 and 20 minute slack bands below that.
pub fn classify_walk(walk_minutes: i64, minutes_until_boarding: i64) -> UrgencyTier {
    if walk_minutes > minutes_until_boarding {
        UrgencyTier::Critical
    } else if walk_minutes + 10 > minutes_until_boarding {
        UrgencyTier::Urgent
    } else if walk_minutes + 20 > minutes_until_boarding {
        UrgencyTier::Moderate
    } else {
        UrgencyTier::Calm
    }
}
