//! Scheduled task types

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use vigil_util::{OperatorId, TaskId, TimeOfDay};

/// Recurrence of a scheduled task. Only daily recurrence is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(Self::Daily),
            _ => None,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recurring command request.
///
/// Cancellation flips `active` to false; rows are never deleted so that
/// historical listing stays intact. The command text is free-form here —
/// the whitelist is enforced when the scheduler fires it, not when it is
/// stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub owner: OperatorId,
    pub command: String,
    pub time_of_day: TimeOfDay,
    pub frequency: Frequency,
    pub active: bool,
    pub created_at: DateTime<Local>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_round_trip() {
        assert_eq!(Frequency::parse("daily"), Some(Frequency::Daily));
        assert_eq!(Frequency::parse("weekly"), None);
        assert_eq!(Frequency::Daily.as_str(), "daily");
    }
}
