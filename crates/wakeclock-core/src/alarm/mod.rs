//! Alarm domain model.
//!
//! An [`AlarmSpec`] is the user-configured rule describing when and how an
//! alarm rings: time of day, repeat policy, the gating mission and its
//! difficulty. Specs are owned by the storage layer; the core only reads
//! snapshots of them.

mod recurrence;

pub use recurrence::RecurrenceResolver;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Gating task the user must complete to dismiss a ring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionType {
    Math,
    Memory,
    Order,
    Shake,
    Typing,
}

impl MissionType {
    pub const ALL: [MissionType; 5] = [
        MissionType::Math,
        MissionType::Memory,
        MissionType::Order,
        MissionType::Shake,
        MissionType::Typing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MissionType::Math => "math",
            MissionType::Memory => "memory",
            MissionType::Order => "order",
            MissionType::Shake => "shake",
            MissionType::Typing => "typing",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "math" => Ok(MissionType::Math),
            "memory" => Ok(MissionType::Memory),
            "order" => Ok(MissionType::Order),
            "shake" => Ok(MissionType::Shake),
            "typing" => Ok(MissionType::Typing),
            other => Err(ValidationError::UnknownTag {
                kind: "mission type",
                value: other.to_string(),
            }),
        }
    }
}

/// Mission difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(ValidationError::UnknownTag {
                kind: "difficulty",
                value: other.to_string(),
            }),
        }
    }
}

/// Repeat policy for an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Fires on the next occurrence of its time, then is disabled.
    Once,
    /// Monday through Friday.
    Workdays,
    /// Explicit weekday set; optionally skips public holidays.
    Custom,
}

impl RepeatMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RepeatMode::Once => "once",
            RepeatMode::Workdays => "workdays",
            RepeatMode::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value {
            "once" => Ok(RepeatMode::Once),
            "workdays" => Ok(RepeatMode::Workdays),
            "custom" => Ok(RepeatMode::Custom),
            other => Err(ValidationError::UnknownTag {
                kind: "repeat mode",
                value: other.to_string(),
            }),
        }
    }
}

/// A user-configured alarm rule.
///
/// `custom_days` uses weekday indices 0=Sunday .. 6=Saturday and is only
/// meaningful in `Custom` mode; an empty set means the alarm never fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmSpec {
    pub id: String,
    /// Time of day in "HH:mm" format.
    pub time: String,
    pub enabled: bool,
    /// Category tag (work, date, flight, train, meeting, doctor,
    /// interview, exam, other). Open set; unknown labels are kept as-is.
    pub label: String,
    pub mission_type: MissionType,
    pub difficulty: Difficulty,
    pub repeat_mode: RepeatMode,
    #[serde(default)]
    pub custom_days: Vec<u8>,
    #[serde(default)]
    pub skip_holidays: bool,
    pub created_at: DateTime<Utc>,
}

impl AlarmSpec {
    /// New alarm with a fresh id and the original app's defaults.
    pub fn new(time: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            time: time.into(),
            enabled: true,
            label: "other".to_string(),
            mission_type: MissionType::Math,
            difficulty: Difficulty::Medium,
            repeat_mode: RepeatMode::Workdays,
            custom_days: Vec::new(),
            skip_holidays: false,
            created_at: Utc::now(),
        }
    }

    /// Parse `time` into (hour, minute). Returns None for anything that is
    /// not a valid "HH:mm" within 0-23/0-59.
    pub fn time_components(&self) -> Option<(u32, u32)> {
        let (h, m) = self.time.split_once(':')?;
        let hour: u32 = h.parse().ok()?;
        let minute: u32 = m.parse().ok()?;
        if hour > 23 || minute > 59 {
            return None;
        }
        Some((hour, minute))
    }

    /// Icon name for the label category, for presentation layers.
    pub fn icon_name(&self) -> &'static str {
        match self.label.as_str() {
            "work" => "briefcase",
            "date" => "favorite",
            "flight" => "flight",
            "train" => "train",
            "meeting" => "groups",
            "doctor" => "medical_services",
            "interview" => "person_add",
            "exam" => "school",
            _ => "alarm",
        }
    }

    /// Validate the weekday indices in `custom_days`.
    pub fn validate_custom_days(&self) -> Result<(), ValidationError> {
        match self.custom_days.iter().find(|&&d| d > 6) {
            Some(&bad) => Err(ValidationError::InvalidWeekday(bad)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_components_parses_valid_times() {
        let mut alarm = AlarmSpec::new("07:30");
        assert_eq!(alarm.time_components(), Some((7, 30)));
        alarm.time = "00:00".into();
        assert_eq!(alarm.time_components(), Some((0, 0)));
        alarm.time = "23:59".into();
        assert_eq!(alarm.time_components(), Some((23, 59)));
    }

    #[test]
    fn time_components_rejects_garbage() {
        let mut alarm = AlarmSpec::new("24:00");
        assert_eq!(alarm.time_components(), None);
        alarm.time = "07:60".into();
        assert_eq!(alarm.time_components(), None);
        alarm.time = "0730".into();
        assert_eq!(alarm.time_components(), None);
        alarm.time = "ab:cd".into();
        assert_eq!(alarm.time_components(), None);
    }

    #[test]
    fn enum_tags_round_trip() {
        for mission in MissionType::ALL {
            assert_eq!(MissionType::parse(mission.as_str()).unwrap(), mission);
        }
        for mode in [RepeatMode::Once, RepeatMode::Workdays, RepeatMode::Custom] {
            assert_eq!(RepeatMode::parse(mode.as_str()).unwrap(), mode);
        }
        for diff in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            assert_eq!(Difficulty::parse(diff.as_str()).unwrap(), diff);
        }
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert!(MissionType::parse("MATH").is_err());
        assert!(RepeatMode::parse("daily").is_err());
        assert!(Difficulty::parse("extreme").is_err());
    }

    #[test]
    fn custom_days_validation() {
        let mut alarm = AlarmSpec::new("07:00");
        alarm.custom_days = vec![0, 3, 6];
        assert!(alarm.validate_custom_days().is_ok());
        alarm.custom_days = vec![1, 7];
        assert!(alarm.validate_custom_days().is_err());
    }
}
