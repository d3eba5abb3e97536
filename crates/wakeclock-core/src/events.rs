use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::MissionType;
use crate::ring::VolumeStage;

/// Every observable transition in the core produces an Event.
/// The host shell polls or subscribes; the CLI prints them as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A platform registration was created for the alarm's next trigger.
    AlarmScheduled {
        alarm_id: String,
        trigger_at: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// The platform registration for an alarm was cancelled.
    AlarmCancelled {
        alarm_id: String,
        at: DateTime<Utc>,
    },
    /// A once-mode alarm was disabled after its dismissal.
    AlarmDisabled {
        alarm_id: String,
        at: DateTime<Utc>,
    },
    /// A ring session began.
    RingStarted {
        alarm_id: String,
        label: String,
        is_snooze_origin: bool,
        at: DateTime<Utc>,
    },
    /// The session's gating mission was selected.
    MissionSelected {
        mission: MissionType,
        at: DateTime<Utc>,
    },
    /// Ring volume escalated one stage.
    VolumeEscalated {
        stage: VolumeStage,
        at: DateTime<Utc>,
    },
    /// The user opened the mission (session stays ringing underneath).
    MissionStarted {
        mission: MissionType,
        at: DateTime<Utc>,
    },
    /// The mission was completed and the session dismissed.
    RingDismissed {
        alarm_id: String,
        is_snooze_origin: bool,
        at: DateTime<Utc>,
    },
    /// A wake-up was recorded for the day.
    WakeRecorded {
        date: NaiveDate,
        time: String,
        label: Option<String>,
        at: DateTime<Utc>,
    },
    /// An anti-snooze confirmation chain was scheduled.
    AntiSnoozeChainStarted {
        alarm_id: String,
        count: u32,
        interval_minutes: u32,
        at: DateTime<Utc>,
    },
    /// A confirmation point fired and its wait window opened.
    ConfirmationOpened {
        alarm_id: String,
        reminder_index: u32,
        total: u32,
        deadline: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// The user confirmed wakefulness; remaining points were cancelled.
    ChainConfirmed {
        alarm_id: String,
        at: DateTime<Utc>,
    },
    /// A confirmation window expired unconfirmed; the chain is consumed.
    ConfirmationTimedOut {
        alarm_id: String,
        reminder_index: u32,
        at: DateTime<Utc>,
    },
    /// The chain was cancelled without user confirmation (alarm deleted or
    /// disabled).
    AntiSnoozeChainCancelled {
        alarm_id: String,
        at: DateTime<Utc>,
    },
}
