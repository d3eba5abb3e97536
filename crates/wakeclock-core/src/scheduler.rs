//! Platform scheduler seam.
//!
//! The core never owns a timer thread for future triggers: it asks the
//! host platform to invoke it back at an absolute instant, and cancels
//! registrations it no longer wants. Hosts implement [`PlatformScheduler`];
//! tests use [`RecordingScheduler`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::Difficulty;
use crate::error::SchedulerError;

/// What a fired registration means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TriggerKind {
    /// The alarm's own trigger instant.
    Primary,
    /// One point of an anti-snooze confirmation chain.
    AntiSnooze { reminder_index: u32, total: u32 },
}

/// Payload carried through the platform and handed back on fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerPayload {
    pub alarm_id: String,
    pub label: String,
    pub difficulty: Difficulty,
    #[serde(flatten)]
    pub kind: TriggerKind,
}

/// Registration handle for the alarm's primary trigger.
pub fn primary_handle(alarm_id: &str) -> String {
    format!("alarm:{alarm_id}")
}

/// Registration handle for anti-snooze confirmation point `index`.
pub fn anti_snooze_handle(alarm_id: &str, index: u32) -> String {
    format!("{alarm_id}:anti:{index}")
}

/// Host capability: invoke the core back at an absolute instant.
pub trait PlatformScheduler {
    /// Register a callback at `at` carrying `payload`. Re-registering an
    /// existing handle replaces it.
    fn schedule(
        &mut self,
        handle: &str,
        at: DateTime<Utc>,
        payload: TriggerPayload,
    ) -> Result<(), SchedulerError>;

    /// Cancel a registration. Cancelling an unknown handle is a no-op.
    fn cancel(&mut self, handle: &str) -> Result<(), SchedulerError>;
}

/// Scheduler that drops all registrations. For hosts that drive the
/// engine without a platform alarm facility, such as one-shot CLI runs.
#[derive(Debug, Default)]
pub struct NullScheduler;

impl PlatformScheduler for NullScheduler {
    fn schedule(
        &mut self,
        _handle: &str,
        _at: DateTime<Utc>,
        _payload: TriggerPayload,
    ) -> Result<(), SchedulerError> {
        Ok(())
    }

    fn cancel(&mut self, _handle: &str) -> Result<(), SchedulerError> {
        Ok(())
    }
}

/// In-memory scheduler double that records registrations.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    pub scheduled: Vec<(String, DateTime<Utc>, TriggerPayload)>,
    pub cancelled: Vec<String>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently pending handles (scheduled and not since cancelled or
    /// replaced).
    pub fn pending(&self) -> Vec<&str> {
        self.scheduled
            .iter()
            .filter(|(h, _, _)| !self.cancelled.contains(h))
            .map(|(h, _, _)| h.as_str())
            .collect()
    }
}

impl PlatformScheduler for RecordingScheduler {
    fn schedule(
        &mut self,
        handle: &str,
        at: DateTime<Utc>,
        payload: TriggerPayload,
    ) -> Result<(), SchedulerError> {
        self.scheduled.retain(|(h, _, _)| h != handle);
        self.cancelled.retain(|h| h != handle);
        self.scheduled.push((handle.to_string(), at, payload));
        Ok(())
    }

    fn cancel(&mut self, handle: &str) -> Result<(), SchedulerError> {
        if self.scheduled.iter().any(|(h, _, _)| h == handle) {
            self.scheduled.retain(|(h, _, _)| h != handle);
            self.cancelled.push(handle.to_string());
        }
        Ok(())
    }
}
