//! Anti-snooze confirmation chain.
//!
//! After a dismissal, a bounded chain of "are you still awake" checks is
//! registered with the platform scheduler. Each fired check opens a short
//! wait window: a confirm tears down the rest of the chain, a timeout
//! consumes the chain and re-enters a fresh ring session flagged as
//! snooze-origin (which never re-chains).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::Difficulty;
use crate::error::SchedulerError;
use crate::events::Event;
use crate::scheduler::{anti_snooze_handle, PlatformScheduler, TriggerKind, TriggerPayload};

/// Default seconds the user has to confirm once a check fires.
pub const DEFAULT_CONFIRM_WINDOW_SECS: i64 = 60;

/// An open confirmation wait window.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfirmationWindow {
    reminder_index: u32,
    opened_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
}

/// A live chain of pending confirmation points for one alarm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntiSnoozeChain {
    pub original_alarm_id: String,
    pub label: String,
    pub difficulty: Difficulty,
    pub total_count: u32,
    pub interval_minutes: u32,
    /// 1-based index of the next confirmation point expected to fire.
    pub next_index: u32,
    pending_handles: Vec<String>,
    window: Option<ConfirmationWindow>,
}

/// A timed-out window, reported so the composition root can start the
/// follow-up ring session.
#[derive(Debug, Clone)]
pub struct ChainTimeout {
    pub alarm_id: String,
    pub label: String,
    pub difficulty: Difficulty,
    pub reminder_index: u32,
}

/// Owns the single active anti-snooze chain.
///
/// One chain per alarm at a time; since at most one ring session exists
/// per device, at most one chain is live overall. Starting a new chain
/// cancels the previous one's pending timers before registering anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntiSnoozeCoordinator {
    chain: Option<AntiSnoozeChain>,
    confirm_window_secs: i64,
}

impl AntiSnoozeCoordinator {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_CONFIRM_WINDOW_SECS)
    }

    pub fn with_window(confirm_window_secs: i64) -> Self {
        Self {
            chain: None,
            confirm_window_secs,
        }
    }

    pub fn active_chain(&self) -> Option<&AntiSnoozeChain> {
        self.chain.as_ref()
    }

    /// Register `count` confirmation points at `now + interval * i`.
    pub fn start_chain(
        &mut self,
        scheduler: &mut dyn PlatformScheduler,
        alarm_id: &str,
        label: &str,
        difficulty: Difficulty,
        interval_minutes: u32,
        count: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>, SchedulerError> {
        let mut events = self.cancel_chain_inner(scheduler, now)?;

        let mut pending = Vec::new();
        for i in 1..=count {
            let handle = anti_snooze_handle(alarm_id, i);
            let at = now + Duration::minutes(i64::from(interval_minutes) * i64::from(i));
            scheduler.schedule(
                &handle,
                at,
                TriggerPayload {
                    alarm_id: alarm_id.to_string(),
                    label: label.to_string(),
                    difficulty,
                    kind: TriggerKind::AntiSnooze {
                        reminder_index: i,
                        total: count,
                    },
                },
            )?;
            pending.push(handle);
        }

        self.chain = Some(AntiSnoozeChain {
            original_alarm_id: alarm_id.to_string(),
            label: label.to_string(),
            difficulty,
            total_count: count,
            interval_minutes,
            next_index: 1,
            pending_handles: pending,
            window: None,
        });
        events.push(Event::AntiSnoozeChainStarted {
            alarm_id: alarm_id.to_string(),
            count,
            interval_minutes,
            at: now,
        });
        Ok(events)
    }

    /// A confirmation point fired: open its wait window.
    ///
    /// Fires for an unknown chain or a stale index are ignored.
    pub fn on_reminder_fired(
        &mut self,
        alarm_id: &str,
        reminder_index: u32,
        now: DateTime<Utc>,
    ) -> Option<Event> {
        let window_secs = self.confirm_window_secs;
        let chain = self.chain.as_mut()?;
        if chain.original_alarm_id != alarm_id || reminder_index < chain.next_index {
            return None;
        }

        // The fired handle stays in the pending list: cancelling an
        // already-fired registration is a no-op, and some platforms keep
        // stale entries around.
        chain.next_index = reminder_index + 1;

        let deadline = now + Duration::seconds(window_secs);
        chain.window = Some(ConfirmationWindow {
            reminder_index,
            opened_at: now,
            deadline,
        });
        Some(Event::ConfirmationOpened {
            alarm_id: alarm_id.to_string(),
            reminder_index,
            total: chain.total_count,
            deadline,
            at: now,
        })
    }

    /// The user confirmed wakefulness: tear down the rest of the chain.
    pub fn confirm(
        &mut self,
        scheduler: &mut dyn PlatformScheduler,
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, SchedulerError> {
        let Some(chain) = self.chain.take() else {
            return Ok(None);
        };
        for handle in &chain.pending_handles {
            scheduler.cancel(handle)?;
        }
        Ok(Some(Event::ChainConfirmed {
            alarm_id: chain.original_alarm_id,
            at: now,
        }))
    }

    /// Expire an overdue window. The first timeout consumes the whole
    /// chain: remaining points are cancelled and the caller starts a
    /// snooze-origin ring session.
    pub fn check_timeout(
        &mut self,
        scheduler: &mut dyn PlatformScheduler,
        now: DateTime<Utc>,
    ) -> Result<Option<(ChainTimeout, Event)>, SchedulerError> {
        let expired = self
            .chain
            .as_ref()
            .and_then(|c| c.window.as_ref())
            .is_some_and(|w| now >= w.deadline);
        if !expired {
            return Ok(None);
        }
        let Some(chain) = self.chain.take() else {
            return Ok(None);
        };
        for handle in &chain.pending_handles {
            scheduler.cancel(handle)?;
        }
        let Some(window) = chain.window else {
            return Ok(None);
        };
        let timeout = ChainTimeout {
            alarm_id: chain.original_alarm_id.clone(),
            label: chain.label,
            difficulty: chain.difficulty,
            reminder_index: window.reminder_index,
        };
        let event = Event::ConfirmationTimedOut {
            alarm_id: chain.original_alarm_id,
            reminder_index: window.reminder_index,
            at: now,
        };
        Ok(Some((timeout, event)))
    }

    /// Cancel the chain for `alarm_id` without confirmation (the alarm
    /// was deleted or disabled).
    pub fn cancel_chain(
        &mut self,
        scheduler: &mut dyn PlatformScheduler,
        alarm_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Event>, SchedulerError> {
        if self
            .chain
            .as_ref()
            .is_some_and(|c| c.original_alarm_id == alarm_id)
        {
            let events = self.cancel_chain_inner(scheduler, now)?;
            return Ok(events.into_iter().next());
        }
        Ok(None)
    }

    fn cancel_chain_inner(
        &mut self,
        scheduler: &mut dyn PlatformScheduler,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>, SchedulerError> {
        let Some(chain) = self.chain.take() else {
            return Ok(Vec::new());
        };
        for handle in &chain.pending_handles {
            scheduler.cancel(handle)?;
        }
        Ok(vec![Event::AntiSnoozeChainCancelled {
            alarm_id: chain.original_alarm_id,
            at: now,
        }])
    }
}

impl Default for AntiSnoozeCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::RecordingScheduler;

    fn start(
        coord: &mut AntiSnoozeCoordinator,
        sched: &mut RecordingScheduler,
        alarm_id: &str,
        count: u32,
        now: DateTime<Utc>,
    ) {
        coord
            .start_chain(sched, alarm_id, "work", Difficulty::Medium, 5, count, now)
            .unwrap();
    }

    #[test]
    fn chain_schedules_points_at_interval_multiples() {
        let mut coord = AntiSnoozeCoordinator::new();
        let mut sched = RecordingScheduler::new();
        let now = Utc::now();

        start(&mut coord, &mut sched, "a1", 2, now);

        assert_eq!(sched.scheduled.len(), 2);
        assert_eq!(sched.scheduled[0].0, "a1:anti:1");
        assert_eq!(sched.scheduled[0].1, now + Duration::minutes(5));
        assert_eq!(sched.scheduled[1].0, "a1:anti:2");
        assert_eq!(sched.scheduled[1].1, now + Duration::minutes(10));
    }

    #[test]
    fn confirm_before_first_window_cancels_everything() {
        let mut coord = AntiSnoozeCoordinator::new();
        let mut sched = RecordingScheduler::new();
        let now = Utc::now();

        start(&mut coord, &mut sched, "a1", 2, now);
        let fired = now + Duration::minutes(5);
        coord.on_reminder_fired("a1", 1, fired).unwrap();

        let event = coord
            .confirm(&mut sched, fired + Duration::seconds(10))
            .unwrap();
        assert!(matches!(event, Some(Event::ChainConfirmed { .. })));
        assert!(coord.active_chain().is_none());
        // The not-yet-fired second point was cancelled; nothing pending.
        assert!(sched.pending().is_empty());

        // No timeout can occur afterwards.
        let timeout = coord
            .check_timeout(&mut sched, fired + Duration::minutes(30))
            .unwrap();
        assert!(timeout.is_none());
    }

    #[test]
    fn timeout_consumes_chain_and_reports_once() {
        let mut coord = AntiSnoozeCoordinator::new();
        let mut sched = RecordingScheduler::new();
        let now = Utc::now();

        start(&mut coord, &mut sched, "a1", 1, now);
        let fired = now + Duration::minutes(5);
        coord.on_reminder_fired("a1", 1, fired).unwrap();

        // Within the window: nothing yet.
        assert!(coord
            .check_timeout(&mut sched, fired + Duration::seconds(59))
            .unwrap()
            .is_none());

        let (timeout, event) = coord
            .check_timeout(&mut sched, fired + Duration::seconds(60))
            .unwrap()
            .unwrap();
        assert_eq!(timeout.alarm_id, "a1");
        assert_eq!(timeout.reminder_index, 1);
        assert!(matches!(event, Event::ConfirmationTimedOut { .. }));

        // The chain is consumed; a later check reports nothing.
        assert!(coord
            .check_timeout(&mut sched, fired + Duration::minutes(10))
            .unwrap()
            .is_none());
    }

    #[test]
    fn timeout_cancels_remaining_points() {
        let mut coord = AntiSnoozeCoordinator::new();
        let mut sched = RecordingScheduler::new();
        let now = Utc::now();

        start(&mut coord, &mut sched, "a1", 3, now);
        let fired = now + Duration::minutes(5);
        coord.on_reminder_fired("a1", 1, fired).unwrap();
        coord
            .check_timeout(&mut sched, fired + Duration::seconds(61))
            .unwrap()
            .unwrap();

        // Points 2 and 3 never fire.
        assert!(sched.pending().is_empty());
        assert!(sched.cancelled.contains(&"a1:anti:2".to_string()));
        assert!(sched.cancelled.contains(&"a1:anti:3".to_string()));
    }

    #[test]
    fn new_chain_replaces_previous_one() {
        let mut coord = AntiSnoozeCoordinator::new();
        let mut sched = RecordingScheduler::new();
        let now = Utc::now();

        start(&mut coord, &mut sched, "a1", 2, now);
        start(&mut coord, &mut sched, "a1", 2, now + Duration::hours(1));

        // Only the second chain's registrations remain pending.
        let pending = sched.pending();
        assert_eq!(pending.len(), 2);
        assert_eq!(sched.scheduled[0].1, now + Duration::hours(1) + Duration::minutes(5));
    }

    #[test]
    fn stale_or_foreign_fires_are_ignored() {
        let mut coord = AntiSnoozeCoordinator::new();
        let mut sched = RecordingScheduler::new();
        let now = Utc::now();

        start(&mut coord, &mut sched, "a1", 2, now);
        assert!(coord.on_reminder_fired("other", 1, now).is_none());

        let fired = now + Duration::minutes(5);
        coord.on_reminder_fired("a1", 1, fired).unwrap();
        // A duplicate fire of the same index is stale.
        assert!(coord.on_reminder_fired("a1", 1, fired).is_none());
    }

    #[test]
    fn cancel_chain_matches_alarm_id() {
        let mut coord = AntiSnoozeCoordinator::new();
        let mut sched = RecordingScheduler::new();
        let now = Utc::now();

        start(&mut coord, &mut sched, "a1", 2, now);
        assert!(coord.cancel_chain(&mut sched, "other", now).unwrap().is_none());
        assert!(coord.active_chain().is_some());

        let event = coord.cancel_chain(&mut sched, "a1", now).unwrap();
        assert!(matches!(event, Some(Event::AntiSnoozeChainCancelled { .. })));
        assert!(coord.active_chain().is_none());
        assert!(sched.pending().is_empty());
    }
}
