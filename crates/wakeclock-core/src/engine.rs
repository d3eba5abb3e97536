//! Composition root wiring storage, recurrence, the ring state machine
//! and the anti-snooze chain behind one API.
//!
//! The engine is tick-driven like the rest of the core: the host calls
//! [`WakeEngine::tick`] periodically and forwards platform callbacks to
//! [`WakeEngine::handle_trigger`]. All wall-clock input arrives as
//! `DateTime<Local>` because alarm times and wake records are local-day
//! concepts; platform registrations go out in UTC.

use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::alarm::{AlarmSpec, RecurrenceResolver};
use crate::error::Result;
use crate::events::Event;
use crate::holiday::{HolidayApi, HolidayOracle};
use crate::ring::{AntiSnoozeCoordinator, Presenter, RingController, RingRequest};
use crate::scheduler::{primary_handle, PlatformScheduler, TriggerKind, TriggerPayload};
use crate::storage::{Config, Database};
use crate::streak::{wake_recorded_event, RecordOutcome, StreakTracker, WakeRecord};

/// The application core. One instance per process.
pub struct WakeEngine<S: PlatformScheduler, P: Presenter> {
    scheduler: S,
    presenter: P,
    db: Database,
    config: Config,
    oracle: Arc<HolidayOracle>,
    resolver: RecurrenceResolver,
    ring: RingController,
    anti_snooze: AntiSnoozeCoordinator,
    tracker: StreakTracker,
}

impl<S: PlatformScheduler, P: Presenter> WakeEngine<S, P> {
    /// Wire up the engine from its parts, hydrating the holiday cache and
    /// wake history from storage.
    pub fn new(db: Database, config: Config, scheduler: S, presenter: P) -> Result<Self> {
        let oracle = Arc::new(HolidayOracle::new(
            HolidayApi::new(&config.holiday.api_base),
            i64::from(config.holiday.cache_ttl_days),
        ));
        oracle.import_rows(db.load_holiday_rows()?);

        let resolver =
            RecurrenceResolver::with_lookahead(Arc::clone(&oracle), config.ring.lookahead_days);
        let ring = RingController::with_interval(i64::from(config.ring.escalation_interval_secs));
        let anti_snooze =
            AntiSnoozeCoordinator::with_window(i64::from(config.ring.confirm_window_secs));
        let tracker = StreakTracker::from_records(db.list_wake_records()?);

        Ok(Self {
            scheduler,
            presenter,
            db,
            config,
            oracle,
            resolver,
            ring,
            anti_snooze,
            tracker,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn oracle(&self) -> &HolidayOracle {
        &self.oracle
    }

    pub fn ring(&self) -> &RingController {
        &self.ring
    }

    /// Persist `spec` and bring its platform registration in line with its
    /// next trigger. A spec that resolves to no trigger ends up with no
    /// registration.
    pub fn sync_alarm(&mut self, spec: &AlarmSpec, now: DateTime<Local>) -> Result<Vec<Event>> {
        spec.validate_custom_days()?;
        self.db.upsert_alarm(spec)?;

        let at = now.with_timezone(&Utc);
        let handle = primary_handle(&spec.id);
        match self.resolver.next_trigger(spec, now) {
            Some(trigger) => {
                let trigger_at = trigger.with_timezone(&Utc);
                self.scheduler.schedule(
                    &handle,
                    trigger_at,
                    TriggerPayload {
                        alarm_id: spec.id.clone(),
                        label: spec.label.clone(),
                        difficulty: spec.difficulty,
                        kind: TriggerKind::Primary,
                    },
                )?;
                Ok(vec![Event::AlarmScheduled {
                    alarm_id: spec.id.clone(),
                    trigger_at,
                    at,
                }])
            }
            None => {
                self.scheduler.cancel(&handle)?;
                Ok(vec![Event::AlarmCancelled {
                    alarm_id: spec.id.clone(),
                    at,
                }])
            }
        }
    }

    /// Delete an alarm and everything attached to it: registration, live
    /// ring session, pending anti-snooze chain.
    pub fn remove_alarm(&mut self, alarm_id: &str, now: DateTime<Local>) -> Result<Vec<Event>> {
        let at = now.with_timezone(&Utc);
        self.db.delete_alarm(alarm_id)?;
        self.scheduler.cancel(&primary_handle(alarm_id))?;
        self.ring.cancel_for(alarm_id);

        let mut events = vec![Event::AlarmCancelled {
            alarm_id: alarm_id.to_string(),
            at,
        }];
        if let Some(event) = self.anti_snooze.cancel_chain(&mut self.scheduler, alarm_id, at)? {
            events.push(event);
        }
        Ok(events)
    }

    /// A platform registration fired.
    ///
    /// Triggers for alarms that were deleted or disabled since
    /// registration are dropped silently.
    pub fn handle_trigger(
        &mut self,
        payload: &TriggerPayload,
        now: DateTime<Local>,
    ) -> Result<Vec<Event>> {
        let at = now.with_timezone(&Utc);
        match payload.kind {
            TriggerKind::Primary => {
                let Some(spec) = self.db.get_alarm(&payload.alarm_id)? else {
                    return Ok(Vec::new());
                };
                if !spec.enabled {
                    return Ok(Vec::new());
                }
                let events = self.ring.start(
                    RingRequest {
                        alarm_id: spec.id,
                        label: spec.label,
                        difficulty: spec.difficulty,
                        is_snooze_origin: false,
                    },
                    at,
                    &mut self.presenter,
                );
                Ok(events.unwrap_or_default())
            }
            TriggerKind::AntiSnooze { reminder_index, .. } => {
                let alive = self
                    .db
                    .get_alarm(&payload.alarm_id)?
                    .is_some_and(|spec| spec.enabled);
                if !alive {
                    let event =
                        self.anti_snooze
                            .cancel_chain(&mut self.scheduler, &payload.alarm_id, at)?;
                    return Ok(event.into_iter().collect());
                }
                Ok(self
                    .anti_snooze
                    .on_reminder_fired(&payload.alarm_id, reminder_index, at)
                    .into_iter()
                    .collect())
            }
        }
    }

    /// The user opened the gating mission for the live session.
    pub fn begin_mission(&mut self, now: DateTime<Local>) -> Option<Event> {
        self.ring.begin_mission(now.with_timezone(&Utc))
    }

    /// The gating mission was completed: dismiss the session, record the
    /// wake-up, reschedule or disable the alarm, and start the anti-snooze
    /// chain where configured.
    ///
    /// Snooze-origin sessions only dismiss: no wake record, no reschedule,
    /// no new chain.
    pub fn complete_mission(&mut self, now: DateTime<Local>) -> Result<Vec<Event>> {
        let at = now.with_timezone(&Utc);
        let Some((outcome, dismissed)) = self.ring.complete_mission(at) else {
            return Ok(Vec::new());
        };
        let mut events = vec![dismissed];
        if outcome.is_snooze_origin {
            return Ok(events);
        }

        // First dismissal of the day becomes the wake record.
        let date = now.date_naive();
        let time = now.format("%H:%M").to_string();
        let label = (outcome.label != "other").then_some(outcome.label.as_str());
        match self.tracker.record_wake_up(date, &time, label) {
            RecordOutcome::Created | RecordOutcome::LabelFilled => {
                if let Some(record) = self
                    .tracker
                    .records()
                    .iter()
                    .find(|r| r.date == date)
                    .cloned()
                {
                    self.db.upsert_wake_record(&record)?;
                    events.push(wake_recorded_event(&record, at));
                }
            }
            RecordOutcome::AlreadyRecorded => {}
        }

        if let Some(mut spec) = self.db.get_alarm(&outcome.alarm_id)? {
            if spec.repeat_mode == crate::alarm::RepeatMode::Once {
                spec.enabled = false;
                self.db.upsert_alarm(&spec)?;
                self.scheduler.cancel(&primary_handle(&spec.id))?;
                events.push(Event::AlarmDisabled {
                    alarm_id: spec.id.clone(),
                    at,
                });
            } else {
                events.extend(self.sync_alarm(&spec, now)?);
            }

            if self.config.anti_snooze.enabled {
                events.extend(self.anti_snooze.start_chain(
                    &mut self.scheduler,
                    &spec.id,
                    &spec.label,
                    spec.difficulty,
                    self.config.anti_snooze.interval_minutes,
                    self.config.anti_snooze.count,
                    at,
                )?);
            }
        }
        Ok(events)
    }

    /// The user confirmed wakefulness inside an open confirmation window.
    pub fn confirm_awake(&mut self, now: DateTime<Local>) -> Result<Vec<Event>> {
        let event = self
            .anti_snooze
            .confirm(&mut self.scheduler, now.with_timezone(&Utc))?;
        Ok(event.into_iter().collect())
    }

    /// Periodic heartbeat: advances ring escalation and expires overdue
    /// confirmation windows. A timed-out window starts a fresh
    /// snooze-origin ring session.
    pub fn tick(&mut self, now: DateTime<Local>) -> Result<Vec<Event>> {
        let at = now.with_timezone(&Utc);
        let mut events = self.ring.tick(at, &mut self.presenter);

        if let Some((timeout, event)) = self.anti_snooze.check_timeout(&mut self.scheduler, at)? {
            events.push(event);
            let alive = self
                .db
                .get_alarm(&timeout.alarm_id)?
                .is_some_and(|spec| spec.enabled);
            if alive {
                let started = self.ring.start(
                    RingRequest {
                        alarm_id: timeout.alarm_id,
                        label: timeout.label,
                        difficulty: timeout.difficulty,
                        is_snooze_origin: true,
                    },
                    at,
                    &mut self.presenter,
                );
                events.extend(started.unwrap_or_default());
            }
        }
        Ok(events)
    }

    /// Refresh the holiday cache for the current and next year, persisting
    /// whatever was updated.
    pub async fn refresh_holidays(&mut self, today: NaiveDate, force: bool) -> Result<Vec<i32>> {
        let updated = self.oracle.preload(today, force).await;
        if !updated.is_empty() {
            let rows = self.oracle.export_rows();
            for &year in &updated {
                let year_rows: Vec<_> =
                    rows.iter().filter(|r| r.year == year).cloned().collect();
                self.db.replace_holiday_year(year, &year_rows)?;
            }
        }
        Ok(updated)
    }

    pub fn current_streak(&self, today: NaiveDate) -> u32 {
        self.tracker.current_streak(today)
    }

    pub fn best_streak(&self) -> u32 {
        self.tracker.best_streak()
    }

    pub fn wake_records(&self) -> &[WakeRecord] {
        self.tracker.records()
    }

    /// Coarse countdown until `spec` next rings, for list displays.
    pub fn countdown_text(&self, spec: &AlarmSpec, now: DateTime<Local>) -> Option<String> {
        self.resolver.countdown_text(spec, now)
    }
}
