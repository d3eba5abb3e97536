//! Ring session state machine.
//!
//! One live alarm-firing episode, from first sound to dismissal. The
//! controller is wall-clock-based in the same way the timer engines here
//! are: it has no internal thread, the caller invokes `tick()` and the
//! controller derives escalation from elapsed time.
//!
//! ## State transitions
//!
//! ```text
//! Idle -> Ringing(Normal) -> Ringing(Loud) -> Ringing(SuperLoud)
//!                 \________________|________________/
//!                                  v
//!                            MissionActive -> Dismissed
//! ```
//!
//! Escalation keeps running underneath `MissionActive`; `SuperLoud` is
//! terminal and never auto-dismisses. The only way out is the external
//! mission-completed signal -- an alarm must not silence itself.

mod anti_snooze;

pub use anti_snooze::{AntiSnoozeChain, AntiSnoozeCoordinator, ChainTimeout};

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::alarm::{Difficulty, MissionType};
use crate::events::Event;

/// Default seconds between volume escalations.
pub const DEFAULT_ESCALATION_INTERVAL_SECS: i64 = 15;

/// Ring volume stage. Escalates `Normal -> Loud -> SuperLoud` and stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeStage {
    Normal,
    Loud,
    SuperLoud,
}

impl VolumeStage {
    fn next(self) -> Option<VolumeStage> {
        match self {
            VolumeStage::Normal => Some(VolumeStage::Loud),
            VolumeStage::Loud => Some(VolumeStage::SuperLoud),
            VolumeStage::SuperLoud => None,
        }
    }
}

/// Platform side effects of a ring session (sound, vibration, full-screen
/// surfaces). The state machine drives this interface; hosts implement it.
pub trait Presenter {
    fn on_stage_changed(&mut self, stage: VolumeStage);
    fn on_mission_selected(&mut self, mission: MissionType);
}

/// Presenter that does nothing (headless hosts).
#[derive(Debug, Default)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn on_stage_changed(&mut self, _stage: VolumeStage) {}
    fn on_mission_selected(&mut self, _mission: MissionType) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SessionPhase {
    Ringing,
    MissionActive,
}

/// A live ring session. At most one exists per device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingSession {
    pub alarm_id: String,
    pub label: String,
    pub difficulty: Difficulty,
    pub stage: VolumeStage,
    pub is_snooze_origin: bool,
    pub mission: MissionType,
    pub started_at: DateTime<Utc>,
    phase: SessionPhase,
    escalations: u8,
}

impl RingSession {
    pub fn mission_active(&self) -> bool {
        self.phase == SessionPhase::MissionActive
    }
}

/// Parameters for starting a session.
#[derive(Debug, Clone)]
pub struct RingRequest {
    pub alarm_id: String,
    pub label: String,
    pub difficulty: Difficulty,
    pub is_snooze_origin: bool,
}

/// What the composition root needs to act on a dismissal.
#[derive(Debug, Clone)]
pub struct DismissOutcome {
    pub alarm_id: String,
    pub label: String,
    pub is_snooze_origin: bool,
}

/// Pick the next mission, excluding the immediately previous selection so
/// the user never gets the same minigame twice in a row.
pub fn select_mission(previous: Option<MissionType>, rng: &mut impl Rng) -> MissionType {
    let pool: Vec<MissionType> = MissionType::ALL
        .into_iter()
        .filter(|m| Some(*m) != previous)
        .collect();
    pool.choose(rng).copied().unwrap_or(MissionType::Math)
}

/// Owns the single live ring session and its escalation bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingController {
    session: Option<RingSession>,
    escalation_interval_secs: i64,
    last_mission: Option<MissionType>,
}

impl RingController {
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_ESCALATION_INTERVAL_SECS)
    }

    pub fn with_interval(escalation_interval_secs: i64) -> Self {
        Self {
            session: None,
            escalation_interval_secs,
            last_mission: None,
        }
    }

    pub fn active(&self) -> Option<&RingSession> {
        self.session.as_ref()
    }

    /// Start a session for a fired trigger.
    ///
    /// Returns `None` when a session is already active for any alarm --
    /// duplicate platform fires are ignored, at most one session exists
    /// system-wide.
    pub fn start(
        &mut self,
        req: RingRequest,
        now: DateTime<Utc>,
        presenter: &mut dyn Presenter,
    ) -> Option<Vec<Event>> {
        if self.session.is_some() {
            return None;
        }

        let mission = select_mission(self.last_mission, &mut rand::thread_rng());
        self.last_mission = Some(mission);

        self.session = Some(RingSession {
            alarm_id: req.alarm_id.clone(),
            label: req.label.clone(),
            difficulty: req.difficulty,
            stage: VolumeStage::Normal,
            is_snooze_origin: req.is_snooze_origin,
            mission,
            started_at: now,
            phase: SessionPhase::Ringing,
            escalations: 0,
        });

        presenter.on_stage_changed(VolumeStage::Normal);
        presenter.on_mission_selected(mission);

        Some(vec![
            Event::RingStarted {
                alarm_id: req.alarm_id,
                label: req.label,
                is_snooze_origin: req.is_snooze_origin,
                at: now,
            },
            Event::MissionSelected { mission, at: now },
        ])
    }

    /// Advance escalation by wall clock. Call periodically.
    ///
    /// `Normal -> Loud` after one interval, `Loud -> SuperLoud` after two;
    /// further ticks are inert. Escalation continues while the mission is
    /// on screen.
    pub fn tick(&mut self, now: DateTime<Utc>, presenter: &mut dyn Presenter) -> Vec<Event> {
        let interval = Duration::seconds(self.escalation_interval_secs);
        let mut events = Vec::new();

        if let Some(ref mut session) = self.session {
            let elapsed = now - session.started_at;
            let target = (elapsed.num_seconds() / interval.num_seconds().max(1)).clamp(0, 2) as u8;
            while session.escalations < target {
                let Some(next) = session.stage.next() else {
                    break;
                };
                session.stage = next;
                session.escalations += 1;
                presenter.on_stage_changed(next);
                events.push(Event::VolumeEscalated {
                    stage: next,
                    at: now,
                });
            }
        }
        events
    }

    /// The user opened the gating mission. Escalation keeps running.
    pub fn begin_mission(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let session = self.session.as_mut()?;
        if session.phase == SessionPhase::MissionActive {
            return None;
        }
        session.phase = SessionPhase::MissionActive;
        Some(Event::MissionStarted {
            mission: session.mission,
            at: now,
        })
    }

    /// External mission-completed signal: the sole legal dismissal.
    ///
    /// Escalation bookkeeping dies with the session before the caller
    /// acts on the outcome, so a late tick can never revive it.
    pub fn complete_mission(
        &mut self,
        now: DateTime<Utc>,
    ) -> Option<(DismissOutcome, Event)> {
        let session = self.session.take()?;
        let outcome = DismissOutcome {
            alarm_id: session.alarm_id.clone(),
            label: session.label,
            is_snooze_origin: session.is_snooze_origin,
        };
        let event = Event::RingDismissed {
            alarm_id: session.alarm_id,
            is_snooze_origin: session.is_snooze_origin,
            at: now,
        };
        Some((outcome, event))
    }

    /// Drop the session if it belongs to `alarm_id` (alarm deleted or
    /// disabled mid-ring).
    pub fn cancel_for(&mut self, alarm_id: &str) -> bool {
        if self
            .session
            .as_ref()
            .is_some_and(|s| s.alarm_id == alarm_id)
        {
            self.session = None;
            return true;
        }
        false
    }
}

impl Default for RingController {
    fn default() -> Self {
        Self::new()
    }
}
