//! # Wakeclock Core Library
//!
//! This library provides the core business logic for the Wakeclock wake-up
//! alarm. It implements a CLI-first philosophy where all operations are
//! available via a standalone CLI binary, with platform shells being thin
//! layers over the same core library.
//!
//! ## Architecture
//!
//! - **Ring Controller**: A wall-clock-based state machine that requires
//!   the caller to periodically invoke `tick()` for volume escalation
//! - **Recurrence Resolver**: Computes the next trigger instant for an
//!   alarm under its repeat policy and the holiday calendar
//! - **Holiday Oracle**: Cached per-year holiday tables with remote
//!   refresh and a built-in fallback
//! - **Storage**: SQLite-based alarm/history persistence and TOML-based
//!   configuration
//!
//! ## Key Components
//!
//! - [`WakeEngine`]: Composition root driven by host callbacks and ticks
//! - [`RingController`]: Ring session state machine
//! - [`AntiSnoozeCoordinator`]: Post-dismissal confirmation chain
//! - [`StreakTracker`]: Daily wake records and streak computation
//! - [`PlatformScheduler`]: Host capability for absolute-time callbacks

pub mod alarm;
pub mod engine;
pub mod error;
pub mod events;
pub mod holiday;
pub mod ring;
pub mod scheduler;
pub mod storage;
pub mod streak;

pub use alarm::{AlarmSpec, Difficulty, MissionType, RecurrenceResolver, RepeatMode};
pub use engine::WakeEngine;
pub use error::{ConfigError, CoreError, DatabaseError, SchedulerError, ValidationError};
pub use events::Event;
pub use holiday::{HolidayApi, HolidayInfo, HolidayOracle};
pub use ring::{
    AntiSnoozeCoordinator, NullPresenter, Presenter, RingController, RingSession, VolumeStage,
};
pub use scheduler::{
    NullScheduler, PlatformScheduler, RecordingScheduler, TriggerKind, TriggerPayload,
};
pub use storage::{Config, Database};
pub use streak::{StreakTracker, WakeRecord};
