//! Wake-up history and streak computation.
//!
//! One record per local calendar day. The streak is the count of
//! consecutive recorded days walking backwards from the anchor: today if
//! today is recorded, otherwise yesterday (an unbroken run that simply
//! has not continued this morning yet still counts).

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::events::Event;

/// A single day's wake-up record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakeRecord {
    /// Local calendar date, one record per date.
    pub date: NaiveDate,
    /// Wall-clock time of the first dismissal that day, "HH:MM".
    pub time: String,
    /// Label of the alarm that woke the user, if any.
    pub label: Option<String>,
}

/// What happened when a wake-up was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// First record for the day.
    Created,
    /// A record existed without a label and the new one filled it in.
    LabelFilled,
    /// A record already existed; nothing changed.
    AlreadyRecorded,
}

/// In-memory wake history, ordered oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreakTracker {
    records: Vec<WakeRecord>,
}

impl StreakTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(mut records: Vec<WakeRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        records.dedup_by_key(|r| r.date);
        Self { records }
    }

    pub fn records(&self) -> &[WakeRecord] {
        &self.records
    }

    /// Record a wake-up for `date`. Idempotent per day: the first
    /// dismissal of the day wins, except that a label arriving later may
    /// fill a record stored without one.
    pub fn record_wake_up(
        &mut self,
        date: NaiveDate,
        time: &str,
        label: Option<&str>,
    ) -> RecordOutcome {
        if let Some(existing) = self.records.iter_mut().find(|r| r.date == date) {
            if existing.label.is_none() {
                if let Some(label) = label {
                    existing.label = Some(label.to_string());
                    return RecordOutcome::LabelFilled;
                }
            }
            return RecordOutcome::AlreadyRecorded;
        }

        let record = WakeRecord {
            date,
            time: time.to_string(),
            label: label.map(str::to_string),
        };
        let pos = self.records.partition_point(|r| r.date < date);
        self.records.insert(pos, record);
        RecordOutcome::Created
    }

    /// Consecutive recorded days ending at `today` or yesterday.
    ///
    /// Zero when neither is recorded: a run that ended two or more days
    /// ago is broken regardless of its length.
    pub fn current_streak(&self, today: NaiveDate) -> u32 {
        let mut anchor = today;
        if !self.has(anchor) {
            anchor = today - Duration::days(1);
            if !self.has(anchor) {
                return 0;
            }
        }

        let mut streak = 0;
        let mut day = anchor;
        while self.has(day) {
            streak += 1;
            day -= Duration::days(1);
        }
        streak
    }

    /// Longest run of consecutive recorded days anywhere in history.
    pub fn best_streak(&self) -> u32 {
        let mut best = 0u32;
        let mut run = 0u32;
        let mut prev: Option<NaiveDate> = None;
        for record in &self.records {
            run = match prev {
                Some(p) if record.date == p + Duration::days(1) => run + 1,
                _ => 1,
            };
            best = best.max(run);
            prev = Some(record.date);
        }
        best
    }

    /// Records from the last `days` days counting back from `today`,
    /// newest first.
    pub fn recent(&self, today: NaiveDate, days: u32) -> Vec<&WakeRecord> {
        let cutoff = today - Duration::days(i64::from(days));
        self.records
            .iter()
            .rev()
            .filter(|r| r.date > cutoff && r.date <= today)
            .collect()
    }

    fn has(&self, date: NaiveDate) -> bool {
        self.records
            .binary_search_by_key(&date, |r| r.date)
            .is_ok()
    }
}

/// Build the event a fresh wake record emits.
pub fn wake_recorded_event(record: &WakeRecord, at: chrono::DateTime<chrono::Utc>) -> Event {
    Event::WakeRecorded {
        date: record.date,
        time: record.time.clone(),
        label: record.label.clone(),
        at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    #[test]
    fn record_is_idempotent_per_day() {
        let mut tracker = StreakTracker::new();
        let today = d(2025, 6, 10);

        assert_eq!(
            tracker.record_wake_up(today, "07:00", Some("work")),
            RecordOutcome::Created
        );
        assert_eq!(
            tracker.record_wake_up(today, "07:30", Some("other")),
            RecordOutcome::AlreadyRecorded
        );
        assert_eq!(tracker.records().len(), 1);
        // The first dismissal's time and label stick.
        assert_eq!(tracker.records()[0].time, "07:00");
        assert_eq!(tracker.records()[0].label.as_deref(), Some("work"));
    }

    #[test]
    fn later_label_fills_unlabelled_record() {
        let mut tracker = StreakTracker::new();
        let today = d(2025, 6, 10);

        tracker.record_wake_up(today, "07:00", None);
        assert_eq!(
            tracker.record_wake_up(today, "07:30", Some("work")),
            RecordOutcome::LabelFilled
        );
        assert_eq!(tracker.records()[0].label.as_deref(), Some("work"));
        // Time of the original record is preserved.
        assert_eq!(tracker.records()[0].time, "07:00");
    }

    #[test]
    fn streak_counts_consecutive_days_ending_today() {
        let mut tracker = StreakTracker::new();
        let today = d(2025, 6, 10);
        for offset in 0..3 {
            tracker.record_wake_up(today - Duration::days(offset), "07:00", None);
        }
        assert_eq!(tracker.current_streak(today), 3);
    }

    #[test]
    fn streak_anchors_at_yesterday_when_today_missing() {
        let mut tracker = StreakTracker::new();
        let today = d(2025, 6, 10);
        tracker.record_wake_up(d(2025, 6, 9), "07:00", None);
        tracker.record_wake_up(d(2025, 6, 8), "07:00", None);
        assert_eq!(tracker.current_streak(today), 2);
    }

    #[test]
    fn gap_breaks_streak() {
        let mut tracker = StreakTracker::new();
        let today = d(2025, 6, 10);
        // Recorded two days ago and before, but neither today nor
        // yesterday.
        tracker.record_wake_up(d(2025, 6, 8), "07:00", None);
        tracker.record_wake_up(d(2025, 6, 7), "07:00", None);
        assert_eq!(tracker.current_streak(today), 0);
    }

    #[test]
    fn hole_inside_history_stops_the_walk() {
        let mut tracker = StreakTracker::new();
        let today = d(2025, 6, 10);
        tracker.record_wake_up(d(2025, 6, 10), "07:00", None);
        tracker.record_wake_up(d(2025, 6, 9), "07:00", None);
        // 06-08 missing.
        tracker.record_wake_up(d(2025, 6, 7), "07:00", None);
        assert_eq!(tracker.current_streak(today), 2);
    }

    #[test]
    fn empty_history_is_zero() {
        let tracker = StreakTracker::new();
        assert_eq!(tracker.current_streak(d(2025, 6, 10)), 0);
    }

    #[test]
    fn best_streak_scans_whole_history() {
        let mut tracker = StreakTracker::new();
        for day in [1, 2, 3, 4, 7, 8] {
            tracker.record_wake_up(d(2025, 6, day), "07:00", None);
        }
        assert_eq!(tracker.best_streak(), 4);
    }

    #[test]
    fn from_records_sorts_and_dedupes() {
        let tracker = StreakTracker::from_records(vec![
            WakeRecord {
                date: d(2025, 6, 9),
                time: "07:10".into(),
                label: None,
            },
            WakeRecord {
                date: d(2025, 6, 8),
                time: "07:00".into(),
                label: Some("work".into()),
            },
            WakeRecord {
                date: d(2025, 6, 9),
                time: "09:00".into(),
                label: None,
            },
        ]);
        assert_eq!(tracker.records().len(), 2);
        assert_eq!(tracker.records()[0].date, d(2025, 6, 8));
        assert_eq!(tracker.current_streak(d(2025, 6, 9)), 2);
    }

    #[test]
    fn recent_returns_newest_first_within_window() {
        let mut tracker = StreakTracker::new();
        for day in 1..=10 {
            tracker.record_wake_up(d(2025, 6, day), "07:00", None);
        }
        let recent = tracker.recent(d(2025, 6, 10), 7);
        assert_eq!(recent.len(), 7);
        assert_eq!(recent[0].date, d(2025, 6, 10));
        assert_eq!(recent[6].date, d(2025, 6, 4));
    }
}
