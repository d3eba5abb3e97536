//! Next-trigger resolution for alarm specs.
//!
//! Given an alarm and a reference instant, computes the next local instant
//! the alarm is due to fire, or `None` when it never will. The scan is
//! bounded: one candidate per day for at most `lookahead_days` days beyond
//! the first candidate. A `custom` alarm whose only selected day keeps
//! landing on holidays legitimately exhausts the window and resolves to
//! `None` -- fail open to silence, never to an unexpected ring.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, TimeZone, Weekday};

use super::{AlarmSpec, RepeatMode};
use crate::holiday::HolidayOracle;

/// Default number of extra days scanned past the first candidate.
pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 7;

/// Resolves alarm specs to trigger instants.
pub struct RecurrenceResolver {
    oracle: Arc<HolidayOracle>,
    lookahead_days: u32,
}

impl RecurrenceResolver {
    pub fn new(oracle: Arc<HolidayOracle>) -> Self {
        Self {
            oracle,
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
        }
    }

    pub fn with_lookahead(oracle: Arc<HolidayOracle>, lookahead_days: u32) -> Self {
        Self {
            oracle,
            lookahead_days,
        }
    }

    /// Next instant `spec` is due to fire at or after `now`, or `None`.
    pub fn next_trigger(&self, spec: &AlarmSpec, now: DateTime<Local>) -> Option<DateTime<Local>> {
        self.next_trigger_by(spec, now, candidate_instant)
    }

    /// Scan with an injectable date+time-to-instant mapping, so the DST
    /// gap path is reachable under any system timezone.
    fn next_trigger_by(
        &self,
        spec: &AlarmSpec,
        now: DateTime<Local>,
        instant: impl Fn(NaiveDate, NaiveTime) -> Option<DateTime<Local>>,
    ) -> Option<DateTime<Local>> {
        if !spec.enabled {
            return None;
        }
        let (hour, minute) = spec.time_components()?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;

        // First candidate: today at the alarm time, or tomorrow if that
        // has already passed. A today-time that does not exist (DST
        // spring-forward gap) is left for the scan to skip.
        let mut date = now.date_naive();
        if instant(date, time).is_some_and(|c| c <= now) {
            date = date.succ_opt()?;
        }

        for _ in 0..=self.lookahead_days {
            let due = match spec.repeat_mode {
                RepeatMode::Once => true,
                RepeatMode::Workdays => is_mon_to_fri(date),
                RepeatMode::Custom => {
                    if spec.custom_days.is_empty() {
                        return None;
                    }
                    spec.custom_days.contains(&weekday_index(date))
                        && !(spec.skip_holidays && self.oracle.should_skip(date))
                }
            };
            if due {
                // A day whose local time does not exist is skipped, not
                // fatal: the gap never spans two days.
                if let Some(trigger) = instant(date, time) {
                    return Some(trigger);
                }
            }
            date = date.succ_opt()?;
        }
        None
    }

    /// Coarse countdown string until the next trigger, or `None` when the
    /// alarm will not ring.
    pub fn countdown_text(&self, spec: &AlarmSpec, now: DateTime<Local>) -> Option<String> {
        let trigger = self.next_trigger(spec, now)?;
        let delta = trigger - now;
        if delta <= Duration::zero() {
            return None;
        }

        let days = delta.num_days();
        let hours = delta.num_hours() % 24;
        let minutes = delta.num_minutes() % 60;

        let text = if days > 0 {
            format!("{}d {}h", days, hours)
        } else if delta.num_hours() > 0 {
            format!("{}h {}m", hours, minutes)
        } else if minutes > 0 {
            format!("{}m", minutes)
        } else {
            "ringing soon".to_string()
        };
        Some(text)
    }
}

/// Weekday index in the stored convention: 0=Sunday .. 6=Saturday.
fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

fn is_mon_to_fri(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Local instant for `date` at `time`. DST gaps resolve to the earliest
/// valid interpretation; a nonexistent local time yields `None`.
fn candidate_instant(date: NaiveDate, time: NaiveTime) -> Option<DateTime<Local>> {
    Local.from_local_datetime(&date.and_time(time)).earliest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlarmSpec;
    use crate::holiday::{HolidayApi, HolidayCacheRow, HolidayOracle};
    use chrono::Utc;

    fn resolver_with(rows: Vec<HolidayCacheRow>) -> RecurrenceResolver {
        let oracle = HolidayOracle::new(HolidayApi::new("http://unreachable.invalid"), 7);
        oracle.import_rows(rows);
        RecurrenceResolver::new(Arc::new(oracle))
    }

    fn resolver() -> RecurrenceResolver {
        resolver_with(Vec::new())
    }

    fn holiday_row(year: i32, month_day: &str) -> HolidayCacheRow {
        HolidayCacheRow {
            year,
            month_day: month_day.to_string(),
            is_holiday: true,
            name: None,
            is_compensatory_workday: false,
            fetched_at: Utc::now(),
        }
    }

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .expect("unambiguous local time")
    }

    fn workday_alarm(time: &str) -> AlarmSpec {
        let mut spec = AlarmSpec::new(time);
        spec.repeat_mode = RepeatMode::Workdays;
        spec
    }

    #[test]
    fn disabled_alarm_never_triggers() {
        let mut spec = workday_alarm("07:00");
        spec.enabled = false;
        // 2025-06-02 is a Monday.
        assert!(resolver().next_trigger(&spec, local(2025, 6, 2, 6, 0)).is_none());
    }

    #[test]
    fn invalid_time_never_triggers() {
        let mut spec = workday_alarm("25:99");
        spec.enabled = true;
        assert!(resolver().next_trigger(&spec, local(2025, 6, 2, 6, 0)).is_none());
    }

    #[test]
    fn workdays_saturday_resolves_to_monday() {
        let spec = workday_alarm("07:00");
        // 2025-06-07 is a Saturday; next Monday is 06-09.
        let now = local(2025, 6, 7, 8, 0);
        let trigger = resolver().next_trigger(&spec, now).unwrap();
        assert_eq!(trigger, local(2025, 6, 9, 7, 0));
    }

    #[test]
    fn same_day_trigger_when_time_not_yet_passed() {
        let mut spec = AlarmSpec::new("07:00");
        spec.repeat_mode = RepeatMode::Custom;
        spec.custom_days = vec![1, 3, 5]; // Mon/Wed/Fri
        // Monday 06:00 resolves to Monday 07:00.
        let now = local(2025, 6, 2, 6, 0);
        let trigger = resolver().next_trigger(&spec, now).unwrap();
        assert_eq!(trigger, local(2025, 6, 2, 7, 0));
    }

    #[test]
    fn passed_time_advances_to_next_selected_day() {
        let mut spec = AlarmSpec::new("07:00");
        spec.repeat_mode = RepeatMode::Custom;
        spec.custom_days = vec![1, 3, 5];
        // Monday 08:00 -> Wednesday 07:00.
        let now = local(2025, 6, 2, 8, 0);
        let trigger = resolver().next_trigger(&spec, now).unwrap();
        assert_eq!(trigger, local(2025, 6, 4, 7, 0));
    }

    #[test]
    fn custom_empty_days_never_triggers() {
        let mut spec = AlarmSpec::new("07:00");
        spec.repeat_mode = RepeatMode::Custom;
        spec.custom_days = Vec::new();
        assert!(resolver().next_trigger(&spec, local(2025, 6, 2, 6, 0)).is_none());
    }

    #[test]
    fn custom_skips_holiday_to_following_week() {
        let mut spec = AlarmSpec::new("07:00");
        spec.repeat_mode = RepeatMode::Custom;
        spec.custom_days = vec![1]; // Mondays only
        spec.skip_holidays = true;
        // Monday 2025-06-02 is a holiday; the scan should land on Monday
        // 2025-06-09 instead.
        let resolver = resolver_with(vec![holiday_row(2025, "06-02")]);
        let now = local(2025, 6, 1, 12, 0); // Sunday
        let trigger = resolver.next_trigger(&spec, now).unwrap();
        assert_eq!(trigger, local(2025, 6, 9, 7, 0));
    }

    #[test]
    fn all_candidates_holidays_exhausts_window() {
        let mut spec = AlarmSpec::new("07:00");
        spec.repeat_mode = RepeatMode::Custom;
        spec.custom_days = vec![1];
        spec.skip_holidays = true;
        // Both Mondays inside the 8-day window are holidays.
        let resolver = resolver_with(vec![
            holiday_row(2025, "06-02"),
            holiday_row(2025, "06-09"),
        ]);
        let now = local(2025, 6, 1, 12, 0);
        assert!(resolver.next_trigger(&spec, now).is_none());
    }

    #[test]
    fn workdays_ignores_skip_holidays() {
        let mut spec = workday_alarm("07:00");
        spec.skip_holidays = true;
        let resolver = resolver_with(vec![holiday_row(2025, "06-02")]);
        // Holiday skip only applies to custom mode; Monday still fires.
        let now = local(2025, 6, 1, 12, 0);
        let trigger = resolver.next_trigger(&spec, now).unwrap();
        assert_eq!(trigger, local(2025, 6, 2, 7, 0));
    }

    #[test]
    fn once_fires_on_next_occurrence_regardless_of_day() {
        let mut spec = AlarmSpec::new("07:00");
        spec.repeat_mode = RepeatMode::Once;
        spec.skip_holidays = true;
        // Saturday, and a holiday: once-mode fires anyway, next morning.
        let resolver = resolver_with(vec![holiday_row(2025, "06-08")]);
        let now = local(2025, 6, 7, 8, 0);
        let trigger = resolver.next_trigger(&spec, now).unwrap();
        assert_eq!(trigger, local(2025, 6, 8, 7, 0));
    }

    #[test]
    fn nonexistent_local_time_skips_to_next_day() {
        let mut spec = AlarmSpec::new("02:30");
        spec.repeat_mode = RepeatMode::Once;
        // 02:30 does not exist on 2025-06-03 (spring-forward gap).
        let gap_day = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        let now = local(2025, 6, 2, 12, 0);
        let trigger = resolver()
            .next_trigger_by(&spec, now, |date, time| {
                if date == gap_day {
                    None
                } else {
                    candidate_instant(date, time)
                }
            })
            .unwrap();
        assert_eq!(trigger, local(2025, 6, 4, 2, 30));
    }

    #[test]
    fn nonexistent_local_time_on_workday_does_not_kill_scan() {
        let spec = workday_alarm("02:30");
        // Monday's 02:30 is in a gap; Tuesday still fires.
        let gap_day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let now = local(2025, 6, 1, 12, 0); // Sunday
        let trigger = resolver()
            .next_trigger_by(&spec, now, |date, time| {
                if date == gap_day {
                    None
                } else {
                    candidate_instant(date, time)
                }
            })
            .unwrap();
        assert_eq!(trigger, local(2025, 6, 3, 2, 30));
    }

    #[test]
    fn countdown_text_is_coarse() {
        let mut spec = AlarmSpec::new("07:00");
        spec.repeat_mode = RepeatMode::Once;
        let r = resolver();

        // 22 hours ahead: hours + minutes.
        let now = local(2025, 6, 2, 9, 0);
        assert_eq!(r.countdown_text(&spec, now).as_deref(), Some("22h 0m"));

        // 30 minutes ahead: minutes only.
        let now = local(2025, 6, 2, 6, 30);
        assert_eq!(r.countdown_text(&spec, now).as_deref(), Some("30m"));

        // Multi-day for a custom alarm.
        spec.repeat_mode = RepeatMode::Custom;
        spec.custom_days = vec![5]; // Friday
        let now = local(2025, 6, 2, 8, 0); // Monday
        assert_eq!(r.countdown_text(&spec, now).as_deref(), Some("3d 23h"));
    }

    #[test]
    fn countdown_none_when_no_trigger() {
        let mut spec = AlarmSpec::new("07:00");
        spec.repeat_mode = RepeatMode::Custom;
        spec.custom_days = Vec::new();
        assert!(resolver().countdown_text(&spec, local(2025, 6, 2, 6, 0)).is_none());
    }
}
