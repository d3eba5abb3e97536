use chrono::{Local, NaiveDate};
use clap::Subcommand;
use serde::Serialize;
use wakeclock_core::storage::Database;
use wakeclock_core::streak::{RecordOutcome, StreakTracker};

#[derive(Subcommand)]
pub enum StreakAction {
    /// Record a wake-up for a day
    Record {
        /// Date as YYYY-MM-DD, defaults to today
        #[arg(long)]
        date: Option<String>,
        /// Wall-clock time as HH:MM, defaults to now
        #[arg(long)]
        time: Option<String>,
        /// Label of the waking alarm
        #[arg(long)]
        label: Option<String>,
    },
    /// Print current and best streak as JSON
    Status,
    /// Print recent wake-up records
    History {
        /// Number of days to include
        #[arg(long, default_value = "30")]
        days: u32,
    },
}

#[derive(Serialize)]
struct StreakStatus {
    current_streak: u32,
    best_streak: u32,
    total_records: usize,
}

fn parse_date(text: &str) -> Result<NaiveDate, Box<dyn std::error::Error>> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{text}': expected YYYY-MM-DD").into())
}

pub fn run(action: StreakAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut tracker = StreakTracker::from_records(db.list_wake_records()?);
    let now = Local::now();
    let today = now.date_naive();

    match action {
        StreakAction::Record { date, time, label } => {
            let date = match date {
                Some(text) => parse_date(&text)?,
                None => today,
            };
            let time = time.unwrap_or_else(|| now.format("%H:%M").to_string());
            let outcome = tracker.record_wake_up(date, &time, label.as_deref());

            if !matches!(outcome, RecordOutcome::AlreadyRecorded) {
                if let Some(record) = tracker.records().iter().find(|r| r.date == date) {
                    db.upsert_wake_record(record)?;
                }
            }
            let kind = match outcome {
                RecordOutcome::Created => "wake_recorded",
                RecordOutcome::LabelFilled => "wake_label_filled",
                RecordOutcome::AlreadyRecorded => "already_recorded",
            };
            println!("{{\"type\": \"{kind}\", \"date\": \"{date}\"}}");
        }
        StreakAction::Status => {
            let status = StreakStatus {
                current_streak: tracker.current_streak(today),
                best_streak: tracker.best_streak(),
                total_records: tracker.records().len(),
            };
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        StreakAction::History { days } => {
            let records = tracker.recent(today, days);
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }
    Ok(())
}
