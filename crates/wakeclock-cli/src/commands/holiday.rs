use chrono::{Local, NaiveDate};
use clap::Subcommand;
use serde::Serialize;
use wakeclock_core::holiday::HolidayInfo;
use wakeclock_core::ring::NullPresenter;
use wakeclock_core::scheduler::NullScheduler;
use wakeclock_core::storage::{Config, Database};
use wakeclock_core::WakeEngine;

#[derive(Subcommand)]
pub enum HolidayAction {
    /// Look up one date in the holiday calendar
    Check {
        /// Date as YYYY-MM-DD, defaults to today
        date: Option<String>,
    },
    /// Refresh the cached holiday calendar from the remote API
    Refresh {
        /// Refresh even when the cache is still fresh
        #[arg(long)]
        force: bool,
    },
}

#[derive(Serialize)]
struct DayView {
    date: NaiveDate,
    is_holiday: bool,
    name: Option<String>,
    is_compensatory_workday: bool,
    should_skip: bool,
}

#[derive(Serialize)]
struct RefreshView {
    updated_years: Vec<i32>,
}

pub fn run(action: HolidayAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load()?;

    match action {
        HolidayAction::Check { date } => {
            let oracle = super::load_oracle(&db, &config)?;
            let date = match date {
                Some(text) => NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                    .map_err(|_| format!("invalid date '{text}': expected YYYY-MM-DD"))?,
                None => Local::now().date_naive(),
            };
            let info = oracle.lookup(date).unwrap_or(HolidayInfo {
                is_holiday: false,
                name: None,
                is_compensatory_workday: false,
            });
            let view = DayView {
                date,
                should_skip: oracle.should_skip(date),
                is_holiday: info.is_holiday,
                name: info.name,
                is_compensatory_workday: info.is_compensatory_workday,
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        HolidayAction::Refresh { force } => {
            let mut engine = WakeEngine::new(db, config, NullScheduler, NullPresenter)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let today = Local::now().date_naive();
            let updated = runtime.block_on(engine.refresh_holidays(today, force))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&RefreshView {
                    updated_years: updated
                })?
            );
        }
    }
    Ok(())
}
