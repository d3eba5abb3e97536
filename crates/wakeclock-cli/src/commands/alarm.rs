use clap::Subcommand;
use chrono::Local;
use serde::Serialize;
use wakeclock_core::alarm::{AlarmSpec, Difficulty, MissionType, RepeatMode};
use wakeclock_core::storage::{Config, Database};
use wakeclock_core::ValidationError;

#[derive(Subcommand)]
pub enum AlarmAction {
    /// Create an alarm
    Add {
        /// Time of day, "HH:MM"
        time: String,
        /// Category label (work, date, flight, train, meeting, doctor,
        /// interview, exam, other)
        #[arg(long, default_value = "other")]
        label: String,
        /// Gating mission (math, memory, order, shake, typing)
        #[arg(long, default_value = "math")]
        mission: String,
        /// Mission difficulty (easy, medium, hard)
        #[arg(long, default_value = "medium")]
        difficulty: String,
        /// Repeat mode (once, workdays, custom)
        #[arg(long, default_value = "workdays")]
        repeat: String,
        /// Weekdays for custom mode, 0=Sunday..6=Saturday, e.g. "1,3,5"
        #[arg(long)]
        days: Option<String>,
        /// Skip public holidays (custom mode only)
        #[arg(long)]
        skip_holidays: bool,
    },
    /// List alarms with their next trigger
    List,
    /// Enable an alarm
    Enable { id: String },
    /// Disable an alarm
    Disable { id: String },
    /// Delete an alarm
    Remove { id: String },
    /// Print the next trigger for one alarm
    Next { id: String },
}

#[derive(Serialize)]
struct AlarmView {
    #[serde(flatten)]
    spec: AlarmSpec,
    next_trigger: Option<String>,
    countdown: Option<String>,
    icon: &'static str,
}

fn parse_days(days: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    days.split(',')
        .map(|d| {
            d.trim()
                .parse::<u8>()
                .map_err(|_| format!("invalid weekday '{d}'").into())
        })
        .collect()
}

fn view(spec: AlarmSpec, db: &Database, config: &Config) -> Result<AlarmView, Box<dyn std::error::Error>> {
    let resolver = super::load_resolver(db, config)?;
    let now = Local::now();
    let next_trigger = resolver
        .next_trigger(&spec, now)
        .map(|t| t.to_rfc3339());
    let countdown = resolver.countdown_text(&spec, now);
    let icon = spec.icon_name();
    Ok(AlarmView {
        spec,
        next_trigger,
        countdown,
        icon,
    })
}

fn set_enabled(
    db: &Database,
    id: &str,
    enabled: bool,
) -> Result<AlarmSpec, Box<dyn std::error::Error>> {
    let mut spec = db
        .get_alarm(id)?
        .ok_or_else(|| format!("no alarm with id {id}"))?;
    spec.enabled = enabled;
    db.upsert_alarm(&spec)?;
    Ok(spec)
}

pub fn run(action: AlarmAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load()?;

    match action {
        AlarmAction::Add {
            time,
            label,
            mission,
            difficulty,
            repeat,
            days,
            skip_holidays,
        } => {
            let mut spec = AlarmSpec::new(time);
            spec.label = label;
            spec.mission_type = MissionType::parse(&mission)?;
            spec.difficulty = Difficulty::parse(&difficulty)?;
            spec.repeat_mode = RepeatMode::parse(&repeat)?;
            if let Some(days) = days {
                spec.custom_days = parse_days(&days)?;
            }
            spec.skip_holidays = skip_holidays;
            if spec.time_components().is_none() {
                return Err(ValidationError::InvalidTimeOfDay(spec.time.clone()).into());
            }
            spec.validate_custom_days()?;

            db.upsert_alarm(&spec)?;
            println!("{}", serde_json::to_string_pretty(&view(spec, &db, &config)?)?);
        }
        AlarmAction::List => {
            let mut views = Vec::new();
            for spec in db.list_alarms()? {
                views.push(view(spec, &db, &config)?);
            }
            println!("{}", serde_json::to_string_pretty(&views)?);
        }
        AlarmAction::Enable { id } => {
            let spec = set_enabled(&db, &id, true)?;
            println!("{}", serde_json::to_string_pretty(&view(spec, &db, &config)?)?);
        }
        AlarmAction::Disable { id } => {
            let spec = set_enabled(&db, &id, false)?;
            println!("{}", serde_json::to_string_pretty(&view(spec, &db, &config)?)?);
        }
        AlarmAction::Remove { id } => {
            if db.delete_alarm(&id)? {
                println!("{{\"type\": \"alarm_removed\", \"id\": \"{id}\"}}");
            } else {
                return Err(format!("no alarm with id {id}").into());
            }
        }
        AlarmAction::Next { id } => {
            let spec = db
                .get_alarm(&id)?
                .ok_or_else(|| format!("no alarm with id {id}"))?;
            println!("{}", serde_json::to_string_pretty(&view(spec, &db, &config)?)?);
        }
    }
    Ok(())
}
