//! SQLite-based persistent storage.
//!
//! Provides storage for:
//! - Alarm specs
//! - Daily wake-up records
//! - The holiday cache (one row per calendar day)
//! - Key-value store for application state

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};

use crate::alarm::{AlarmSpec, Difficulty, MissionType, RepeatMode};
use crate::error::{DatabaseError, Result};
use crate::holiday::HolidayCacheRow;
use crate::streak::WakeRecord;

use super::data_dir;

/// SQLite database at `~/.config/wakeclock/wakeclock.db`.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database, creating the file and schema if needed.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("wakeclock.db"))
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and dry runs).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(DatabaseError::from)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS alarms (
                    id             TEXT PRIMARY KEY,
                    time           TEXT NOT NULL,
                    enabled        INTEGER NOT NULL DEFAULT 1,
                    label          TEXT NOT NULL DEFAULT 'other',
                    mission_type   TEXT NOT NULL,
                    difficulty     TEXT NOT NULL,
                    repeat_mode    TEXT NOT NULL,
                    custom_days    TEXT NOT NULL DEFAULT '[]',
                    skip_holidays  INTEGER NOT NULL DEFAULT 0,
                    created_at     TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS wakeup_records (
                    date   TEXT PRIMARY KEY,
                    time   TEXT NOT NULL,
                    label  TEXT
                );

                CREATE TABLE IF NOT EXISTS holiday_cache (
                    year           INTEGER NOT NULL,
                    month_day      TEXT NOT NULL,
                    is_holiday     INTEGER NOT NULL,
                    name           TEXT,
                    is_comp_work   INTEGER NOT NULL DEFAULT 0,
                    fetched_at     TEXT NOT NULL,
                    PRIMARY KEY (year, month_day)
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_alarms_enabled ON alarms(enabled);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(())
    }

    // --- alarms ---

    /// Insert or replace an alarm spec.
    pub fn upsert_alarm(&self, spec: &AlarmSpec) -> Result<()> {
        let custom_days = serde_json::to_string(&spec.custom_days)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO alarms
             (id, time, enabled, label, mission_type, difficulty, repeat_mode,
              custom_days, skip_holidays, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                spec.id,
                spec.time,
                spec.enabled,
                spec.label,
                spec.mission_type.as_str(),
                spec.difficulty.as_str(),
                spec.repeat_mode.as_str(),
                custom_days,
                spec.skip_holidays,
                spec.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_alarm(&self, id: &str) -> Result<Option<AlarmSpec>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, time, enabled, label, mission_type, difficulty,
                    repeat_mode, custom_days, skip_holidays, created_at
             FROM alarms WHERE id = ?1",
        )?;
        let row = stmt.query_row(params![id], Self::alarm_row);
        match row {
            Ok(raw) => Ok(Some(Self::alarm_from_raw(raw)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All alarms, oldest first.
    pub fn list_alarms(&self) -> Result<Vec<AlarmSpec>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, time, enabled, label, mission_type, difficulty,
                    repeat_mode, custom_days, skip_holidays, created_at
             FROM alarms ORDER BY created_at",
        )?;
        let rows = stmt.query_map([], Self::alarm_row)?;
        let mut alarms = Vec::new();
        for row in rows {
            alarms.push(Self::alarm_from_raw(row?)?);
        }
        Ok(alarms)
    }

    /// Delete an alarm. Returns whether a row was removed.
    pub fn delete_alarm(&self, id: &str) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM alarms WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    #[allow(clippy::type_complexity)]
    fn alarm_row(
        row: &rusqlite::Row<'_>,
    ) -> rusqlite::Result<(
        String,
        String,
        bool,
        String,
        String,
        String,
        String,
        String,
        bool,
        String,
    )> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
            row.get(9)?,
        ))
    }

    fn alarm_from_raw(
        raw: (
            String,
            String,
            bool,
            String,
            String,
            String,
            String,
            String,
            bool,
            String,
        ),
    ) -> Result<AlarmSpec> {
        let (
            id,
            time,
            enabled,
            label,
            mission_type,
            difficulty,
            repeat_mode,
            custom_days,
            skip_holidays,
            created_at,
        ) = raw;
        Ok(AlarmSpec {
            id,
            time,
            enabled,
            label,
            mission_type: MissionType::parse(&mission_type)?,
            difficulty: Difficulty::parse(&difficulty)?,
            repeat_mode: RepeatMode::parse(&repeat_mode)?,
            custom_days: serde_json::from_str(&custom_days)?,
            skip_holidays,
            created_at: parse_utc(&created_at)?,
        })
    }

    // --- wake-up records ---

    /// Insert or replace the record for its date.
    pub fn upsert_wake_record(&self, record: &WakeRecord) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO wakeup_records (date, time, label)
             VALUES (?1, ?2, ?3)",
            params![
                record.date.format("%Y-%m-%d").to_string(),
                record.time,
                record.label,
            ],
        )?;
        Ok(())
    }

    /// All wake-up records, oldest first.
    pub fn list_wake_records(&self) -> Result<Vec<WakeRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT date, time, label FROM wakeup_records ORDER BY date")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        })?;
        let mut records = Vec::new();
        for row in rows {
            let (date, time, label) = row?;
            records.push(WakeRecord {
                date: parse_date(&date)?,
                time,
                label,
            });
        }
        Ok(records)
    }

    // --- holiday cache ---

    /// Replace the cached rows for one year atomically.
    pub fn replace_holiday_year(&mut self, year: i32, rows: &[HolidayCacheRow]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM holiday_cache WHERE year = ?1", params![year])?;
        for row in rows {
            tx.execute(
                "INSERT INTO holiday_cache
                 (year, month_day, is_holiday, name, is_comp_work, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    row.year,
                    row.month_day,
                    row.is_holiday,
                    row.name,
                    row.is_compensatory_workday,
                    row.fetched_at.to_rfc3339(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// All cached holiday rows across all years.
    pub fn load_holiday_rows(&self) -> Result<Vec<HolidayCacheRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT year, month_day, is_holiday, name, is_comp_work, fetched_at
             FROM holiday_cache ORDER BY year, month_day",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i32>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (year, month_day, is_holiday, name, is_compensatory_workday, fetched_at) = row?;
            out.push(HolidayCacheRow {
                year,
                month_day,
                is_holiday,
                name,
                is_compensatory_workday,
                fetched_at: parse_utc(&fetched_at)?,
            });
        }
        Ok(out)
    }

    // --- kv ---

    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

fn parse_utc(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::QueryFailed(format!("bad timestamp '{text}': {e}")).into())
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map_err(|e| DatabaseError::QueryFailed(format!("bad date '{text}': {e}")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn alarm_round_trip() {
        let db = Database::open_memory().unwrap();
        let mut spec = AlarmSpec::new("07:30");
        spec.label = "work".into();
        spec.repeat_mode = RepeatMode::Custom;
        spec.custom_days = vec![1, 3, 5];
        spec.skip_holidays = true;

        db.upsert_alarm(&spec).unwrap();
        let loaded = db.get_alarm(&spec.id).unwrap().unwrap();
        assert_eq!(loaded.time, "07:30");
        assert_eq!(loaded.label, "work");
        assert_eq!(loaded.repeat_mode, RepeatMode::Custom);
        assert_eq!(loaded.custom_days, vec![1, 3, 5]);
        assert!(loaded.skip_holidays);
    }

    #[test]
    fn upsert_replaces_existing_alarm() {
        let db = Database::open_memory().unwrap();
        let mut spec = AlarmSpec::new("07:30");
        db.upsert_alarm(&spec).unwrap();

        spec.enabled = false;
        spec.time = "08:00".into();
        db.upsert_alarm(&spec).unwrap();

        assert_eq!(db.list_alarms().unwrap().len(), 1);
        let loaded = db.get_alarm(&spec.id).unwrap().unwrap();
        assert!(!loaded.enabled);
        assert_eq!(loaded.time, "08:00");
    }

    #[test]
    fn delete_alarm_reports_presence() {
        let db = Database::open_memory().unwrap();
        let spec = AlarmSpec::new("07:30");
        db.upsert_alarm(&spec).unwrap();
        assert!(db.delete_alarm(&spec.id).unwrap());
        assert!(!db.delete_alarm(&spec.id).unwrap());
        assert!(db.get_alarm(&spec.id).unwrap().is_none());
    }

    #[test]
    fn wake_records_keyed_by_date() {
        let db = Database::open_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        db.upsert_wake_record(&WakeRecord {
            date,
            time: "07:00".into(),
            label: None,
        })
        .unwrap();
        db.upsert_wake_record(&WakeRecord {
            date,
            time: "07:00".into(),
            label: Some("work".into()),
        })
        .unwrap();

        let records = db.list_wake_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label.as_deref(), Some("work"));
    }

    #[test]
    fn holiday_year_replacement_is_atomic() {
        let mut db = Database::open_memory().unwrap();
        let row = |month_day: &str, is_holiday: bool| HolidayCacheRow {
            year: 2025,
            month_day: month_day.to_string(),
            is_holiday,
            name: is_holiday.then(|| "Holiday".to_string()),
            is_compensatory_workday: !is_holiday,
            fetched_at: Utc::now(),
        };

        db.replace_holiday_year(2025, &[row("01-01", true), row("01-26", false)])
            .unwrap();
        db.replace_holiday_year(2025, &[row("05-01", true)]).unwrap();

        let rows = db.load_holiday_rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].month_day, "05-01");
    }

    #[test]
    fn disk_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wakeclock.db");

        let spec = AlarmSpec::new("07:30");
        {
            let db = Database::open_at(&path).unwrap();
            db.upsert_alarm(&spec).unwrap();
            db.upsert_wake_record(&WakeRecord {
                date: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
                time: "07:31".into(),
                label: Some("work".into()),
            })
            .unwrap();
        }

        let db = Database::open_at(&path).unwrap();
        let loaded = db.get_alarm(&spec.id).unwrap().unwrap();
        assert_eq!(loaded.time, "07:30");
        let records = db.list_wake_records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label.as_deref(), Some("work"));
    }

    #[test]
    fn kv_store_round_trip() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("last_mission").unwrap().is_none());
        db.kv_set("last_mission", "math").unwrap();
        assert_eq!(db.kv_get("last_mission").unwrap().as_deref(), Some("math"));
        db.kv_set("last_mission", "typing").unwrap();
        assert_eq!(db.kv_get("last_mission").unwrap().as_deref(), Some("typing"));
    }
}
