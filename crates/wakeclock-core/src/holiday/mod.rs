//! Holiday oracle.
//!
//! Answers "is this date a public holiday / a compensatory workday" from a
//! cached per-year table refreshed from the remote calendar API, with a
//! small built-in fallback table for dates no cache covers. Refresh is
//! fire-and-forget: any failure leaves the existing cache untouched.
//!
//! The cache is shared behind an `RwLock`; readers see the pre-refresh
//! snapshot until a completed refresh atomically swaps in the new year
//! table. Entries expire 7 days after their fetch and survive process
//! restarts via the storage layer (`import_rows` / `export_rows`).

mod api;

pub use api::{HolidayApi, DEFAULT_API_BASE};

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Cached facts about one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayInfo {
    pub is_holiday: bool,
    pub name: Option<String>,
    pub is_compensatory_workday: bool,
}

/// Flat cache row for persistence, keyed by `(year, "MM-DD")`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayCacheRow {
    pub year: i32,
    pub month_day: String,
    pub is_holiday: bool,
    pub name: Option<String>,
    pub is_compensatory_workday: bool,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct YearTable {
    fetched_at: DateTime<Utc>,
    days: HashMap<String, HolidayInfo>,
}

/// Shared holiday lookup with remote refresh.
pub struct HolidayOracle {
    cache: RwLock<HashMap<i32, YearTable>>,
    api: HolidayApi,
    ttl: Duration,
}

impl HolidayOracle {
    pub fn new(api: HolidayApi, cache_ttl_days: i64) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            api,
            ttl: Duration::days(cache_ttl_days),
        }
    }

    /// Load previously persisted cache rows (at construction).
    pub fn import_rows(&self, rows: Vec<HolidayCacheRow>) {
        let mut cache = self.cache.write().expect("holiday cache poisoned");
        for row in rows {
            let table = cache.entry(row.year).or_insert_with(|| YearTable {
                fetched_at: row.fetched_at,
                days: HashMap::new(),
            });
            table.fetched_at = row.fetched_at;
            table.days.insert(
                row.month_day,
                HolidayInfo {
                    is_holiday: row.is_holiday,
                    name: row.name,
                    is_compensatory_workday: row.is_compensatory_workday,
                },
            );
        }
    }

    /// Snapshot the cache as flat rows for persistence.
    pub fn export_rows(&self) -> Vec<HolidayCacheRow> {
        let cache = self.cache.read().expect("holiday cache poisoned");
        let mut rows = Vec::new();
        for (&year, table) in cache.iter() {
            for (month_day, info) in &table.days {
                rows.push(HolidayCacheRow {
                    year,
                    month_day: month_day.clone(),
                    is_holiday: info.is_holiday,
                    name: info.name.clone(),
                    is_compensatory_workday: info.is_compensatory_workday,
                    fetched_at: table.fetched_at,
                });
            }
        }
        rows
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.lookup(date).map(|i| i.is_holiday).unwrap_or(false)
    }

    pub fn is_compensatory_workday(&self, date: NaiveDate) -> bool {
        self.lookup(date)
            .map(|i| i.is_compensatory_workday)
            .unwrap_or(false)
    }

    /// An alarm should skip `date` when it is a holiday that is not a
    /// compensatory workday.
    pub fn should_skip(&self, date: NaiveDate) -> bool {
        match self.lookup(date) {
            Some(info) => info.is_holiday && !info.is_compensatory_workday,
            None => false,
        }
    }

    /// Cached entry for the date's year, falling back to the built-in
    /// table. Dates outside all tables are non-holiday.
    pub fn lookup(&self, date: NaiveDate) -> Option<HolidayInfo> {
        let key = month_day_key(date);
        {
            let cache = self.cache.read().expect("holiday cache poisoned");
            if let Some(table) = cache.get(&date.year()) {
                if let Some(info) = table.days.get(&key) {
                    return Some(info.clone());
                }
                // A cached year table is authoritative for its whole year.
                return None;
            }
        }
        fallback_lookup(date)
    }

    /// Whether the cached table for `year` exists and is within its TTL.
    pub fn is_year_fresh(&self, year: i32, now: DateTime<Utc>) -> bool {
        let cache = self.cache.read().expect("holiday cache poisoned");
        cache
            .get(&year)
            .map(|table| now - table.fetched_at < self.ttl)
            .unwrap_or(false)
    }

    /// Fetch and atomically install the table for `year`.
    ///
    /// Fire-and-forget: returns `false` on any failure and leaves the
    /// existing cache in place.
    pub async fn refresh(&self, year: i32) -> bool {
        let Some(days) = self.api.fetch_year(year).await else {
            return false;
        };
        let table = YearTable {
            fetched_at: Utc::now(),
            days,
        };
        let mut cache = self.cache.write().expect("holiday cache poisoned");
        cache.insert(year, table);
        true
    }

    /// Refresh current and next year when absent or expired (always when
    /// `force`). Returns the years that were actually updated.
    pub async fn preload(&self, today: NaiveDate, force: bool) -> Vec<i32> {
        let now = Utc::now();
        let mut updated = Vec::new();
        for year in [today.year(), today.year() + 1] {
            if force || !self.is_year_fresh(year, now) {
                if self.refresh(year).await {
                    updated.push(year);
                }
            }
        }
        updated
    }
}

fn month_day_key(date: NaiveDate) -> String {
    format!("{:02}-{:02}", date.month(), date.day())
}

/// Built-in fallback for dates no cached year covers: fixed solar-date
/// holidays plus lunar holiday ranges for a few anchor years.
fn fallback_lookup(date: NaiveDate) -> Option<HolidayInfo> {
    const FIXED: &[(&str, &str)] = &[
        ("01-01", "元旦"),
        ("04-04", "清明节"),
        ("04-05", "清明节"),
        ("05-01", "劳动节"),
        ("10-01", "国庆节"),
        ("10-02", "国庆节"),
        ("10-03", "国庆节"),
        ("10-04", "国庆节"),
        ("10-05", "国庆节"),
        ("10-06", "国庆节"),
        ("10-07", "国庆节"),
    ];

    // Lunar-calendar holidays for years known at build time:
    // (year, first day, last day, name).
    const LUNAR: &[(i32, &str, &str, &str)] = &[
        (2024, "02-10", "02-17", "春节"),
        (2024, "06-10", "06-10", "端午节"),
        (2024, "09-15", "09-17", "中秋节"),
        (2025, "01-28", "02-04", "春节"),
        (2025, "05-31", "06-02", "端午节"),
        (2025, "10-06", "10-06", "中秋节"),
        (2026, "02-16", "02-22", "春节"),
        (2026, "06-19", "06-19", "端午节"),
        (2026, "09-25", "09-25", "中秋节"),
    ];

    let key = month_day_key(date);

    for &(md, name) in FIXED {
        if md == key {
            return Some(HolidayInfo {
                is_holiday: true,
                name: Some(name.to_string()),
                is_compensatory_workday: false,
            });
        }
    }

    for &(year, first, last, name) in LUNAR {
        if year == date.year() && key.as_str() >= first && key.as_str() <= last {
            return Some(HolidayInfo {
                is_holiday: true,
                name: Some(name.to_string()),
                is_compensatory_workday: false,
            });
        }
    }

    None
}
