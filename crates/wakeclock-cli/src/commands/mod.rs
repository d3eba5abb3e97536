pub mod alarm;
pub mod config;
pub mod holiday;
pub mod streak;

use std::sync::Arc;

use wakeclock_core::alarm::RecurrenceResolver;
use wakeclock_core::holiday::{HolidayApi, HolidayOracle};
use wakeclock_core::storage::{Config, Database};

/// Oracle hydrated from the persisted holiday cache.
pub fn load_oracle(db: &Database, config: &Config) -> Result<Arc<HolidayOracle>, Box<dyn std::error::Error>> {
    let oracle = HolidayOracle::new(
        HolidayApi::new(&config.holiday.api_base),
        i64::from(config.holiday.cache_ttl_days),
    );
    oracle.import_rows(db.load_holiday_rows()?);
    Ok(Arc::new(oracle))
}

/// Resolver over the persisted holiday cache.
pub fn load_resolver(db: &Database, config: &Config) -> Result<RecurrenceResolver, Box<dyn std::error::Error>> {
    let oracle = load_oracle(db, config)?;
    Ok(RecurrenceResolver::with_lookahead(
        oracle,
        config.ring.lookahead_days,
    ))
}
