mod config;
pub mod database;

pub use config::{AntiSnoozeConfig, Config, HolidayConfig, RingConfig, UiConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/wakeclock[-dev]/` based on WAKECLOCK_ENV.
///
/// Set WAKECLOCK_ENV=dev to use a development data directory.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("WAKECLOCK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("wakeclock-dev")
    } else {
        base_dir.join("wakeclock")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
