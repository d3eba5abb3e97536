//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Anti-snooze chain settings
//! - Ring escalation and confirmation timing
//! - Holiday data source and cache lifetime
//! - Theme and language
//!
//! Configuration is stored at `~/.config/wakeclock/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::{ConfigError, Result};
use crate::holiday::DEFAULT_API_BASE;

/// Anti-snooze chain configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntiSnoozeConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
    #[serde(default = "default_count")]
    pub count: u32,
}

/// Ring session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingConfig {
    #[serde(default = "default_escalation_interval")]
    pub escalation_interval_secs: u32,
    #[serde(default = "default_confirm_window")]
    pub confirm_window_secs: u32,
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: u32,
}

/// Holiday data configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_cache_ttl_days")]
    pub cache_ttl_days: u32,
}

/// UI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_language")]
    pub language: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/wakeclock/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub anti_snooze: AntiSnoozeConfig,
    #[serde(default)]
    pub ring: RingConfig,
    #[serde(default)]
    pub holiday: HolidayConfig,
    #[serde(default)]
    pub ui: UiConfig,
    /// Remind the user to raise media volume before sleeping.
    #[serde(default = "default_true")]
    pub volume_reminder: bool,
    /// The one-time notice about battery optimization has been accepted.
    #[serde(default)]
    pub safety_notice_accepted: bool,
}

// Default functions
fn default_interval_minutes() -> u32 {
    5
}
fn default_count() -> u32 {
    2
}
fn default_escalation_interval() -> u32 {
    15
}
fn default_confirm_window() -> u32 {
    60
}
fn default_lookahead_days() -> u32 {
    7
}
fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}
fn default_cache_ttl_days() -> u32 {
    7
}
fn default_theme() -> String {
    "dark".into()
}
fn default_language() -> String {
    "en".into()
}
fn default_true() -> bool {
    true
}

impl Default for AntiSnoozeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: default_interval_minutes(),
            count: default_count(),
        }
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            escalation_interval_secs: default_escalation_interval(),
            confirm_window_secs: default_confirm_window(),
            lookahead_days: default_lookahead_days(),
        }
    }
}

impl Default for HolidayConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            cache_ttl_days: default_cache_ttl_days(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            language: default_language(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            anti_snooze: AntiSnoozeConfig::default(),
            ring: RingConfig::default(),
            holiday: HolidayConfig::default(),
            ui: UiConfig::default(),
            volume_reminder: true,
            safety_notice_accepted: false,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".to_string(),
        };
        let bad = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(bad("config key is empty".to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| bad(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| bad(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults on first run.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)
                    .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Read a value by dotted path, e.g. `anti_snooze.interval_minutes`.
    pub fn get(&self, key: &str) -> Result<serde_json::Value> {
        let root = serde_json::to_value(self)?;
        Self::get_json_value_by_path(&root, key)
            .cloned()
            .ok_or_else(|| {
                ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "unknown config key".to_string(),
                }
                .into()
            })
    }

    /// Set a value by dotted path from its string form. The new value must
    /// match the existing field's JSON type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut root = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut root, key, value)?;
        *self = serde_json::from_value(root)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let cfg = Config::default();
        assert!(!cfg.anti_snooze.enabled);
        assert_eq!(cfg.anti_snooze.interval_minutes, 5);
        assert_eq!(cfg.anti_snooze.count, 2);
        assert_eq!(cfg.ring.escalation_interval_secs, 15);
        assert_eq!(cfg.ring.confirm_window_secs, 60);
        assert_eq!(cfg.holiday.cache_ttl_days, 7);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            "[anti_snooze]\nenabled = true\n[ui]\ntheme = \"light\"\n",
        )
        .unwrap();
        assert!(cfg.anti_snooze.enabled);
        assert_eq!(cfg.anti_snooze.interval_minutes, 5);
        assert_eq!(cfg.ui.theme, "light");
        assert_eq!(cfg.ui.language, "en");
        assert_eq!(cfg.ring.lookahead_days, 7);
    }

    #[test]
    fn get_and_set_by_dotted_path() {
        let mut cfg = Config::default();
        assert_eq!(
            cfg.get("anti_snooze.interval_minutes").unwrap(),
            serde_json::json!(5)
        );

        cfg.set("anti_snooze.interval_minutes", "10").unwrap();
        assert_eq!(cfg.anti_snooze.interval_minutes, 10);

        cfg.set("anti_snooze.enabled", "true").unwrap();
        assert!(cfg.anti_snooze.enabled);

        cfg.set("ui.theme", "light").unwrap();
        assert_eq!(cfg.ui.theme, "light");
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(cfg.set("anti_snooze.nope", "1").is_err());
        assert!(cfg.set("", "1").is_err());
        assert!(cfg.set("anti_snooze.enabled", "sometimes").is_err());
        assert!(cfg.set("ring.confirm_window_secs", "soon").is_err());
    }

    #[test]
    fn toml_round_trip_preserves_values() {
        let mut cfg = Config::default();
        cfg.anti_snooze.enabled = true;
        cfg.ring.escalation_interval_secs = 20;
        cfg.safety_notice_accepted = true;

        let text = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert!(back.anti_snooze.enabled);
        assert_eq!(back.ring.escalation_interval_secs, 20);
        assert!(back.safety_notice_accepted);
    }
}
