//! TOML-based application configuration.
//!
//! Stores the tunable engagement timings:
//! - Prompt delays and the scroll threshold
//! - Floating contact button triggers
//! - Default event list location
//!
//! Configuration is stored at `~/.config/studycenter/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::engagement::SchedulerConfig;
use crate::error::ConfigError;

/// Prompt trigger timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    /// Delay before the daily tip appears (ms since the visit started).
    #[serde(default = "default_daily_tip_delay_ms")]
    pub daily_tip_delay_ms: u64,
    /// Idle time before the newsletter prompt is requested.
    #[serde(default = "default_newsletter_idle_ms")]
    pub newsletter_idle_ms: u64,
    /// Scroll ratio (0..1) that must be exceeded to request the newsletter.
    #[serde(default = "default_scroll_threshold")]
    pub scroll_threshold: f64,
    /// Restart the idle countdown on user activity.
    #[serde(default)]
    pub reset_idle_on_activity: bool,
}

/// Floating contact button configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactButtonConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_contact_delay_ms")]
    pub delay_ms: u64,
    /// Vertical scroll offset in pixels that reveals the button early.
    #[serde(default = "default_contact_scroll_px")]
    pub scroll_px: f64,
}

/// Event calendar configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Event list used when the CLI is not given `--file`.
    #[serde(default)]
    pub events_file: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/studycenter/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub contact_button: ContactButtonConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
}

// Default functions
fn default_daily_tip_delay_ms() -> u64 {
    5_000
}
fn default_newsletter_idle_ms() -> u64 {
    15_000
}
fn default_scroll_threshold() -> f64 {
    0.70
}
fn default_contact_delay_ms() -> u64 {
    3_000
}
fn default_contact_scroll_px() -> f64 {
    100.0
}
fn default_true() -> bool {
    true
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            daily_tip_delay_ms: default_daily_tip_delay_ms(),
            newsletter_idle_ms: default_newsletter_idle_ms(),
            scroll_threshold: default_scroll_threshold(),
            reset_idle_on_activity: false,
        }
    }
}

impl Default for ContactButtonConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            delay_ms: default_contact_delay_ms(),
            scroll_px: default_contact_scroll_px(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompts: PromptsConfig::default(),
            contact_button: ContactButtonConfig::default(),
            calendar: CalendarConfig::default(),
        }
    }
}

impl Config {
    /// Top-level tables of `config.toml`.
    pub const TABLES: [&'static str; 3] = ["prompts", "contact_button", "calendar"];

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
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
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

    fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from disk or return (and write) the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing the default if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the default cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without persisting.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is not acceptable.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. Returns error if key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.prompts.scroll_threshold;
        // Scroll ratios never exceed 1.0.
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(ConfigError::InvalidValue {
                key: "prompts.scroll_threshold".into(),
                message: format!("{threshold} is outside (0, 1)"),
            });
        }
        if !(self.contact_button.scroll_px.is_finite() && self.contact_button.scroll_px >= 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "contact_button.scroll_px".into(),
                message: "must be a non-negative number".into(),
            });
        }
        Ok(())
    }

    /// Scheduler timings derived from this configuration.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            daily_tip_delay_ms: self.prompts.daily_tip_delay_ms,
            newsletter_idle_ms: self.prompts.newsletter_idle_ms,
            scroll_threshold: self.prompts.scroll_threshold,
            reset_idle_on_activity: self.prompts.reset_idle_on_activity,
            contact_button: self.contact_button.enabled.then_some(
                crate::engagement::ContactButtonTrigger {
                    delay_ms: self.contact_button.delay_ms,
                    scroll_px: self.contact_button.scroll_px,
                },
            ),
        }
    }

    /// Every leaf setting as `(table.key, value)`, in table order.
    pub fn entries(&self) -> Vec<(String, serde_json::Value)> {
        let Ok(json) = serde_json::to_value(self) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for table in Self::TABLES {
            if let Some(serde_json::Value::Object(fields)) = json.get(table) {
                for (field, value) in fields {
                    out.push((format!("{table}.{field}"), value.clone()));
                }
            }
        }
        out
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
