use crate::infrastructure::error::InfraError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const APP_JSON: &str = "app.json";
const SUPPORTED_SCHEMA: u64 = 1;

pub const DEFAULT_STORAGE_KEY: &str = "gwd-app-data";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub storage_key: String,
    pub focus_minutes: u32,
    pub break_minutes: u32,
    pub persist_debounce_ms: u64,
    pub focus_commit_threshold_seconds: u32,
    pub focus_commit_interval_seconds: u32,
    pub notification_display_ms: u64,
    pub day_check_interval_seconds: u64,
    pub tick_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            focus_minutes: 25,
            break_minutes: 5,
            persist_debounce_ms: 300,
            focus_commit_threshold_seconds: 30,
            focus_commit_interval_seconds: 30,
            notification_display_ms: 2000,
            day_check_interval_seconds: 60,
            tick_interval_ms: 1000,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), InfraError> {
        if self.storage_key.trim().is_empty() {
            return Err(InfraError::InvalidConfig(
                "storageKey must not be empty".to_string(),
            ));
        }
        let positive = [
            ("focusMinutes", u64::from(self.focus_minutes)),
            ("breakMinutes", u64::from(self.break_minutes)),
            ("persistDebounceMs", self.persist_debounce_ms),
            (
                "focusCommitThresholdSeconds",
                u64::from(self.focus_commit_threshold_seconds),
            ),
            (
                "focusCommitIntervalSeconds",
                u64::from(self.focus_commit_interval_seconds),
            ),
            ("notificationDisplayMs", self.notification_display_ms),
            ("dayCheckIntervalSeconds", self.day_check_interval_seconds),
            ("tickIntervalMs", self.tick_interval_ms),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(InfraError::InvalidConfig(format!("{name} must be > 0")));
            }
        }
        for (name, minutes) in [
            ("focusMinutes", self.focus_minutes),
            ("breakMinutes", self.break_minutes),
        ] {
            if minutes.checked_mul(60).is_none() {
                return Err(InfraError::InvalidConfig(format!(
                    "{name} is too large: {minutes}"
                )));
            }
        }
        Ok(())
    }

    pub fn focus_seconds(&self) -> u32 {
        self.focus_minutes.saturating_mul(60)
    }

    pub fn break_seconds(&self) -> u32 {
        self.break_minutes.saturating_mul(60)
    }

    pub fn persist_debounce(&self) -> Duration {
        Duration::from_millis(self.persist_debounce_ms)
    }

    pub fn notification_display(&self) -> Duration {
        Duration::from_millis(self.notification_display_ms)
    }
}

fn default_app_json() -> serde_json::Value {
    let defaults = AppConfig::default();
    serde_json::json!({
        "schema": SUPPORTED_SCHEMA,
        "storageKey": defaults.storage_key,
        "focusMinutes": defaults.focus_minutes,
        "breakMinutes": defaults.break_minutes,
        "persistDebounceMs": defaults.persist_debounce_ms,
        "focusCommitThresholdSeconds": defaults.focus_commit_threshold_seconds,
        "focusCommitIntervalSeconds": defaults.focus_commit_interval_seconds,
        "notificationDisplayMs": defaults.notification_display_ms,
        "dayCheckIntervalSeconds": defaults.day_check_interval_seconds,
        "tickIntervalMs": defaults.tick_interval_ms
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_json())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != SUPPORTED_SCHEMA {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let path = config_dir.join(APP_JSON);
    let mut raw = read_config(&path)?;
    if let Some(object) = raw.as_object_mut() {
        object.remove("schema");
    }
    let config: AppConfig = serde_json::from_value(raw)?;
    config.validate()?;
    Ok(config)
}
