use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::engine::glance::GlanceConfig;

pub const SUPPORTED_LOCALES: &[&str] = &["en", "es"];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_student_id")]
    pub student_id: String,
    #[serde(default = "default_max_glances")]
    pub max_glances: u32,
    #[serde(default = "default_lock_duration_secs")]
    pub lock_duration_secs: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default)]
    pub story_path: Option<String>,
}

fn default_student_id() -> String {
    "guest".to_string()
}
fn default_max_glances() -> u32 {
    2
}
fn default_lock_duration_secs() -> u64 {
    60
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_locale() -> String {
    "es".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            student_id: default_student_id(),
            max_glances: default_max_glances(),
            lock_duration_secs: default_lock_duration_secs(),
            tick_interval_ms: default_tick_interval_ms(),
            locale: default_locale(),
            voice: None,
            story_path: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("readalong")
            .join("config.toml")
    }

    /// Clamp numeric settings into usable ranges and fall back to the default
    /// locale when the configured one has no translations.
    pub fn validate(&mut self) {
        self.max_glances = self.max_glances.clamp(1, 10);
        self.lock_duration_secs = self.lock_duration_secs.clamp(1, 3600);
        self.tick_interval_ms = self.tick_interval_ms.clamp(100, 5000);
        if !SUPPORTED_LOCALES.contains(&self.locale.as_str()) {
            self.locale = default_locale();
        }
        if self.student_id.trim().is_empty() {
            self.student_id = default_student_id();
        }
    }

    pub fn glance_config(&self) -> GlanceConfig {
        GlanceConfig {
            max_glances: self.max_glances,
            lock_duration: TimeDelta::seconds(self.lock_duration_secs as i64),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}
