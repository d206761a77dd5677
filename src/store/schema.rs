use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::activity_key::ActivityKey;
use crate::engine::progress::CompletionProgress;

const SCHEMA_VERSION: u32 = 1;

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressData {
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub completion: CompletionProgress,
}

impl Default for ProgressData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            completion: CompletionProgress::default(),
        }
    }
}

impl ProgressData {
    pub fn needs_reset(&self) -> bool {
        self.schema_version != SCHEMA_VERSION
    }
}

/// Persisted glance allowance for one activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlanceRecord {
    pub chapter_index: usize,
    pub scene_index: usize,
    pub count: u32,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub lock_until: Option<DateTime<Utc>>,
}

impl GlanceRecord {
    pub fn key(&self) -> ActivityKey {
        ActivityKey::new(self.chapter_index, self.scene_index)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlanceData {
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub records: Vec<GlanceRecord>,
}

impl Default for GlanceData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            records: Vec::new(),
        }
    }
}

impl GlanceData {
    pub fn get(&self, key: ActivityKey) -> Option<&GlanceRecord> {
        self.records.iter().find(|r| r.key() == key)
    }

    pub fn upsert(&mut self, record: GlanceRecord) {
        match self.records.iter_mut().find(|r| r.key() == record.key()) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    pub fn remove(&mut self, key: ActivityKey) {
        self.records.retain(|r| r.key() != key);
    }
}

pub const FONT_SIZES: &[&str] = &["small", "medium", "large"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesData {
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    #[serde(default = "default_font_size_index")]
    pub font_size_index: usize,
}

fn default_font_size_index() -> usize {
    FONT_SIZES.len() - 1
}

impl Default for PreferencesData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            font_size_index: default_font_size_index(),
        }
    }
}

impl PreferencesData {
    pub fn font_size(&self) -> &'static str {
        FONT_SIZES
            .get(self.font_size_index)
            .copied()
            .unwrap_or(FONT_SIZES[0])
    }

    pub fn increase_font(&mut self) {
        self.font_size_index = (self.font_size_index + 1).min(FONT_SIZES.len() - 1);
    }

    pub fn decrease_font(&mut self) {
        self.font_size_index = self.font_size_index.min(FONT_SIZES.len() - 1).saturating_sub(1);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub group: Option<String>,
}

impl Default for StudentProfile {
    fn default() -> Self {
        Self {
            id: "guest".to_string(),
            name: "Guest".to_string(),
            group: None,
        }
    }
}

pub const EXPORT_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportData {
    pub readalong_export_version: u32,
    pub exported_at: DateTime<Utc>,
    pub student: StudentProfile,
    pub progress: ProgressData,
    pub glances: GlanceData,
    pub preferences: PreferencesData,
}
