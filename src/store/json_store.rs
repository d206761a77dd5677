use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use chrono::Utc;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::store::schema::{
    EXPORT_VERSION, ExportData, GlanceData, PreferencesData, ProgressData, StudentProfile,
};

const PROGRESS_FILE: &str = "progress.json";
const GLANCES_FILE: &str = "glances.json";
const PREFERENCES_FILE: &str = "preferences.json";
const STUDENT_FILE: &str = "student.json";

/// Per-student document store. Each document is one JSON file inside the
/// student's directory.
#[derive(Clone, Debug)]
pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new(student_id: &str) -> Result<Self> {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("readalong")
            .join("students")
            .join(sanitize_id(student_id));
        Self::with_base_dir(base_dir)
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Missing or unreadable documents load as their default.
    fn load<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        let path = self.file_path(name);
        if !path.exists() {
            return T::default();
        }
        let parsed: Result<T> = fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|content| Ok(serde_json::from_str(&content)?));
        match parsed {
            Ok(value) => value,
            Err(e) => {
                warn!(target: "store", file = name, error = %e, "discarding unreadable document");
                T::default()
            }
        }
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let path = self.file_path(name);
        let tmp_path = path.with_extension("tmp");

        let json = serde_json::to_string_pretty(data)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        debug!(target: "store", file = name, "saved");
        Ok(())
    }

    pub fn load_progress(&self) -> ProgressData {
        let data: ProgressData = self.load(PROGRESS_FILE);
        if data.needs_reset() {
            warn!(target: "store", version = data.schema_version, "progress schema mismatch, starting fresh");
            return ProgressData::default();
        }
        data
    }

    pub fn save_progress(&self, data: &ProgressData) -> Result<()> {
        self.save(PROGRESS_FILE, data)
    }

    pub fn load_glances(&self) -> GlanceData {
        self.load(GLANCES_FILE)
    }

    pub fn save_glances(&self, data: &GlanceData) -> Result<()> {
        self.save(GLANCES_FILE, data)
    }

    pub fn load_preferences(&self) -> PreferencesData {
        self.load(PREFERENCES_FILE)
    }

    pub fn save_preferences(&self, data: &PreferencesData) -> Result<()> {
        self.save(PREFERENCES_FILE, data)
    }

    pub fn load_student(&self) -> Option<StudentProfile> {
        let path = self.file_path(STUDENT_FILE);
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn save_student(&self, profile: &StudentProfile) -> Result<()> {
        self.save(STUDENT_FILE, profile)
    }

    pub fn export_all(&self) -> ExportData {
        ExportData {
            readalong_export_version: EXPORT_VERSION,
            exported_at: Utc::now(),
            student: self.load_student().unwrap_or_default(),
            progress: self.load_progress(),
            glances: self.load_glances(),
            preferences: self.load_preferences(),
        }
    }

    /// Stage every document as `.tmp`, then swap them in, keeping `.bak`
    /// copies of the originals until all renames succeeded.
    pub fn import_all(&self, data: &ExportData) -> Result<()> {
        if data.readalong_export_version != EXPORT_VERSION {
            bail!(
                "Unsupported export version: {} (expected {})",
                data.readalong_export_version,
                EXPORT_VERSION
            );
        }

        let files: Vec<(&str, String)> = vec![
            (STUDENT_FILE, serde_json::to_string_pretty(&data.student)?),
            (PROGRESS_FILE, serde_json::to_string_pretty(&data.progress)?),
            (GLANCES_FILE, serde_json::to_string_pretty(&data.glances)?),
            (
                PREFERENCES_FILE,
                serde_json::to_string_pretty(&data.preferences)?,
            ),
        ];

        let mut staged: Vec<PathBuf> = Vec::new();
        for (name, json) in &files {
            let tmp_path = self.file_path(name).with_extension("json.tmp");
            let written = (|| -> Result<()> {
                let mut file = fs::File::create(&tmp_path)?;
                file.write_all(json.as_bytes())?;
                file.sync_all()?;
                Ok(())
            })();
            if let Err(e) = written {
                for tmp in &staged {
                    let _ = fs::remove_file(tmp);
                }
                bail!("Import failed during staging: {e}");
            }
            staged.push(tmp_path);
        }

        let mut committed: Vec<(PathBuf, PathBuf, bool)> = Vec::new();
        for (i, (name, _)) in files.iter().enumerate() {
            let final_path = self.file_path(name);
            let bak_path = final_path.with_extension("json.bak");
            let had_original = final_path.exists();

            let result = (|| -> Result<()> {
                if had_original {
                    fs::rename(&final_path, &bak_path)?;
                }
                fs::rename(&staged[i], &final_path)?;
                Ok(())
            })();

            if let Err(e) = result {
                if had_original && bak_path.exists() {
                    let _ = fs::rename(&bak_path, &final_path);
                }
                for (done_final, done_bak, done_had) in &committed {
                    if *done_had {
                        let _ = fs::rename(done_bak, done_final);
                    } else {
                        let _ = fs::remove_file(done_final);
                    }
                }
                for tmp in &staged[i..] {
                    let _ = fs::remove_file(tmp);
                }
                bail!("Import failed during commit: {e}");
            }
            committed.push((final_path, bak_path, had_original));
        }

        for (_, bak_path, had_original) in &committed {
            if *had_original {
                let _ = fs::remove_file(bak_path);
            }
        }
        Ok(())
    }
}

/// Student ids become directory names.
fn sanitize_id(id: &str) -> String {
    let cleaned: String = id
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "guest".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::activity_key::ActivityKey;
    use crate::store::schema::GlanceRecord;
    use tempfile::TempDir;

    fn make_test_store() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_missing_documents_load_as_default() {
        let (_dir, store) = make_test_store();
        assert_eq!(store.load_progress(), ProgressData::default());
        assert_eq!(store.load_glances(), GlanceData::default());
        assert_eq!(store.load_preferences(), PreferencesData::default());
        assert!(store.load_student().is_none());
    }

    #[test]
    fn test_corrupt_document_falls_back_to_default() {
        let (_dir, store) = make_test_store();
        fs::write(store.file_path(PROGRESS_FILE), "{ not json").unwrap();
        fs::write(store.file_path(GLANCES_FILE), "[1, 2, 3]").unwrap();
        assert_eq!(store.load_progress(), ProgressData::default());
        assert_eq!(store.load_glances(), GlanceData::default());
    }

    #[test]
    fn test_progress_schema_mismatch_resets() {
        let (_dir, store) = make_test_store();
        fs::write(
            store.file_path(PROGRESS_FILE),
            r#"{"schemaVersion": 99, "completion": {"completed": {"1-1": true}}}"#,
        )
        .unwrap();
        assert!(store.load_progress().completion.completed.is_empty());
    }

    #[test]
    fn test_save_leaves_no_tmp_files() {
        let (dir, store) = make_test_store();
        let mut progress = ProgressData::default();
        progress.completion.completed.insert(ActivityKey::new(1, 2), true);
        store.save_progress(&progress).unwrap();
        assert_eq!(store.load_progress(), progress);

        let tmp_files = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .count();
        assert_eq!(tmp_files, 0);
    }

    #[test]
    fn test_round_trip_export_import() {
        let (_dir, store) = make_test_store();
        store
            .save_student(&StudentProfile {
                id: "s-17".to_string(),
                name: "Ana".to_string(),
                group: Some("3B".to_string()),
            })
            .unwrap();
        let mut glances = GlanceData::default();
        glances.upsert(GlanceRecord {
            chapter_index: 1,
            scene_index: 0,
            count: 1,
            lock_until: None,
        });
        store.save_glances(&glances).unwrap();

        let export = store.export_all();
        let (_dir2, store2) = make_test_store();
        store2.import_all(&export).unwrap();

        assert_eq!(store2.load_student().unwrap().name, "Ana");
        assert_eq!(store2.load_glances(), glances);
        assert!(!store2.file_path("glances.json.bak").exists());
    }

    #[test]
    fn test_version_rejection() {
        let (_dir, store) = make_test_store();
        let mut export = store.export_all();
        export.readalong_export_version = 99;
        let err = store.import_all(&export).unwrap_err().to_string();
        assert!(err.contains("Unsupported export version"));
        assert!(err.contains("99"));
    }

    #[test]
    fn test_import_staging_failure_preserves_originals() {
        let (dir, store) = make_test_store();
        store.save_preferences(&PreferencesData::default()).unwrap();
        let original = fs::read_to_string(store.file_path(PREFERENCES_FILE)).unwrap();

        let bad_store = JsonStore {
            base_dir: dir.path().join("missing"),
        };
        let err = bad_store.import_all(&store.export_all()).unwrap_err();
        assert!(err.to_string().contains("Import failed during staging"));

        let after = fs::read_to_string(store.file_path(PREFERENCES_FILE)).unwrap();
        assert_eq!(original, after);
    }

    #[test]
    fn test_sanitize_id() {
        assert_eq!(sanitize_id("ana.lopez/3"), "ana_lopez_3");
        assert_eq!(sanitize_id("  "), "guest");
        assert_eq!(sanitize_id("s-17_b"), "s-17_b");
    }
}
