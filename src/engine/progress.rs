use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::content::Story;
use crate::engine::activity_key::ActivityKey;

/// One scene of a chapter as seen by progress accounting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneGate {
    pub key: ActivityKey,
    pub has_activity: bool,
}

/// Emitted when completion for a key actually changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressChange {
    Completed(ActivityKey),
    Reset(ActivityKey),
}

impl ProgressChange {
    pub fn key(self) -> ActivityKey {
        match self {
            ProgressChange::Completed(key) | ProgressChange::Reset(key) => key,
        }
    }
}

// --- Persisted Progress ---

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionProgress {
    #[serde(default)]
    pub completed: BTreeMap<ActivityKey, bool>,
    #[serde(default)]
    pub chapter_started: BTreeMap<usize, DateTime<Utc>>,
}

/// Summary shown when a learner finishes a chapter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChapterCompletion {
    /// Chapter number as shown to the learner. Chapter 0 is the introduction,
    /// so this equals the chapter's index in the story.
    pub chapter_number: usize,
    pub chapter_title: String,
    pub student_name: String,
    pub student_group: Option<String>,
    pub completed_at: DateTime<Utc>,
    pub duration_minutes: i64,
}

// --- Tracker ---

pub struct ProgressTracker {
    pub progress: CompletionProgress,
}

impl ProgressTracker {
    pub fn new(progress: CompletionProgress) -> Self {
        Self { progress }
    }

    pub fn is_completed(&self, key: ActivityKey) -> bool {
        self.progress.completed.get(&key).copied().unwrap_or(false)
    }

    pub fn mark_completed(&mut self, key: ActivityKey) -> Option<ProgressChange> {
        if self.is_completed(key) {
            return None;
        }
        self.progress.completed.insert(key, true);
        info!(target: "progress", %key, "activity completed");
        Some(ProgressChange::Completed(key))
    }

    pub fn reset(&mut self, key: ActivityKey) -> Option<ProgressChange> {
        self.progress.completed.remove(&key)?;
        info!(target: "progress", %key, "activity reset");
        Some(ProgressChange::Reset(key))
    }

    fn scene_satisfied(&self, gate: &SceneGate) -> bool {
        !gate.has_activity || self.is_completed(gate.key)
    }

    pub fn completed_scene_count(&self, scenes: &[SceneGate], introductory: bool) -> usize {
        if introductory {
            return scenes.len();
        }
        scenes.iter().filter(|g| self.scene_satisfied(g)).count()
    }

    /// Percentage of a chapter's scenes that are activity-less or solved.
    pub fn chapter_progress(&self, scenes: &[SceneGate], introductory: bool) -> f64 {
        if introductory {
            return 100.0;
        }
        if scenes.is_empty() {
            return 0.0;
        }
        let done = self.completed_scene_count(scenes, false);
        100.0 * done as f64 / scenes.len() as f64
    }

    pub fn overall_progress(&self, story: &Story) -> f64 {
        let mut total = 0;
        let mut done = 0;
        for (ci, chapter) in story.chapters.iter().enumerate() {
            let gates = story.scene_gates(ci);
            total += gates.len();
            done += self.completed_scene_count(&gates, chapter.introductory);
        }
        if total == 0 {
            return 0.0;
        }
        100.0 * done as f64 / total as f64
    }

    /// Record when the learner first entered a chapter. Later calls keep the
    /// original timestamp.
    pub fn note_chapter_started(&mut self, chapter: usize, now: DateTime<Utc>) -> bool {
        if self.progress.chapter_started.contains_key(&chapter) {
            return false;
        }
        self.progress.chapter_started.insert(chapter, now);
        debug!(target: "progress", chapter, "chapter started");
        true
    }

    pub fn chapter_completion(
        &self,
        story: &Story,
        chapter: usize,
        student_name: &str,
        student_group: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<ChapterCompletion> {
        let def = story.chapter(chapter)?;
        if def.introductory {
            return None;
        }
        if self.chapter_progress(&story.scene_gates(chapter), false) < 100.0 {
            return None;
        }
        let started = self
            .progress
            .chapter_started
            .get(&chapter)
            .copied()
            .unwrap_or(now);
        Some(ChapterCompletion {
            chapter_number: chapter,
            chapter_title: def.title.clone(),
            student_name: student_name.to_string(),
            student_group: student_group.map(str::to_string),
            completed_at: now,
            duration_minutes: (now - started).num_minutes().max(0),
        })
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(CompletionProgress::default())
    }
}
