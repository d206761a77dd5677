//! Story content: chapters of scenes, each scene optionally gated by a
//! fill-in-the-blank activity.
//!
//! Content is static data. It is parsed once, validated, and never mutated.

use std::fs;
use std::path::Path;

use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};

use crate::engine::activity_key::ActivityKey;
use crate::engine::progress::SceneGate;

#[derive(RustEmbed)]
#[folder = "assets/"]
struct BundledAssets;

const BUNDLED_STORY: &str = "story.json";

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to read story file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse story: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("bundled asset {0} is missing")]
    MissingAsset(&'static str),
    #[error("bundled asset {0} is not valid UTF-8")]
    InvalidUtf8(&'static str),
    #[error("story has no chapters")]
    NoChapters,
    #[error("activity {key} has no blanks")]
    NoBlanks { key: ActivityKey },
    #[error("activity {key} blank #{blank} has an empty correct word")]
    EmptyAnswer { key: ActivityKey, blank: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gloss {
    pub word: String,
    #[serde(default)]
    pub translation: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlankSlot {
    #[serde(alias = "correctWord")]
    pub correct_word: String,
    #[serde(default)]
    pub translation: String,
    #[serde(default)]
    pub hint: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SentencePart {
    Text { value: String },
    Blank(BlankSlot),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub parts: Vec<SentencePart>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default)]
    pub instructions: String,
    pub sentences: Vec<Sentence>,
}

impl Activity {
    /// Blanks in reading order. Their position in this sequence is the blank id
    /// used by the word board.
    pub fn blanks(&self) -> impl Iterator<Item = &BlankSlot> {
        self.sentences.iter().flat_map(|s| {
            s.parts.iter().filter_map(|p| match p {
                SentencePart::Blank(slot) => Some(slot),
                SentencePart::Text { .. } => None,
            })
        })
    }

    pub fn blank_count(&self) -> usize {
        self.blanks().count()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub text: Vec<Gloss>,
    #[serde(default)]
    pub activity: Option<Activity>,
}

impl Scene {
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for gloss in &self.text {
            let is_punct = gloss.word.chars().all(|c| c.is_ascii_punctuation());
            if !out.is_empty() && !is_punct {
                out.push(' ');
            }
            out.push_str(&gloss.word);
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    /// Introductory chapters are never gated and always count as complete.
    #[serde(default)]
    pub introductory: bool,
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub title: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub chapters: Vec<Chapter>,
}

fn default_language() -> String {
    "en-US".to_string()
}

impl Story {
    pub fn bundled() -> Result<Self, ContentError> {
        let file =
            BundledAssets::get(BUNDLED_STORY).ok_or(ContentError::MissingAsset(BUNDLED_STORY))?;
        let text =
            std::str::from_utf8(&file.data).map_err(|_| ContentError::InvalidUtf8(BUNDLED_STORY))?;
        Self::from_json(text)
    }

    pub fn load(path: &Path) -> Result<Self, ContentError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ContentError> {
        let story: Story = serde_json::from_str(text)?;
        story.validate()?;
        Ok(story)
    }

    fn validate(&self) -> Result<(), ContentError> {
        if self.chapters.is_empty() {
            return Err(ContentError::NoChapters);
        }
        for (ci, chapter) in self.chapters.iter().enumerate() {
            for (si, scene) in chapter.scenes.iter().enumerate() {
                let Some(activity) = &scene.activity else {
                    continue;
                };
                let key = ActivityKey::new(ci, si);
                if activity.blank_count() == 0 {
                    return Err(ContentError::NoBlanks { key });
                }
                if let Some(blank) = activity
                    .blanks()
                    .position(|b| b.correct_word.trim().is_empty())
                {
                    return Err(ContentError::EmptyAnswer { key, blank });
                }
            }
        }
        Ok(())
    }

    pub fn chapter(&self, index: usize) -> Option<&Chapter> {
        self.chapters.get(index)
    }

    pub fn scene(&self, key: ActivityKey) -> Option<&Scene> {
        self.chapter(key.chapter())?.scenes.get(key.scene())
    }

    pub fn activity(&self, key: ActivityKey) -> Option<&Activity> {
        self.scene(key)?.activity.as_ref()
    }

    pub fn has_activity(&self, key: ActivityKey) -> bool {
        self.activity(key).is_some()
    }

    pub fn scene_gates(&self, chapter: usize) -> Vec<SceneGate> {
        self.chapter(chapter)
            .map(|c| {
                c.scenes
                    .iter()
                    .enumerate()
                    .map(|(si, scene)| SceneGate {
                        key: ActivityKey::new(chapter, si),
                        has_activity: scene.activity.is_some(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Page number of a scene counted across all gated chapters. Introductory
    /// chapters are unnumbered.
    pub fn global_scene_number(&self, key: ActivityKey) -> Option<usize> {
        let chapter = self.chapter(key.chapter())?;
        if chapter.introductory || key.scene() >= chapter.scenes.len() {
            return None;
        }
        let before: usize = self.chapters[..key.chapter()]
            .iter()
            .filter(|c| !c.introductory)
            .map(|c| c.scenes.len())
            .sum();
        Some(before + key.scene() + 1)
    }
}
