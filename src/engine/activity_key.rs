use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifies the gated exercise attached to one scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActivityKey {
    chapter: usize,
    scene: usize,
}

impl ActivityKey {
    pub const fn new(chapter: usize, scene: usize) -> Self {
        Self { chapter, scene }
    }

    pub fn chapter(self) -> usize {
        self.chapter
    }

    pub fn scene(self) -> usize {
        self.scene
    }
}

impl fmt::Display for ActivityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.chapter, self.scene)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid activity key {0:?}, expected \"<chapter>-<scene>\"")]
pub struct ParseActivityKeyError(String);

impl FromStr for ActivityKey {
    type Err = ParseActivityKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseActivityKeyError(s.to_string());
        let (chapter, scene) = s.split_once('-').ok_or_else(err)?;
        let chapter = chapter.trim().parse().map_err(|_| err())?;
        let scene = scene.trim().parse().map_err(|_| err())?;
        Ok(Self::new(chapter, scene))
    }
}

impl TryFrom<String> for ActivityKey {
    type Error = ParseActivityKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ActivityKey> for String {
    fn from(key: ActivityKey) -> Self {
        key.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_display_matches_storage_form() {
        assert_eq!(ActivityKey::new(1, 2).to_string(), "1-2");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("1".parse::<ActivityKey>().is_err());
        assert!("a-b".parse::<ActivityKey>().is_err());
        assert!("-1-2".parse::<ActivityKey>().is_err());
        assert_eq!("3-0".parse::<ActivityKey>().unwrap(), ActivityKey::new(3, 0));
    }

    #[test]
    fn test_map_keys_serialize_as_strings() {
        let mut map = BTreeMap::new();
        map.insert(ActivityKey::new(0, 4), true);
        map.insert(ActivityKey::new(2, 1), true);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"0-4":true,"2-1":true}"#);

        let back: BTreeMap<ActivityKey, bool> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_ordering_is_chapter_then_scene() {
        assert!(ActivityKey::new(0, 9) < ActivityKey::new(1, 0));
        assert!(ActivityKey::new(1, 0) < ActivityKey::new(1, 1));
    }
}
