use crate::content::Story;
use crate::engine::activity_key::ActivityKey;

/// What the current scene allows the learner to do next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneStatus {
    pub has_activity: bool,
    pub completed: bool,
    pub locked: bool,
    pub show_exercise: bool,
}

impl SceneStatus {
    fn satisfied(self) -> bool {
        !self.has_activity || self.completed
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavState {
    pub next_disabled: bool,
    pub next_chapter_available: bool,
    pub prev_disabled: bool,
    pub chapter_select_disabled: bool,
}

pub fn nav_state(story: &Story, key: ActivityKey, status: SceneStatus) -> NavState {
    let chapter = story.chapter(key.chapter());
    let scene_count = chapter.map(|c| c.scenes.len()).unwrap_or(0);
    let introductory = chapter.is_some_and(|c| c.introductory);
    let last_scene = key.scene() + 1 >= scene_count;

    NavState {
        next_disabled: !status.satisfied() || status.locked || (introductory && last_scene),
        next_chapter_available: last_scene
            && key.chapter() + 1 < story.chapters.len()
            && status.satisfied(),
        prev_disabled: key.chapter() == 0 && key.scene() == 0,
        chapter_select_disabled: status.has_activity && !status.completed && status.show_exercise,
    }
}

/// Position after pressing "next", if allowed. The last scene of a chapter
/// leads to the next chapter once it is satisfied.
pub fn advance(story: &Story, key: ActivityKey, status: SceneStatus) -> Option<ActivityKey> {
    let nav = nav_state(story, key, status);
    let scene_count = story.chapter(key.chapter())?.scenes.len();
    if key.scene() + 1 < scene_count {
        (!nav.next_disabled).then(|| ActivityKey::new(key.chapter(), key.scene() + 1))
    } else if nav.next_chapter_available {
        Some(ActivityKey::new(key.chapter() + 1, 0))
    } else {
        None
    }
}

pub fn retreat(story: &Story, key: ActivityKey) -> Option<ActivityKey> {
    if key.scene() > 0 {
        return Some(ActivityKey::new(key.chapter(), key.scene() - 1));
    }
    let prev = key.chapter().checked_sub(1)?;
    let scenes = story.chapter(prev)?.scenes.len();
    Some(ActivityKey::new(prev, scenes.saturating_sub(1)))
}

pub fn jump_to_chapter(story: &Story, chapter: usize) -> Option<ActivityKey> {
    story.chapter(chapter).map(|_| ActivityKey::new(chapter, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(has_activity: bool, completed: bool) -> SceneStatus {
        SceneStatus {
            has_activity,
            completed,
            locked: false,
            show_exercise: false,
        }
    }

    #[test]
    fn test_unsolved_activity_blocks_next() {
        let story = Story::bundled().unwrap();
        let key = ActivityKey::new(1, 0);
        assert!(nav_state(&story, key, open(true, false)).next_disabled);
        assert_eq!(advance(&story, key, open(true, false)), None);
        assert_eq!(
            advance(&story, key, open(true, true)),
            Some(ActivityKey::new(1, 1))
        );
    }

    #[test]
    fn test_lock_blocks_next() {
        let story = Story::bundled().unwrap();
        let status = SceneStatus {
            locked: true,
            ..open(false, false)
        };
        assert!(nav_state(&story, ActivityKey::new(1, 1), status).next_disabled);
    }

    #[test]
    fn test_intro_last_scene_uses_next_chapter() {
        let story = Story::bundled().unwrap();
        let key = ActivityKey::new(0, 1);
        let nav = nav_state(&story, key, open(false, false));
        assert!(nav.next_disabled);
        assert!(nav.next_chapter_available);
        assert_eq!(advance(&story, key, open(false, false)), Some(ActivityKey::new(1, 0)));
    }

    #[test]
    fn test_last_chapter_has_no_next_chapter() {
        let story = Story::bundled().unwrap();
        let last = story.chapters.len() - 1;
        let key = ActivityKey::new(last, story.chapters[last].scenes.len() - 1);
        assert!(!nav_state(&story, key, open(true, true)).next_chapter_available);
        assert_eq!(advance(&story, key, open(true, true)), None);
    }

    #[test]
    fn test_retreat_crosses_chapters() {
        let story = Story::bundled().unwrap();
        assert_eq!(retreat(&story, ActivityKey::new(0, 0)), None);
        assert_eq!(retreat(&story, ActivityKey::new(1, 0)), Some(ActivityKey::new(0, 1)));
        assert_eq!(retreat(&story, ActivityKey::new(1, 2)), Some(ActivityKey::new(1, 1)));
        assert!(nav_state(&story, ActivityKey::new(0, 0), open(false, false)).prev_disabled);
    }

    #[test]
    fn test_chapter_select_disabled_while_exercise_open() {
        let story = Story::bundled().unwrap();
        let status = SceneStatus {
            show_exercise: true,
            ..open(true, false)
        };
        assert!(nav_state(&story, ActivityKey::new(1, 0), status).chapter_select_disabled);
        assert_eq!(jump_to_chapter(&story, 2), Some(ActivityKey::new(2, 0)));
        assert_eq!(jump_to_chapter(&story, 9), None);
    }
}
