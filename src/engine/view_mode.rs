use chrono::{DateTime, Utc};

use crate::engine::glance::GlanceState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExerciseViewMode {
    /// No activity on this scene, or the learner has not opened it yet.
    Hidden,
    ExerciseActive,
    ReferenceVisible,
    Completed,
    Locked,
}

impl ExerciseViewMode {
    pub fn derive(
        has_activity: bool,
        is_completed: bool,
        show_exercise: bool,
        glance: &GlanceState,
        now: DateTime<Utc>,
    ) -> Self {
        if !has_activity {
            ExerciseViewMode::Hidden
        } else if is_completed {
            ExerciseViewMode::Completed
        } else if glance.is_locked(now) {
            ExerciseViewMode::Locked
        } else if !show_exercise {
            ExerciseViewMode::Hidden
        } else if glance.showing_reference {
            ExerciseViewMode::ReferenceVisible
        } else {
            ExerciseViewMode::ExerciseActive
        }
    }

    /// Whether the word bank and blanks should be interactive.
    /// Whether the word board accepts moves and checks.
    pub fn exercise_visible(self) -> bool {
        self == ExerciseViewMode::ExerciseActive
    }
}
