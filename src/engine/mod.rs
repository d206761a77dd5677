pub mod activity_key;
pub mod glance;
pub mod progress;
pub mod view_mode;
pub mod word_board;

pub use activity_key::ActivityKey;
pub use glance::{GlanceConfig, GlanceState, LockTick};
pub use progress::{ProgressChange, ProgressTracker, SceneGate};
pub use view_mode::ExerciseViewMode;
pub use word_board::{CheckOutcome, WordBoard};
