pub mod story;

pub use story::{Activity, BlankSlot, Chapter, ContentError, Gloss, Scene, Sentence, SentencePart, Story};
