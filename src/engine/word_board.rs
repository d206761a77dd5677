//! Drag-and-drop blank filling.
//!
//! Words move between the bank and the blanks but are never created or lost:
//! the bank plus every placed word is always the multiset of correct words.

use std::borrow::Cow;

use icu_normalizer::ComposingNormalizerBorrowed;
use rand::Rng;
use rand::seq::SliceRandom;
use rust_i18n::t;

use crate::content::{Activity, SentencePart};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("there is no blank #{0}")]
    UnknownBlank(usize),
    #[error("\"{0}\" is not in the word bank")]
    NotInBank(String),
    #[error("blank #{0} is empty")]
    EmptyBlank(usize),
    #[error("the exercise is already solved")]
    Solved,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    pub correct_word: String,
    pub translation: String,
    pub hint: Option<String>,
    pub placed: Option<String>,
}

impl Slot {
    pub fn is_correct(&self) -> bool {
        self.placed
            .as_deref()
            .is_some_and(|w| same_word(w, &self.correct_word))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    Solved,
    EmptyBlank {
        blank: usize,
    },
    WrongWord {
        blank: usize,
        word: String,
        translation: String,
        hint: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Feedback {
    pub message: String,
    pub hint: Option<String>,
}

impl CheckOutcome {
    pub fn is_solved(&self) -> bool {
        matches!(self, CheckOutcome::Solved)
    }

    pub fn feedback(&self, locale: &str) -> Feedback {
        match self {
            CheckOutcome::Solved => Feedback {
                message: t!("feedback.solved", locale = locale).to_string(),
                hint: None,
            },
            CheckOutcome::EmptyBlank { .. } => Feedback {
                message: t!("feedback.empty_blank", locale = locale).to_string(),
                hint: Some(t!("feedback.empty_blank_hint", locale = locale).to_string()),
            },
            CheckOutcome::WrongWord {
                word,
                translation,
                hint,
                ..
            } => Feedback {
                message: t!("feedback.wrong_word", locale = locale, word = word).to_string(),
                hint: Some(hint.clone().unwrap_or_else(|| {
                    t!(
                        "feedback.wrong_word_hint",
                        locale = locale,
                        translation = translation
                    )
                    .to_string()
                })),
            },
        }
    }
}

fn normalized(word: &str) -> Cow<'_, str> {
    ComposingNormalizerBorrowed::new_nfc().normalize(word.trim())
}

/// Compare two words the way a learner would expect: surrounding whitespace
/// and Unicode composition differences are ignored.
pub fn same_word(a: &str, b: &str) -> bool {
    normalized(a) == normalized(b)
}

pub struct WordBoard {
    slots: Vec<Slot>,
    bank: Vec<String>,
    solved: bool,
}

impl WordBoard {
    pub fn new<R: Rng>(activity: &Activity, rng: &mut R) -> Self {
        let slots: Vec<Slot> = activity
            .blanks()
            .map(|b| Slot {
                correct_word: b.correct_word.clone(),
                translation: b.translation.clone(),
                hint: b.hint.clone(),
                placed: None,
            })
            .collect();
        let mut bank: Vec<String> = slots.iter().map(|s| s.correct_word.clone()).collect();
        bank.shuffle(rng);
        Self {
            slots,
            bank,
            solved: false,
        }
    }

    /// Board with every blank already holding its correct word, for showing
    /// the answers of a completed activity.
    pub fn solved(activity: &Activity) -> Self {
        let slots = activity
            .blanks()
            .map(|b| Slot {
                correct_word: b.correct_word.clone(),
                translation: b.translation.clone(),
                hint: b.hint.clone(),
                placed: Some(b.correct_word.clone()),
            })
            .collect();
        Self {
            slots,
            bank: Vec::new(),
            solved: true,
        }
    }

    pub fn bank(&self) -> &[String] {
        &self.bank
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    fn ensure_open(&self) -> Result<(), BoardError> {
        if self.solved {
            Err(BoardError::Solved)
        } else {
            Ok(())
        }
    }

    fn slot_mut(&mut self, blank: usize) -> Result<&mut Slot, BoardError> {
        self.slots
            .get_mut(blank)
            .ok_or(BoardError::UnknownBlank(blank))
    }

    /// Drop a bank word onto a blank. A word already sitting in that blank
    /// goes back to the bank and is returned.
    pub fn place(&mut self, word: &str, blank: usize) -> Result<Option<String>, BoardError> {
        self.ensure_open()?;
        if blank >= self.slots.len() {
            return Err(BoardError::UnknownBlank(blank));
        }
        let idx = self
            .bank
            .iter()
            .position(|w| w == word)
            .or_else(|| self.bank.iter().position(|w| same_word(w, word)))
            .ok_or_else(|| BoardError::NotInBank(word.to_string()))?;
        let taken = self.bank.remove(idx);
        let displaced = self.slot_mut(blank)?.placed.replace(taken);
        if let Some(prev) = &displaced {
            self.bank.push(prev.clone());
        }
        Ok(displaced)
    }

    /// Drag a placed word from one blank to another. Whatever occupied the
    /// target goes back to the bank.
    pub fn move_between(&mut self, from: usize, to: usize) -> Result<(), BoardError> {
        self.ensure_open()?;
        if to >= self.slots.len() {
            return Err(BoardError::UnknownBlank(to));
        }
        if self.slot_mut(from)?.placed.is_none() {
            return Err(BoardError::EmptyBlank(from));
        }
        if from == to {
            return Ok(());
        }
        let word = self.slots[from].placed.take();
        if let Some(prev) = std::mem::replace(&mut self.slots[to].placed, word) {
            self.bank.push(prev);
        }
        Ok(())
    }

    /// Click a filled blank to send its word back to the bank.
    pub fn remove(&mut self, blank: usize) -> Result<String, BoardError> {
        self.ensure_open()?;
        let word = self
            .slot_mut(blank)?
            .placed
            .take()
            .ok_or(BoardError::EmptyBlank(blank))?;
        self.bank.push(word.clone());
        Ok(word)
    }

    pub fn check(&mut self) -> CheckOutcome {
        if self.solved {
            return CheckOutcome::Solved;
        }
        for (blank, slot) in self.slots.iter().enumerate() {
            match &slot.placed {
                None => return CheckOutcome::EmptyBlank { blank },
                Some(word) if !same_word(word, &slot.correct_word) => {
                    return CheckOutcome::WrongWord {
                        blank,
                        word: word.clone(),
                        translation: slot.translation.clone(),
                        hint: slot.hint.clone(),
                    };
                }
                Some(_) => {}
            }
        }
        self.solved = true;
        CheckOutcome::Solved
    }

    /// Every word currently on the board, sorted.
    pub fn word_multiset(&self) -> Vec<String> {
        let mut words: Vec<String> = self
            .bank
            .iter()
            .cloned()
            .chain(self.slots.iter().filter_map(|s| s.placed.clone()))
            .collect();
        words.sort();
        words
    }

    /// Render each sentence with blanks shown as `[n:word]` or `[n:____]`.
    /// Once solved, empty blanks show the correct word.
    pub fn render(&self, activity: &Activity) -> Vec<String> {
        let mut blank = 0;
        activity
            .sentences
            .iter()
            .map(|sentence| {
                let mut line = String::new();
                for part in &sentence.parts {
                    match part {
                        SentencePart::Text { value } => line.push_str(value),
                        SentencePart::Blank(def) => {
                            let shown = match self.slots.get(blank).and_then(|s| s.placed.as_deref()) {
                                Some(word) => word.to_string(),
                                None if self.solved => def.correct_word.clone(),
                                None => "____".to_string(),
                            };
                            line.push_str(&format!("[{}:{}]", blank + 1, shown));
                            blank += 1;
                        }
                    }
                }
                line
            })
            .collect()
    }
}
