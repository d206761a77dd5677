use anyhow::{Result, bail};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rust_i18n::t;

use crate::config::Config;
use crate::content::Story;
use crate::engine::activity_key::ActivityKey;
use crate::engine::glance::{LockTick, format_countdown};
use crate::engine::progress::ProgressTracker;
use crate::engine::view_mode::ExerciseViewMode;
use crate::engine::word_board::{BoardError, WordBoard};
use crate::session::clock::{Clock, SystemClock};
use crate::session::controller::ExerciseController;
use crate::session::navigation::{self, nav_state};
use crate::session::speech::{LoggedSpeech, Speech, preferred_voice};
use crate::session::timer::TickSink;
use crate::store::json_store::JsonStore;
use crate::store::schema::{PreferencesData, StudentProfile};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Chapter(usize),
    Exercise,
    Toggle,
    Place { word: String, blank: usize },
    Move { from: usize, to: usize },
    Remove(usize),
    Check,
    Reset,
    Say(String),
    FontLarger,
    FontSmaller,
    Status,
    Help,
    Quit,
}

/// Blank numbers are typed 1-based and stored 0-based.
fn parse_blank(arg: Option<&str>) -> Result<usize> {
    let Some(arg) = arg else {
        bail!("missing blank number");
    };
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => bail!("invalid blank number {arg:?}"),
    }
}

impl Command {
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let Some(head) = parts.next() else {
            bail!("empty command");
        };
        let cmd = match head {
            "next" | "n" => Command::Next,
            "prev" | "p" => Command::Prev,
            "chapter" => {
                let arg = parts.next().unwrap_or_default();
                match arg.parse() {
                    Ok(n) => Command::Chapter(n),
                    Err(_) => bail!("invalid chapter {arg:?}"),
                }
            }
            "exercise" | "e" => Command::Exercise,
            "toggle" | "t" => Command::Toggle,
            "place" => {
                let Some(word) = parts.next() else {
                    bail!("usage: place <word> <blank>");
                };
                Command::Place {
                    word: word.to_string(),
                    blank: parse_blank(parts.next())?,
                }
            }
            "move" => Command::Move {
                from: parse_blank(parts.next())?,
                to: parse_blank(parts.next())?,
            },
            "remove" => Command::Remove(parse_blank(parts.next())?),
            "check" | "c" => Command::Check,
            "reset" => Command::Reset,
            "say" => {
                let rest: Vec<&str> = parts.collect();
                if rest.is_empty() {
                    bail!("usage: say <word>");
                }
                return Ok(Command::Say(rest.join(" ")));
            }
            "font" => match parts.next() {
                Some("+") => Command::FontLarger,
                Some("-") => Command::FontSmaller,
                _ => bail!("usage: font +|-"),
            },
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => bail!("unknown command {other:?} (try \"help\")"),
        };
        Ok(cmd)
    }
}

const HELP: &[&str] = &[
    "next | prev | chapter <n>      move through the story",
    "exercise                       open the exercise for this scene",
    "toggle                         switch between exercise and text (spends a glance)",
    "place <word> <blank>           drop a bank word into a blank",
    "move <from> <to>               move a placed word to another blank",
    "remove <blank>                 send a placed word back to the bank",
    "check                          check the answers",
    "reset                          retry a completed exercise",
    "say <word>                     hear a word and see its translation",
    "font + | font -                change the text size",
    "status | help | quit",
];

pub struct App<C: Clock = SystemClock> {
    pub story: Story,
    pub controller: ExerciseController<C>,
    pub board: Option<WordBoard>,
    pub speech: LoggedSpeech,
    pub preferences: PreferencesData,
    pub student: StudentProfile,
    store: Option<JsonStore>,
    locale: String,
    voice: Option<String>,
    rng: SmallRng,
    pub should_quit: bool,
}

impl<C: Clock> App<C> {
    pub fn new(
        story: Story,
        config: &Config,
        clock: C,
        store: Option<JsonStore>,
        sink: TickSink,
    ) -> Self {
        let controller = ExerciseController::new(
            config.glance_config(),
            config.tick_interval(),
            clock,
            store.clone(),
            sink,
        );
        let preferences = store
            .as_ref()
            .map(JsonStore::load_preferences)
            .unwrap_or_default();
        let student = store
            .as_ref()
            .and_then(JsonStore::load_student)
            .unwrap_or_default();

        let mut app = Self {
            story,
            controller,
            board: None,
            speech: LoggedSpeech::default(),
            preferences,
            student,
            store,
            locale: config.locale.clone(),
            voice: config.voice.clone(),
            rng: SmallRng::from_entropy(),
            should_quit: false,
        };
        app.enter(ActivityKey::new(0, 0));
        app
    }

    pub fn current(&self) -> ActivityKey {
        self.controller.current()
    }

    fn enter(&mut self, key: ActivityKey) {
        self.speech.cancel();
        let has_activity = self.story.has_activity(key);
        self.controller.on_scene_changed(key, has_activity);
        self.board = None;
        self.deal_board();
    }

    fn deal_board(&mut self) {
        let key = self.current();
        self.board = match self.story.activity(key) {
            Some(activity) if self.controller.is_completed(key) => {
                Some(WordBoard::solved(activity))
            }
            Some(activity) => Some(WordBoard::new(activity, &mut self.rng)),
            None => None,
        };
    }

    pub fn handle_line(&mut self, line: &str) -> Vec<String> {
        if line.trim().is_empty() {
            return Vec::new();
        }
        match Command::parse(line) {
            Ok(cmd) => self.handle(cmd),
            Err(e) => vec![e.to_string()],
        }
    }

    pub fn handle(&mut self, cmd: Command) -> Vec<String> {
        let status = self.controller.scene_status();
        let key = self.current();
        match cmd {
            Command::Next => match navigation::advance(&self.story, key, status) {
                Some(next) => {
                    self.enter(next);
                    self.render()
                }
                None => vec!["You cannot continue yet.".to_string()],
            },
            Command::Prev => match navigation::retreat(&self.story, key) {
                Some(prev) => {
                    self.enter(prev);
                    self.render()
                }
                None => vec!["This is the first scene.".to_string()],
            },
            Command::Chapter(n) => {
                if nav_state(&self.story, key, status).chapter_select_disabled {
                    return vec!["Finish or close the exercise before changing chapters.".to_string()];
                }
                match navigation::jump_to_chapter(&self.story, n) {
                    Some(start) => {
                        self.enter(start);
                        self.render()
                    }
                    None => vec![format!("There is no chapter {n}.")],
                }
            }
            Command::Exercise => {
                if self.controller.open_exercise() {
                    self.render_exercise()
                } else {
                    vec!["No exercise to open here.".to_string()]
                }
            }
            Command::Toggle => {
                if self.controller.toggle_view() {
                    self.render_exercise()
                } else {
                    vec!["The view cannot be switched right now.".to_string()]
                }
            }
            Command::Place { word, blank } => self.with_open_board(|b| b.place(&word, blank).map(|_| ())),
            Command::Move { from, to } => self.with_open_board(|b| b.move_between(from, to)),
            Command::Remove(blank) => self.with_open_board(|b| b.remove(blank).map(|_| ())),
            Command::Check => self.check(),
            Command::Reset => {
                if self.controller.reset_activity().is_some() {
                    self.deal_board();
                    self.render_exercise()
                } else {
                    vec!["Nothing to reset.".to_string()]
                }
            }
            Command::Say(word) => self.say(&word),
            Command::FontLarger => {
                self.preferences.increase_font();
                self.save_preferences()
            }
            Command::FontSmaller => {
                self.preferences.decrease_font();
                self.save_preferences()
            }
            Command::Status => self.render_status(),
            Command::Help => HELP.iter().map(|l| l.to_string()).collect(),
            Command::Quit => {
                self.should_quit = true;
                self.controller.dispose();
                Vec::new()
            }
        }
    }

    pub fn handle_tick(&mut self, key: ActivityKey) -> Vec<String> {
        match self.controller.on_lock_tick(key) {
            Some(LockTick::Counting { remaining_secs })
                if remaining_secs % 10 == 0 || remaining_secs <= 5 =>
            {
                vec![format_countdown(remaining_secs)]
            }
            Some(LockTick::Unlocked) => {
                let mut out = vec!["The exercise is unlocked.".to_string()];
                out.extend(self.render_exercise());
                out
            }
            _ => Vec::new(),
        }
    }

    fn with_open_board<F>(&mut self, f: F) -> Vec<String>
    where
        F: FnOnce(&mut WordBoard) -> Result<(), BoardError>,
    {
        if !self.controller.view_mode().exercise_visible() {
            return vec!["Open the exercise first.".to_string()];
        }
        let Some(board) = self.board.as_mut() else {
            return vec!["No exercise here.".to_string()];
        };
        match f(board) {
            Ok(()) => self.render_exercise(),
            Err(e) => vec![e.to_string()],
        }
    }

    fn check(&mut self) -> Vec<String> {
        if !self.controller.view_mode().exercise_visible() {
            return vec!["Open the exercise first.".to_string()];
        }
        let Some(board) = self.board.as_mut() else {
            return vec!["No exercise here.".to_string()];
        };
        let outcome = board.check();
        let feedback = outcome.feedback(&self.locale);
        let mut out = vec![feedback.message];
        out.extend(feedback.hint);

        if outcome.is_solved()
            && let Some(change) = self.controller.record_check(true)
        {
            let completion = self.controller.tracker().chapter_completion(
                &self.story,
                change.key().chapter(),
                &self.student.name,
                self.student.group.as_deref(),
                self.controller.now(),
            );
            if let Some(c) = completion {
                out.push(format!(
                    "Congratulations, {}! You finished chapter {}: {} in {} minutes.",
                    c.student_name, c.chapter_number, c.chapter_title, c.duration_minutes
                ));
            }
        }
        out
    }

    fn say(&mut self, word: &str) -> Vec<String> {
        let language = self.story.language.clone();
        let voice = preferred_voice(self.speech.voices(), &language, self.voice.as_deref())
            .map(|v| v.name.clone());
        self.speech.speak(word, &language, voice.as_deref());
        let gloss = self
            .story
            .scene(self.current())
            .and_then(|s| s.text.iter().find(|g| g.word.eq_ignore_ascii_case(word)));
        match gloss {
            Some(g) if !g.translation.is_empty() => vec![format!("{} = {}", g.word, g.translation)],
            _ => vec![format!("(no translation for {word:?} in this scene)")],
        }
    }

    fn save_preferences(&self) -> Vec<String> {
        let mut out = vec![format!("Text size: {}", self.preferences.font_size())];
        if let Some(store) = &self.store
            && let Err(e) = store.save_preferences(&self.preferences)
        {
            out.push(format!("Could not save preferences: {e}"));
        }
        out
    }

    pub fn render(&self) -> Vec<String> {
        let key = self.current();
        let mut out = Vec::new();
        if let Some(chapter) = self.story.chapter(key.chapter()) {
            let page = self
                .story
                .global_scene_number(key)
                .map(|n| format!(" - page {n}"))
                .unwrap_or_default();
            out.push(format!(
                "Chapter {}: {} (scene {}/{}){page}",
                key.chapter(),
                chapter.title,
                key.scene() + 1,
                chapter.scenes.len()
            ));
        }
        if let Some(scene) = self.story.scene(key) {
            out.push(scene.plain_text());
        }
        out.extend(self.render_exercise());
        out
    }

    pub fn render_exercise(&self) -> Vec<String> {
        let key = self.current();
        let Some(activity) = self.story.activity(key) else {
            return Vec::new();
        };
        let mode = self.controller.view_mode();
        let mut out = Vec::new();
        match mode {
            ExerciseViewMode::Hidden => {
                out.push("This scene has an exercise. Type \"exercise\" to open it.".to_string());
            }
            ExerciseViewMode::Completed => {
                out.push(t!("status.completed", locale = &self.locale).to_string());
                if let Some(board) = &self.board {
                    out.extend(board.render(activity));
                }
            }
            ExerciseViewMode::Locked => {
                let secs = self.controller.lock_remaining_secs().unwrap_or(0);
                let time = format_countdown(secs);
                out.push(t!("status.locked", locale = &self.locale, time = time).to_string());
            }
            ExerciseViewMode::ReferenceVisible => {
                if let Some(scene) = self.story.scene(key) {
                    out.push(scene.plain_text());
                }
                out.push(self.glances_left());
            }
            ExerciseViewMode::ExerciseActive => {
                out.push(activity.instructions.clone());
                if let Some(board) = &self.board {
                    out.extend(board.render(activity));
                    out.push(format!("Words: {}", board.bank().join("  ")));
                }
                out.push(self.glances_left());
            }
        }
        out
    }

    fn glances_left(&self) -> String {
        t!(
            "status.glances_left",
            locale = &self.locale,
            count = self.controller.glance().remaining
        )
        .to_string()
    }

    pub fn render_status(&self) -> Vec<String> {
        let tracker = self.controller.tracker();
        let mut out = vec![format!(
            "{} - {} ({:.0}% overall)",
            self.story.title,
            self.student.name,
            tracker.overall_progress(&self.story)
        )];
        out.extend(chapter_summary(&self.story, tracker));
        out
    }
}

/// One line per chapter: completed scenes and percentage.
pub fn chapter_summary(
    story: &Story,
    tracker: &ProgressTracker,
) -> Vec<String> {
    story
        .chapters
        .iter()
        .enumerate()
        .map(|(ci, chapter)| {
            let gates = story.scene_gates(ci);
            format!(
                "Chapter {ci}: {}/{} completed ({:.0}%)",
                tracker.completed_scene_count(&gates, chapter.introductory),
                gates.len(),
                tracker.chapter_progress(&gates, chapter.introductory)
            )
        })
        .collect()
}
