use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use readalong::app::{App, chapter_summary};
use readalong::config::Config;
use readalong::content::Story;
use readalong::engine::progress::ProgressTracker;
use readalong::event::{AppEvent, EventHandler};
use readalong::session::clock::SystemClock;
use readalong::store::json_store::JsonStore;
use readalong::store::schema::{ExportData, StudentProfile};
use readalong::telemetry;

#[derive(Parser)]
#[command(
    name = "readalong",
    version,
    about = "Interactive storybook with gated fill-in-the-blank exercises"
)]
struct Cli {
    #[arg(short, long, help = "Student id (selects the progress directory)")]
    student: Option<String>,

    #[arg(long, help = "Story JSON file (defaults to the bundled story)")]
    story: Option<PathBuf>,

    #[arg(short, long, help = "Feedback language (en, es)")]
    locale: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Read the story and solve its exercises (default)
    Play,
    /// Print completion per chapter
    Status,
    /// Write all saved data for the student to a JSON file
    Export { path: PathBuf },
    /// Replace the student's saved data with an export file
    Import { path: PathBuf },
    /// Set the name and group shown on chapter completion reports and make
    /// this student the default
    Register {
        name: String,
        #[arg(short, long)]
        group: Option<String>,
    },
}

fn main() -> Result<()> {
    telemetry::init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(student) = cli.student {
        config.student_id = student;
    }
    if let Some(locale) = cli.locale {
        config.locale = locale;
    }
    if let Some(story) = &cli.story {
        config.story_path = Some(story.display().to_string());
    }
    config.validate();
    rust_i18n::set_locale(&config.locale);

    let store = JsonStore::new(&config.student_id)?;
    info!(student = %config.student_id, dir = %store.base_dir().display(), "opened store");

    match cli.command.unwrap_or(Command::Play) {
        Command::Play => play(&config, store),
        Command::Status => status(&config, &store),
        Command::Export { path } => export(&store, &path),
        Command::Import { path } => import(&store, &path),
        Command::Register { name, group } => {
            let profile = StudentProfile {
                id: config.student_id.clone(),
                name,
                group,
            };
            store.save_student(&profile)?;
            config.save()?;
            println!(
                "Registered {} ({}); settings saved to {}",
                profile.name,
                profile.id,
                Config::config_path().display()
            );
            Ok(())
        }
    }
}

fn load_story(config: &Config) -> Result<Story> {
    let story = match &config.story_path {
        Some(path) => Story::load(Path::new(path))
            .with_context(|| format!("loading story from {path}"))?,
        None => Story::bundled()?,
    };
    Ok(story)
}

fn play(config: &Config, store: JsonStore) -> Result<()> {
    let story = load_story(config)?;
    let events = EventHandler::new();
    let mut app = App::new(story, config, SystemClock, Some(store), events.tick_sink());

    print_lines(&app.render())?;
    loop {
        let lines = match events.next()? {
            AppEvent::Line(line) => app.handle_line(&line),
            AppEvent::LockTick(key) => app.handle_tick(key),
            AppEvent::InputClosed => {
                app.controller.dispose();
                break;
            }
        };
        print_lines(&lines)?;
        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn print_lines(lines: &[String]) -> Result<()> {
    let mut out = io::stdout().lock();
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

fn status(config: &Config, store: &JsonStore) -> Result<()> {
    let story = load_story(config)?;
    let tracker = ProgressTracker::new(store.load_progress().completion);
    println!(
        "{}: {:.0}% overall",
        story.title,
        tracker.overall_progress(&story)
    );
    print_lines(&chapter_summary(&story, &tracker))
}

fn export(store: &JsonStore, path: &Path) -> Result<()> {
    let data = store.export_all();
    let json = serde_json::to_string_pretty(&data)?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    println!("Exported to {}", path.display());
    Ok(())
}

fn import(store: &JsonStore, path: &Path) -> Result<()> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let data: ExportData = serde_json::from_str(&content)?;
    store.import_all(&data)?;
    println!("Imported data for {}", data.student.name);
    Ok(())
}
