use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use tempfile::TempDir;

use readalong::app::{App, Command};
use readalong::config::Config;
use readalong::content::Story;
use readalong::engine::activity_key::ActivityKey;
use readalong::engine::glance::{GlanceConfig, LockTick};
use readalong::engine::progress::ProgressChange;
use readalong::engine::view_mode::ExerciseViewMode;
use readalong::session::clock::ManualClock;
use readalong::session::controller::ExerciseController;
use readalong::session::timer::TickSink;
use readalong::store::json_store::JsonStore;
use readalong::store::schema::StudentProfile;

const FIRST: ActivityKey = ActivityKey::new(1, 0);
const SECOND: ActivityKey = ActivityKey::new(1, 2);

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 14, 0, 0).unwrap()
}

fn quiet_sink() -> TickSink {
    Arc::new(|_: ActivityKey| true)
}

fn controller(dir: &TempDir, clock: &ManualClock) -> ExerciseController<ManualClock> {
    let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
    ExerciseController::new(
        GlanceConfig::default(),
        Duration::from_millis(20),
        clock.clone(),
        Some(store),
        quiet_sink(),
    )
}

#[test]
fn completion_survives_reload_and_reset_clears_it() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(start());

    {
        let mut c = controller(&dir, &clock);
        c.on_scene_changed(SECOND, true);
        assert!(c.open_exercise());
        assert_eq!(c.record_check(true), Some(ProgressChange::Completed(SECOND)));
        assert_eq!(c.record_check(true), None);
    }

    let mut c = controller(&dir, &clock);
    assert!(c.is_completed(SECOND));
    assert!(!c.is_completed(FIRST));

    c.on_scene_changed(SECOND, true);
    assert_eq!(c.view_mode(), ExerciseViewMode::Completed);
    assert_eq!(c.reset_activity(), Some(ProgressChange::Reset(SECOND)));
    drop(c);

    let c = controller(&dir, &clock);
    assert!(!c.is_completed(SECOND));
}

#[test]
fn lockout_follows_the_learner_across_sessions() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(start());

    {
        let mut c = controller(&dir, &clock);
        c.on_scene_changed(FIRST, true);
        assert!(c.open_exercise());
        assert!(c.toggle_view());
        assert_eq!(c.glance().remaining, 1);
        assert!(c.toggle_view());
        assert!(c.toggle_view());
        assert!(c.is_locked());
    }

    clock.advance(TimeDelta::seconds(20));
    let mut c = controller(&dir, &clock);
    c.on_scene_changed(FIRST, true);
    assert!(c.is_locked());
    assert_eq!(c.view_mode(), ExerciseViewMode::Locked);
    assert_eq!(c.lock_remaining_secs(), Some(40));
    assert_eq!(c.timer_key(), Some(FIRST));

    clock.advance(TimeDelta::seconds(40));
    assert_eq!(c.on_lock_tick(FIRST), Some(LockTick::Unlocked));
    assert_eq!(c.glance().remaining, 2);
    assert_eq!(c.view_mode(), ExerciseViewMode::ExerciseActive);
}

#[test]
fn leaving_and_returning_does_not_refill_glances() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(start());
    let mut c = controller(&dir, &clock);

    c.on_scene_changed(FIRST, true);
    assert!(c.open_exercise());
    assert!(c.toggle_view());
    c.on_scene_changed(ActivityKey::new(1, 1), false);
    c.on_scene_changed(FIRST, true);
    assert_eq!(c.glance().remaining, 1);
}

#[test]
fn expired_lock_in_storage_loads_fresh() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::new(start());
    {
        let mut c = controller(&dir, &clock);
        c.on_scene_changed(FIRST, true);
        c.open_exercise();
        c.toggle_view();
        c.toggle_view();
        c.toggle_view();
    }

    clock.advance(TimeDelta::minutes(5));
    let mut c = controller(&dir, &clock);
    c.on_scene_changed(FIRST, true);
    assert!(!c.is_locked());
    assert_eq!(c.glance().remaining, 2);
    assert_eq!(c.timer_key(), None);
}

#[test]
fn full_chapter_through_the_app_reports_completion() {
    let dir = TempDir::new().unwrap();
    let store = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
    store
        .save_student(&StudentProfile {
            id: "ana".to_string(),
            name: "Ana".to_string(),
            group: Some("3B".to_string()),
        })
        .unwrap();

    let clock = ManualClock::new(start());
    let config = Config {
        locale: "en".to_string(),
        ..Config::default()
    };
    let mut app = App::new(Story::bundled().unwrap(), &config, clock.clone(), Some(store), quiet_sink());

    app.handle(Command::Chapter(1));
    app.handle(Command::Exercise);
    for (word, blank) in [("boy", 0), ("lived", 1), ("village", 2)] {
        app.handle(Command::Place {
            word: word.to_string(),
            blank,
        });
    }
    app.handle(Command::Check);
    app.handle(Command::Next);
    app.handle(Command::Next);
    assert_eq!(app.current(), SECOND);

    clock.advance(TimeDelta::minutes(12));
    app.handle(Command::Exercise);
    app.handle(Command::Place {
        word: "cold".to_string(),
        blank: 0,
    });
    app.handle(Command::Place {
        word: "night".to_string(),
        blank: 1,
    });
    let out = app.handle(Command::Check);
    assert!(out.iter().any(|l| l.contains("Ana") && l.contains("12 minutes")));
    assert!(out.iter().any(|l| l.contains("chapter 1: The Village")));
    assert!(app.render()[0].starts_with("Chapter 1: The Village"));

    let reloaded = JsonStore::with_base_dir(dir.path().to_path_buf()).unwrap();
    let progress = reloaded.load_progress();
    assert_eq!(progress.completion.completed.get(&FIRST), Some(&true));
    assert_eq!(progress.completion.completed.get(&SECOND), Some(&true));
}

#[test]
fn export_then_import_into_another_student() {
    let source_dir = TempDir::new().unwrap();
    let target_dir = TempDir::new().unwrap();
    let clock = ManualClock::new(start());
    {
        let mut c = controller(&source_dir, &clock);
        c.on_scene_changed(FIRST, true);
        c.open_exercise();
        c.record_check(true);
    }

    let source = JsonStore::with_base_dir(source_dir.path().to_path_buf()).unwrap();
    let exported = source.export_all();
    let target = JsonStore::with_base_dir(target_dir.path().to_path_buf()).unwrap();
    target.import_all(&exported).unwrap();

    let c = controller(&target_dir, &clock);
    assert!(c.is_completed(FIRST));
}
