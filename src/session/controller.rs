//! Glue between completion tracking, the glance allowance, the lockout
//! countdown and persistence.
//!
//! The controller is the single writer of both persisted documents. The host
//! builds one per session and disposes it on exit; dropping it disposes too.

use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::activity_key::ActivityKey;
use crate::engine::glance::{GlanceConfig, GlanceState, LockTick};
use crate::engine::progress::{ProgressChange, ProgressTracker};
use crate::engine::view_mode::ExerciseViewMode;
use crate::session::clock::{Clock, SystemClock};
use crate::session::navigation::SceneStatus;
use crate::session::timer::{LockTimer, TickSink};
use crate::store::json_store::JsonStore;
use crate::store::schema::{GlanceData, GlanceRecord, ProgressData};

pub struct ExerciseController<C: Clock = SystemClock> {
    config: GlanceConfig,
    tick_interval: Duration,
    clock: C,
    store: Option<JsonStore>,
    tracker: ProgressTracker,
    glances: GlanceData,
    current: ActivityKey,
    has_activity: bool,
    show_exercise: bool,
    glance: GlanceState,
    timer: Option<LockTimer>,
    sink: TickSink,
}

impl<C: Clock> ExerciseController<C> {
    pub fn new(
        config: GlanceConfig,
        tick_interval: Duration,
        clock: C,
        store: Option<JsonStore>,
        sink: TickSink,
    ) -> Self {
        let (progress, glances) = match &store {
            Some(s) => (s.load_progress(), s.load_glances()),
            None => (ProgressData::default(), GlanceData::default()),
        };
        Self {
            glance: GlanceState::fresh(&config),
            config,
            tick_interval,
            clock,
            store,
            tracker: ProgressTracker::new(progress.completion),
            glances,
            current: ActivityKey::new(0, 0),
            has_activity: false,
            show_exercise: false,
            timer: None,
            sink,
        }
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    pub fn current(&self) -> ActivityKey {
        self.current
    }

    pub fn glance(&self) -> &GlanceState {
        &self.glance
    }

    pub fn config(&self) -> &GlanceConfig {
        &self.config
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    pub fn is_completed(&self, key: ActivityKey) -> bool {
        self.tracker.is_completed(key)
    }

    pub fn is_locked(&self) -> bool {
        self.glance.is_locked(self.clock.now())
    }

    pub fn lock_remaining_secs(&self) -> Option<i64> {
        self.glance.lock_remaining_secs(self.clock.now())
    }

    pub fn timer_key(&self) -> Option<ActivityKey> {
        self.timer.as_ref().map(LockTimer::key)
    }

    pub fn view_mode(&self) -> ExerciseViewMode {
        ExerciseViewMode::derive(
            self.has_activity,
            self.is_completed(self.current),
            self.show_exercise,
            &self.glance,
            self.clock.now(),
        )
    }

    pub fn scene_status(&self) -> SceneStatus {
        SceneStatus {
            has_activity: self.has_activity,
            completed: self.is_completed(self.current),
            locked: self.is_locked(),
            show_exercise: self.show_exercise,
        }
    }

    /// Glance state for `key` as persisted, or fresh when nothing usable is
    /// stored.
    pub fn initialize(&self, key: ActivityKey) -> GlanceState {
        match self.glances.get(key) {
            Some(record) => GlanceState::restore(
                &self.config,
                record.count,
                record.lock_until,
                self.clock.now(),
            ),
            None => GlanceState::fresh(&self.config),
        }
    }

    /// Move to another scene. The running timer is cancelled and the outgoing
    /// scene's allowance saved before the new scene's state is loaded.
    pub fn on_scene_changed(&mut self, key: ActivityKey, has_activity: bool) {
        self.cancel_timer();
        self.persist_glance();

        self.current = key;
        self.has_activity = has_activity;
        self.show_exercise = false;
        self.glance = if self.is_completed(key) {
            GlanceState::completed(&self.config)
        } else {
            self.initialize(key)
        };
        debug!(target: "glance", %key, remaining = self.glance.remaining, "scene entered");

        if self.tracker.note_chapter_started(key.chapter(), self.clock.now()) {
            self.persist_progress();
        }
        self.arm_timer_if_locked();
    }

    /// The learner pressed "show exercise". Rejected when there is nothing to
    /// show or the exercise is locked.
    pub fn open_exercise(&mut self) -> bool {
        self.clear_expired_lock();
        if !self.has_activity || self.is_completed(self.current) || self.is_locked() {
            return false;
        }
        self.show_exercise = true;
        self.glance.showing_reference = false;
        true
    }

    pub fn toggle_view(&mut self) -> bool {
        self.clear_expired_lock();
        if !self.has_activity || !self.show_exercise {
            return false;
        }
        let completed = self.is_completed(self.current);
        let changed = self
            .glance
            .toggle_view(completed, self.clock.now(), &self.config);
        if changed {
            self.persist_glance();
            self.arm_timer_if_locked();
        }
        changed
    }

    /// Apply one countdown tick. Ticks from a timer that no longer belongs to
    /// the current scene are ignored.
    pub fn on_lock_tick(&mut self, key: ActivityKey) -> Option<LockTick> {
        if key != self.current || self.timer_key() != Some(key) {
            debug!(target: "glance", %key, "ignoring stale tick");
            return None;
        }
        let tick = self.glance.tick(self.clock.now(), &self.config);
        match tick {
            LockTick::Unlocked => {
                self.cancel_timer();
                self.show_exercise = true;
                self.persist_glance();
            }
            LockTick::Idle => self.cancel_timer(),
            LockTick::Counting { .. } => {}
        }
        Some(tick)
    }

    /// Report the outcome of a "check" on the current exercise.
    pub fn record_check(&mut self, solved: bool) -> Option<ProgressChange> {
        if !solved || !self.has_activity {
            return None;
        }
        let key = self.current;
        let change = self.tracker.mark_completed(key);
        if change.is_some() {
            self.persist_progress();
        }
        self.on_activity_completed(key);
        change
    }

    /// A solved activity leaves the glance machine: any lock is dropped and
    /// the reference text becomes visible.
    pub fn on_activity_completed(&mut self, key: ActivityKey) {
        if self.timer_key() == Some(key) {
            self.cancel_timer();
        }
        self.glances.remove(key);
        if key == self.current {
            self.glance = GlanceState::completed(&self.config);
            self.show_exercise = true;
        }
        self.save_glances();
    }

    /// "Retry exercise": forget the solve and start with a full allowance.
    pub fn reset_activity(&mut self) -> Option<ProgressChange> {
        if !self.has_activity {
            return None;
        }
        self.cancel_timer();
        let change = self.tracker.reset(self.current);
        if change.is_some() {
            self.persist_progress();
        }
        self.glances.remove(self.current);
        self.glance = GlanceState::fresh(&self.config);
        self.show_exercise = true;
        self.save_glances();
        change
    }

    pub fn dispose(&mut self) {
        self.cancel_timer();
        self.persist_glance();
    }

    /// A lock that ran out between ticks is applied now, the same way
    /// `on_lock_tick` would apply it.
    fn clear_expired_lock(&mut self) {
        if !self.has_activity || !self.glance.refill_if_expired(self.clock.now(), &self.config) {
            return;
        }
        self.cancel_timer();
        self.show_exercise = true;
        self.persist_glance();
    }

    fn arm_timer_if_locked(&mut self) {
        if !self.is_locked() {
            return;
        }
        if self.timer_key() == Some(self.current) {
            return;
        }
        self.cancel_timer();
        self.timer = Some(LockTimer::start(
            self.current,
            self.tick_interval,
            self.sink.clone(),
        ));
    }

    fn cancel_timer(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.cancel();
        }
    }

    fn persist_glance(&mut self) {
        if !self.has_activity {
            return;
        }
        let key = self.current;
        if self.is_completed(key) || self.glance.is_fresh(&self.config) {
            self.glances.remove(key);
        } else {
            self.glances.upsert(GlanceRecord {
                chapter_index: key.chapter(),
                scene_index: key.scene(),
                count: self.glance.remaining,
                lock_until: self.glance.locked_until,
            });
        }
        self.save_glances();
    }

    fn save_glances(&self) {
        if let Some(store) = &self.store
            && let Err(e) = store.save_glances(&self.glances)
        {
            warn!(target: "store", error = %e, "failed to save glance state");
        }
    }

    fn persist_progress(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let data = ProgressData {
            completion: self.tracker.progress.clone(),
            ..ProgressData::default()
        };
        if let Err(e) = store.save_progress(&data) {
            warn!(target: "store", error = %e, "failed to save progress");
        }
    }
}

impl<C: Clock> Drop for ExerciseController<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}
