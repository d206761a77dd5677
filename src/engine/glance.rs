//! Metered peeks at the reference text while an exercise is active.
//!
//! Every switch from the exercise to the reference text spends one glance.
//! Spending the last one engages a lockout; while locked, toggling is
//! rejected. When the lockout expires the allowance refills and the learner
//! is sent back to the exercise.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlanceConfig {
    pub max_glances: u32,
    pub lock_duration: TimeDelta,
}

impl Default for GlanceConfig {
    fn default() -> Self {
        Self {
            max_glances: 2,
            lock_duration: TimeDelta::seconds(60),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlanceState {
    pub remaining: u32,
    pub locked_until: Option<DateTime<Utc>>,
    /// True while the reference text is shown instead of the exercise.
    pub showing_reference: bool,
}

/// Result of one countdown step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockTick {
    /// No lock is pending.
    Idle,
    Counting { remaining_secs: i64 },
    /// The lock just expired; the exercise view should come back.
    Unlocked,
}

impl GlanceState {
    pub fn fresh(config: &GlanceConfig) -> Self {
        Self {
            remaining: config.max_glances,
            locked_until: None,
            showing_reference: false,
        }
    }

    /// Fresh allowance with the reference text visible. Used once an activity
    /// is solved so its answers can be inspected.
    pub fn completed(config: &GlanceConfig) -> Self {
        Self {
            showing_reference: true,
            ..Self::fresh(config)
        }
    }

    /// Rebuild state from a persisted record. An expired lock, or an empty
    /// allowance with no live lock, comes back as fresh.
    pub fn restore(
        config: &GlanceConfig,
        remaining: u32,
        locked_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        match locked_until {
            Some(until) if until > now => Self {
                remaining: 0,
                locked_until: Some(until),
                showing_reference: true,
            },
            _ if remaining == 0 => Self::fresh(config),
            _ => Self {
                remaining: remaining.min(config.max_glances),
                locked_until: None,
                showing_reference: false,
            },
        }
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    pub fn is_fresh(&self, config: &GlanceConfig) -> bool {
        self.remaining == config.max_glances && self.locked_until.is_none()
    }

    /// Switch between exercise and reference text. Returns false when the
    /// toggle was rejected.
    pub fn toggle_view(
        &mut self,
        is_completed: bool,
        now: DateTime<Utc>,
        config: &GlanceConfig,
    ) -> bool {
        if is_completed || self.is_locked(now) {
            return false;
        }
        self.refill_if_expired(now, config);
        if self.showing_reference {
            self.showing_reference = false;
            return true;
        }

        self.remaining = self.remaining.saturating_sub(1);
        self.showing_reference = true;
        if self.remaining == 0 {
            let until = now + config.lock_duration;
            self.locked_until = Some(until);
            info!(target: "glance", %until, "glances exhausted, exercise locked");
        } else {
            debug!(target: "glance", remaining = self.remaining, "glance spent");
        }
        true
    }

    /// Apply an elapsed lock without waiting for the next tick: the allowance
    /// refills and the exercise is shown again. Returns true when a lock was
    /// cleared.
    pub fn refill_if_expired(&mut self, now: DateTime<Utc>, config: &GlanceConfig) -> bool {
        match self.locked_until {
            Some(until) if now >= until => {
                *self = Self::fresh(config);
                info!(target: "glance", "lock expired");
                true
            }
            _ => false,
        }
    }

    pub fn tick(&mut self, now: DateTime<Utc>, config: &GlanceConfig) -> LockTick {
        let Some(until) = self.locked_until else {
            return LockTick::Idle;
        };
        if self.refill_if_expired(now, config) {
            return LockTick::Unlocked;
        }
        LockTick::Counting {
            remaining_secs: ceil_secs(until - now),
        }
    }

    /// Whole seconds left on a live lock, rounded up.
    pub fn lock_remaining_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        self.locked_until
            .filter(|until| *until > now)
            .map(|until| ceil_secs(until - now))
    }
}

fn ceil_secs(delta: TimeDelta) -> i64 {
    (delta.num_milliseconds() + 999) / 1000
}

/// `mm:ss` countdown label.
pub fn format_countdown(remaining_secs: i64) -> String {
    let secs = remaining_secs.max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fresh_state() {
        let cfg = GlanceConfig::default();
        let state = GlanceState::fresh(&cfg);
        assert_eq!(state.remaining, 2);
        assert!(!state.is_locked(t0()));
        assert!(!state.showing_reference);
    }

    #[test]
    fn test_lockout_scenario() {
        let cfg = GlanceConfig {
            max_glances: 2,
            lock_duration: TimeDelta::seconds(60),
        };
        let now = t0();
        let mut state = GlanceState::fresh(&cfg);

        assert!(state.toggle_view(false, now, &cfg));
        assert_eq!(state.remaining, 1);
        assert!(!state.is_locked(now));

        assert!(state.toggle_view(false, now, &cfg));
        assert_eq!(state.remaining, 1);
        assert!(!state.showing_reference);

        assert!(state.toggle_view(false, now, &cfg));
        assert_eq!(state.remaining, 0);
        assert_eq!(state.locked_until, Some(now + TimeDelta::seconds(60)));

        let before = state;
        assert!(!state.toggle_view(false, now, &cfg));
        assert_eq!(state, before);

        assert_eq!(
            state.tick(now + TimeDelta::seconds(59), &cfg),
            LockTick::Counting { remaining_secs: 1 }
        );
        assert!(state.is_locked(now + TimeDelta::seconds(59)));

        assert_eq!(state.tick(now + TimeDelta::seconds(60), &cfg), LockTick::Unlocked);
        assert_eq!(state.remaining, 2);
        assert!(!state.is_locked(now + TimeDelta::seconds(60)));
        assert!(!state.showing_reference);
    }

    #[test]
    fn test_toggle_after_expiry_refills_before_tick() {
        let cfg = GlanceConfig::default();
        let now = t0();
        let mut state = GlanceState::fresh(&cfg);
        state.toggle_view(false, now, &cfg);
        state.toggle_view(false, now, &cfg);
        state.toggle_view(false, now, &cfg);
        assert!(state.is_locked(now));

        let later = now + TimeDelta::seconds(60);
        assert!(state.toggle_view(false, later, &cfg));
        assert_eq!(state.remaining, cfg.max_glances - 1);
        assert!(state.showing_reference);
        assert_eq!(state.locked_until, None);

        assert!(state.toggle_view(false, later, &cfg));
        assert!(!state.showing_reference);
        assert_eq!(state.remaining, cfg.max_glances - 1);
        assert!(!state.is_locked(later));
        assert_eq!(state.tick(later, &cfg), LockTick::Idle);
    }

    #[test]
    fn test_refill_leaves_live_lock_alone() {
        let cfg = GlanceConfig::default();
        let now = t0();
        let mut state = GlanceState::restore(&cfg, 0, Some(now + TimeDelta::seconds(5)), now);
        let before = state;
        assert!(!state.refill_if_expired(now, &cfg));
        assert_eq!(state, before);
        assert!(state.refill_if_expired(now + TimeDelta::seconds(5), &cfg));
        assert_eq!(state, GlanceState::fresh(&cfg));
    }

    #[test]
    fn test_toggle_ignored_when_completed() {
        let cfg = GlanceConfig::default();
        let mut state = GlanceState::completed(&cfg);
        assert!(!state.toggle_view(true, t0(), &cfg));
        assert_eq!(state, GlanceState::completed(&cfg));
    }

    #[test]
    fn test_remaining_stays_in_range() {
        let cfg = GlanceConfig {
            max_glances: 3,
            lock_duration: TimeDelta::seconds(30),
        };
        let mut state = GlanceState::fresh(&cfg);
        let mut now = t0();
        for step in 0..200 {
            state.toggle_view(false, now, &cfg);
            assert!(state.remaining <= cfg.max_glances);
            if step % 7 == 0 {
                now += TimeDelta::seconds(11);
                state.tick(now, &cfg);
            }
            if state.is_locked(now) {
                assert_eq!(state.remaining, 0);
            }
        }
    }

    #[test]
    fn test_countdown_rounds_up() {
        let cfg = GlanceConfig::default();
        let now = t0();
        let mut state = GlanceState {
            remaining: 0,
            locked_until: Some(now + TimeDelta::milliseconds(1500)),
            showing_reference: true,
        };
        assert_eq!(state.lock_remaining_secs(now), Some(2));
        assert_eq!(state.tick(now, &cfg), LockTick::Counting { remaining_secs: 2 });
        assert_eq!(state.lock_remaining_secs(now + TimeDelta::seconds(2)), None);
    }

    #[test]
    fn test_tick_without_lock_is_idle() {
        let cfg = GlanceConfig::default();
        let mut state = GlanceState::fresh(&cfg);
        assert_eq!(state.tick(t0(), &cfg), LockTick::Idle);
    }

    #[test]
    fn test_restore_expired_lock_is_fresh() {
        let cfg = GlanceConfig::default();
        let now = t0();
        let state = GlanceState::restore(&cfg, 0, Some(now - TimeDelta::seconds(1)), now);
        assert_eq!(state, GlanceState::fresh(&cfg));
    }

    #[test]
    fn test_restore_live_lock_forces_zero() {
        let cfg = GlanceConfig::default();
        let now = t0();
        let until = now + TimeDelta::seconds(30);
        let state = GlanceState::restore(&cfg, 2, Some(until), now);
        assert_eq!(state.remaining, 0);
        assert!(state.is_locked(now));
    }

    #[test]
    fn test_restore_clamps_to_max() {
        let cfg = GlanceConfig::default();
        let state = GlanceState::restore(&cfg, 9, None, t0());
        assert_eq!(state.remaining, 2);
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown(61), "01:01");
        assert_eq!(format_countdown(0), "00:00");
        assert_eq!(format_countdown(-5), "00:00");
    }
}
