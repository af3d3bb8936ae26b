use crate::domain::models::User;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;

pub const DEFAULT_COMMIT_THRESHOLD_SECONDS: u32 = 30;
pub const DEFAULT_COMMIT_INTERVAL_SECONDS: u32 = 30;

/// Focus seconds counted since the last commit. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusAccumulator {
    pending_seconds: u32,
    last_commit_at: DateTime<Utc>,
    threshold_seconds: u32,
    interval: Duration,
}

impl FocusAccumulator {
    pub fn new(now: DateTime<Utc>, threshold_seconds: u32, interval_seconds: u32) -> Self {
        Self {
            pending_seconds: 0,
            last_commit_at: now,
            threshold_seconds,
            interval: Duration::seconds(i64::from(interval_seconds)),
        }
    }

    pub fn pending_seconds(&self) -> u32 {
        self.pending_seconds
    }

    pub fn record(&mut self, seconds: u32) {
        self.pending_seconds = self.pending_seconds.saturating_add(seconds);
    }

    /// Threshold or elapsed-time trigger. Nothing is due while empty.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.pending_seconds > 0
            && (self.pending_seconds >= self.threshold_seconds
                || now - self.last_commit_at >= self.interval)
    }

    pub fn take(&mut self, now: DateTime<Utc>) -> u32 {
        self.last_commit_at = now;
        std::mem::take(&mut self.pending_seconds)
    }

    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.pending_seconds = 0;
        self.last_commit_at = now;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FocusCommit {
    pub seconds: u32,
    pub minutes_credited: u32,
    pub minutes_credited_today: u32,
    pub new_day: bool,
}

/// Folds `seconds` of focus time into the user's lifetime and daily totals,
/// carrying whole minutes out of the 0..60 second remainders.
pub fn commit_focus_seconds<Tz: TimeZone>(
    user: &mut User,
    seconds: u32,
    now: DateTime<Utc>,
    tz: &Tz,
) -> FocusCommit {
    let new_day = user.begin_stats_update(now, tz);

    let total_seconds = user.focus_seconds.saturating_add(seconds);
    let minutes_credited = total_seconds / 60;
    user.total_focus_minutes = user.total_focus_minutes.saturating_add(minutes_credited);
    user.focus_seconds = total_seconds % 60;

    // After a day change the daily remainder was reset above, so the baseline
    // is this commit alone.
    let today_seconds = user.focus_seconds_today.saturating_add(seconds);
    let minutes_credited_today = today_seconds / 60;
    user.focus_minutes_today = user
        .focus_minutes_today
        .saturating_add(minutes_credited_today);
    user.focus_seconds_today = today_seconds % 60;

    FocusCommit {
        seconds,
        minutes_credited,
        minutes_credited_today,
        new_day,
    }
}

/// Counts one finished focus interval.
pub fn record_focus_session<Tz: TimeZone>(user: &mut User, now: DateTime<Utc>, tz: &Tz) {
    user.begin_stats_update(now, tz);
    user.total_focus_sessions = user.total_focus_sessions.saturating_add(1);
    user.focus_sessions_today = user.focus_sessions_today.saturating_add(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn user_at(last: &str) -> User {
        User {
            last_stats_update: Some(at(last)),
            ..User::default()
        }
    }

    #[test]
    fn fifty_plus_twenty_seconds_credits_one_minute() {
        let mut user = user_at("2026-03-02T08:00:00Z");
        user.focus_seconds = 50;
        user.focus_seconds_today = 50;
        user.total_focus_minutes = 7;

        let commit = commit_focus_seconds(&mut user, 20, at("2026-03-02T08:05:00Z"), &Utc);

        assert_eq!(commit.minutes_credited, 1);
        assert_eq!(user.focus_seconds, 10);
        assert_eq!(user.total_focus_minutes, 8);
        assert_eq!(user.focus_minutes_today, 1);
        assert_eq!(user.focus_seconds_today, 10);
        assert!(!commit.new_day);
    }

    #[test]
    fn commit_on_new_day_restarts_daily_epoch() {
        let mut user = user_at("2026-03-01T22:00:00Z");
        user.focus_seconds = 50;
        user.focus_seconds_today = 50;
        user.focus_minutes_today = 90;
        user.focus_sessions_today = 3;
        user.completed_tasks_today = 2;
        user.checked_items_today = 5;
        user.notes_created_today = 1;

        let now = at("2026-03-02T08:00:00Z");
        let commit = commit_focus_seconds(&mut user, 20, now, &Utc);

        assert!(commit.new_day);
        assert_eq!(commit.minutes_credited, 1);
        assert_eq!(commit.minutes_credited_today, 0);
        assert_eq!(user.focus_seconds, 10);
        assert_eq!(user.focus_minutes_today, 0);
        assert_eq!(user.focus_seconds_today, 20);
        assert_eq!(user.focus_sessions_today, 0);
        assert_eq!(user.completed_tasks_today, 0);
        assert_eq!(user.checked_items_today, 0);
        assert_eq!(user.notes_created_today, 0);
        assert_eq!(user.last_stats_update, Some(now));
    }

    #[test]
    fn accumulator_commits_on_threshold() {
        let start = at("2026-03-02T08:00:00Z");
        let mut accumulator = FocusAccumulator::new(start, 30, 30);
        for _ in 0..29 {
            accumulator.record(1);
        }
        assert!(!accumulator.is_due(start + Duration::seconds(5)));
        accumulator.record(1);
        assert!(accumulator.is_due(start + Duration::seconds(5)));
        assert_eq!(accumulator.take(start + Duration::seconds(5)), 30);
        assert_eq!(accumulator.pending_seconds(), 0);
    }

    #[test]
    fn accumulator_commits_after_interval() {
        let start = at("2026-03-02T08:00:00Z");
        let mut accumulator = FocusAccumulator::new(start, 30, 30);
        accumulator.record(3);
        assert!(!accumulator.is_due(start + Duration::seconds(29)));
        assert!(accumulator.is_due(start + Duration::seconds(30)));
    }

    #[test]
    fn empty_accumulator_is_never_due() {
        let start = at("2026-03-02T08:00:00Z");
        let accumulator = FocusAccumulator::new(start, 30, 30);
        assert!(!accumulator.is_due(start + Duration::hours(1)));
    }

    #[test]
    fn record_focus_session_counts_lifetime_and_today() {
        let mut user = user_at("2026-03-01T22:00:00Z");
        user.focus_sessions_today = 4;
        user.total_focus_sessions = 10;
        record_focus_session(&mut user, at("2026-03-02T08:00:00Z"), &Utc);
        assert_eq!(user.total_focus_sessions, 11);
        assert_eq!(user.focus_sessions_today, 1);
    }

    proptest! {
        #[test]
        fn commit_preserves_second_remainder_and_minutes(
            before_seconds in 0u32..60u32,
            before_minutes in 0u32..100_000u32,
            committed in 0u32..100_000u32
        ) {
            let mut user = user_at("2026-03-02T08:00:00Z");
            user.focus_seconds = before_seconds;
            user.total_focus_minutes = before_minutes;

            commit_focus_seconds(&mut user, committed, at("2026-03-02T09:00:00Z"), &Utc);

            prop_assert_eq!(user.focus_seconds, (before_seconds + committed) % 60);
            prop_assert_eq!(
                user.total_focus_minutes,
                before_minutes + (before_seconds + committed) / 60
            );
            prop_assert!(user.focus_seconds_today < 60);
        }

        #[test]
        fn daily_counters_are_additive_within_a_day(
            before_today_seconds in 0u32..60u32,
            before_today_minutes in 0u32..1_000u32,
            committed in 0u32..10_000u32
        ) {
            let mut user = user_at("2026-03-02T08:00:00Z");
            user.focus_seconds_today = before_today_seconds;
            user.focus_minutes_today = before_today_minutes;

            commit_focus_seconds(&mut user, committed, at("2026-03-02T09:00:00Z"), &Utc);

            let total = before_today_seconds + committed;
            prop_assert_eq!(user.focus_minutes_today, before_today_minutes + total / 60);
            prop_assert_eq!(user.focus_seconds_today, total % 60);
        }

        #[test]
        fn daily_counters_restart_on_new_day(
            before_today_seconds in 0u32..60u32,
            before_today_minutes in 0u32..1_000u32,
            committed in 0u32..10_000u32
        ) {
            let mut user = user_at("2026-03-01T08:00:00Z");
            user.focus_seconds_today = before_today_seconds;
            user.focus_minutes_today = before_today_minutes;

            commit_focus_seconds(&mut user, committed, at("2026-03-02T09:00:00Z"), &Utc);

            prop_assert_eq!(user.focus_minutes_today, committed / 60);
            prop_assert_eq!(user.focus_seconds_today, committed % 60);
        }
    }
}
