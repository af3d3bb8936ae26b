use crate::domain::models::User;
use chrono::{DateTime, Datelike, TimeZone, Utc};

/// True when `last` and `now` fall on different calendar days in `tz`.
pub fn is_new_day<Tz: TimeZone>(last: DateTime<Utc>, now: DateTime<Utc>, tz: &Tz) -> bool {
    let last = last.with_timezone(tz);
    let now = now.with_timezone(tz);
    last.year() != now.year() || last.month() != now.month() || last.day() != now.day()
}

impl User {
    /// Prepares the user for a stat-affecting mutation at `now`.
    ///
    /// If the stored `last_stats_update` is on an earlier day, every daily
    /// counter restarts from zero so the caller's increment becomes the whole
    /// daily value. Always advances `last_stats_update` to `now`. Returns
    /// whether a new day began.
    pub fn begin_stats_update<Tz: TimeZone>(&mut self, now: DateTime<Utc>, tz: &Tz) -> bool {
        let new_day = self
            .last_stats_update
            .is_some_and(|last| is_new_day(last, now, tz));
        if new_day {
            self.reset_daily_counters();
        }
        self.last_stats_update = Some(now);
        new_day
    }

    /// Startup and periodic check. A missing timestamp also counts as a new
    /// day. Leaves the user untouched when still on the same day.
    pub fn roll_over_if_new_day<Tz: TimeZone>(&mut self, now: DateTime<Utc>, tz: &Tz) -> bool {
        let due = match self.last_stats_update {
            Some(last) => is_new_day(last, now, tz),
            None => true,
        };
        if due {
            self.reset_daily_counters();
            self.last_stats_update = Some(now);
        }
        due
    }
}
