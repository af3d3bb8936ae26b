use crate::domain::models::User;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsScope {
    Today,
    Total,
}

impl StatsScope {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" => Some(Self::Today),
            "total" => Some(Self::Total),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSummary {
    pub scope: StatsScope,
    pub focus_minutes: u32,
    pub focus_seconds: u32,
    pub focus_sessions: u32,
    pub completed_tasks: u32,
    pub checked_items: u32,
    pub notes_created: u32,
    pub total_points: u32,
}

impl StatsSummary {
    pub fn focus_time_label(&self) -> String {
        format!("{}m {:02}s", self.focus_minutes, self.focus_seconds)
    }
}

pub fn summarize(user: &User, scope: StatsScope) -> StatsSummary {
    let (minutes, seconds, sessions, tasks, items, notes) = match scope {
        StatsScope::Today => (
            user.focus_minutes_today,
            user.focus_seconds_today,
            user.focus_sessions_today,
            user.completed_tasks_today,
            user.checked_items_today,
            user.notes_created_today,
        ),
        StatsScope::Total => (
            user.total_focus_minutes,
            user.focus_seconds,
            user.total_focus_sessions,
            user.completed_tasks,
            user.checked_items,
            user.notes_created,
        ),
    };

    StatsSummary {
        scope,
        focus_minutes: minutes.saturating_add(seconds / 60),
        focus_seconds: seconds % 60,
        focus_sessions: sessions,
        completed_tasks: tasks,
        checked_items: items,
        notes_created: notes,
        total_points: user.total_points,
    }
}
