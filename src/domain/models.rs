use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

pub const DEFAULT_FOCUS_SECONDS: u32 = 25 * 60;
pub const DEFAULT_BREAK_SECONDS: u32 = 5 * 60;
pub const DEFAULT_VOLUME: u8 = 50;
pub const MAX_VOLUME: u8 = 100;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub username: String,
    pub total_points: u32,

    pub total_focus_sessions: u32,
    pub total_focus_minutes: u32,
    /// Sub-minute remainder of lifetime focus time, always below 60.
    pub focus_seconds: u32,
    pub completed_tasks: u32,
    pub checked_items: u32,
    pub notes_created: u32,

    pub focus_sessions_today: u32,
    pub focus_minutes_today: u32,
    pub focus_seconds_today: u32,
    pub completed_tasks_today: u32,
    pub checked_items_today: u32,
    pub notes_created_today: u32,

    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_stats_update: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            last_stats_update: Some(now),
            ..Self::default()
        }
    }

    pub fn needs_onboarding(&self) -> bool {
        self.username.trim().is_empty()
    }

    pub fn reset_daily_counters(&mut self) {
        self.focus_sessions_today = 0;
        self.focus_minutes_today = 0;
        self.focus_seconds_today = 0;
        self.completed_tasks_today = 0;
        self.checked_items_today = 0;
        self.notes_created_today = 0;
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Todo,
    Doing,
    Done,
}

impl TaskStatus {
    /// Maps any stored or submitted status text onto the board columns.
    /// Older documents used Portuguese column ids; unknown text lands in `Todo`.
    pub fn normalize(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "todo" | "a_fazer" | "pending" => Self::Todo,
            "doing" | "fazendo" | "in_progress" | "in-progress" => Self::Doing,
            "done" | "concluido" | "completed" => Self::Done,
            _ => Self::Todo,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Doing => "doing",
            Self::Done => "done",
        }
    }

    /// The only transition that counts as completing a task.
    pub fn completes(from: Self, to: Self) -> bool {
        from == Self::Doing && to == Self::Done
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub items: Vec<ChecklistItem>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Checklist {
    pub fn item_mut(&mut self, item_id: &str) -> Option<&mut ChecklistItem> {
        self.items.iter_mut().find(|item| item.id == item_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerState {
    pub is_running: bool,
    pub time_left: u32,
    pub is_break: bool,
    pub sessions_completed: u32,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            is_running: false,
            time_left: DEFAULT_FOCUS_SECONDS,
            is_break: false,
            sessions_completed: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Playlist {
    #[default]
    Lofi,
    Jazz,
    Ambient,
}

impl Playlist {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lofi" => Some(Self::Lofi),
            "jazz" => Some(Self::Jazz),
            "ambient" => Some(Self::Ambient),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lofi => "lofi",
            Self::Jazz => "jazz",
            Self::Ambient => "ambient",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct MusicState {
    pub is_playing: bool,
    pub volume: u8,
    pub playlist_id: Playlist,
}

impl Default for MusicState {
    fn default() -> Self {
        Self {
            is_playing: false,
            volume: DEFAULT_VOLUME,
            playlist_id: Playlist::Lofi,
        }
    }
}

impl MusicState {
    pub fn clamp_volume(volume: i64) -> u8 {
        volume.clamp(0, i64::from(MAX_VOLUME)) as u8
    }
}

/// The whole persisted document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AppData {
    pub user: User,
    pub tasks: Vec<Task>,
    pub checklists: Vec<Checklist>,
    pub notes: Vec<Note>,
    pub timer: TimerState,
    pub music: MusicState,
}

impl AppData {
    pub fn new(now: DateTime<Utc>, focus_seconds: u32) -> Self {
        Self {
            user: User::new(now),
            timer: TimerState {
                time_left: focus_seconds,
                ..TimerState::default()
            },
            ..Self::default()
        }
    }

    pub fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == task_id)
    }

    pub fn checklist_mut(&mut self, checklist_id: &str) -> Option<&mut Checklist> {
        self.checklists
            .iter_mut()
            .find(|checklist| checklist.id == checklist_id)
    }

    pub fn note_mut(&mut self, note_id: &str) -> Option<&mut Note> {
        self.notes.iter_mut().find(|note| note.id == note_id)
    }
}

/// Navigation tab of the view. Lives only in memory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActiveTab {
    #[default]
    Kanban,
    Timer,
    Checklists,
    Notes,
    Music,
}

impl ActiveTab {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "kanban" => Some(Self::Kanban),
            "timer" => Some(Self::Timer),
            "checklists" => Some(Self::Checklists),
            "notes" => Some(Self::Notes),
            "music" => Some(Self::Music),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn sample_data() -> AppData {
        let created = fixed_time("2026-02-16T08:00:00Z");
        let mut data = AppData::new(created, DEFAULT_FOCUS_SECONDS);
        data.user.username = "Ana".to_string();
        data.user.total_points = 35;
        data.user.focus_seconds = 42;
        data.tasks.push(Task {
            id: "tsk-1".to_string(),
            title: "Write report".to_string(),
            description: Some("quarterly".to_string()),
            due_date: NaiveDate::from_ymd_opt(2026, 2, 20),
            status: TaskStatus::Doing,
            created_at: created,
        });
        data.checklists.push(Checklist {
            id: "chk-1".to_string(),
            name: "Groceries".to_string(),
            items: vec![ChecklistItem {
                id: "itm-1".to_string(),
                text: "Milk".to_string(),
                completed: true,
                created_at: created,
            }],
            created_at: created,
        });
        data.notes.push(Note {
            id: "nte-1".to_string(),
            content: "Call Bob".to_string(),
            created_at: created,
            updated_at: fixed_time("2026-02-16T09:00:00Z"),
        });
        data.music.playlist_id = Playlist::Jazz;
        data
    }

    #[test]
    fn app_data_serde_roundtrip() {
        let data = sample_data();
        let raw = serde_json::to_string(&data).expect("serialize");
        let restored: AppData = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(restored, data);
    }

    #[test]
    fn durable_layout_uses_camel_case_keys() {
        let value = serde_json::to_value(sample_data()).expect("serialize");
        assert!(value["user"].get("totalFocusMinutes").is_some());
        assert!(value["user"].get("lastStatsUpdate").is_some());
        assert_eq!(value["tasks"][0]["status"], "doing");
        assert_eq!(value["tasks"][0]["dueDate"], "2026-02-20");
        assert_eq!(value["timer"]["timeLeft"], 1500);
        assert_eq!(value["music"]["playlistId"], "jazz");
    }

    #[test]
    fn missing_fields_read_as_zero() {
        let raw = r#"{"user": {"username": "Ana", "totalPoints": 12}, "tasks": []}"#;
        let data: AppData = serde_json::from_str(raw).expect("deserialize");
        assert_eq!(data.user.total_points, 12);
        assert_eq!(data.user.focus_seconds_today, 0);
        assert_eq!(data.user.last_stats_update, None);
        assert_eq!(data.timer, TimerState::default());
        assert_eq!(data.music.volume, DEFAULT_VOLUME);
    }

    #[test]
    fn status_normalization_maps_legacy_values() {
        assert_eq!(TaskStatus::normalize("a_fazer"), TaskStatus::Todo);
        assert_eq!(TaskStatus::normalize("fazendo"), TaskStatus::Doing);
        assert_eq!(TaskStatus::normalize("concluido"), TaskStatus::Done);
        assert_eq!(TaskStatus::normalize(" DONE "), TaskStatus::Done);
        assert_eq!(TaskStatus::normalize("archived"), TaskStatus::Todo);
    }

    #[test]
    fn only_doing_to_done_completes() {
        assert!(TaskStatus::completes(TaskStatus::Doing, TaskStatus::Done));
        assert!(!TaskStatus::completes(TaskStatus::Todo, TaskStatus::Done));
        assert!(!TaskStatus::completes(TaskStatus::Done, TaskStatus::Done));
    }

    #[test]
    fn checklist_item_lookup_by_id() {
        let mut checklist = sample_data().checklists.remove(0);
        assert!(checklist.item_mut("itm-1").is_some());
        assert!(checklist.item_mut("itm-2").is_none());
    }

    #[test]
    fn volume_is_clamped() {
        assert_eq!(MusicState::clamp_volume(-5), 0);
        assert_eq!(MusicState::clamp_volume(70), 70);
        assert_eq!(MusicState::clamp_volume(180), 100);
    }

    #[test]
    fn next_id_is_unique() {
        let first = next_id("tsk");
        let second = next_id("tsk");
        assert_ne!(first, second);
        assert!(first.starts_with("tsk-"));
    }
}
