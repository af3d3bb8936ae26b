use crate::application::bootstrap::bootstrap_workspace;
use crate::domain::focus::{commit_focus_seconds, record_focus_session, FocusAccumulator, FocusCommit};
use crate::domain::migration::decode_app_data;
use crate::domain::models::{
    next_id, ActiveTab, AppData, Checklist, ChecklistItem, MusicState, Note, Playlist, Task,
    TaskStatus, TimerState, User, MAX_VOLUME,
};
use crate::domain::points::{
    Notification, NotificationKind, NotificationQueue, CHECKLIST_ITEM_POINTS, DEFAULT_DISPLAY_MS,
    FOCUS_POINTS_PER_MINUTE, NOTE_CREATION_POINTS, TASK_COMPLETION_POINTS,
};
use crate::domain::stats::{summarize, StatsScope, StatsSummary};
use crate::domain::timer::{TimerDurations, TimerPhase};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::kv_store::{KeyValueStore, SqliteKeyValueStore};
use crate::infrastructure::persisted_store::PersistedStore;
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub struct AppState {
    config: AppConfig,
    durations: TimerDurations,
    runtime: Mutex<RuntimeState>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let backend = Arc::new(SqliteKeyValueStore::new(&bootstrap.database_path));
        Self::with_store(bootstrap.config, backend)
    }

    pub fn with_store(config: AppConfig, backend: Arc<dyn KeyValueStore>) -> Result<Self, InfraError> {
        config.validate()?;
        let now = Utc::now();
        let durations = TimerDurations {
            focus_seconds: config.focus_seconds(),
            break_seconds: config.break_seconds(),
        };

        let mut store = PersistedStore::open(
            backend,
            config.storage_key.clone(),
            AppData::new(now, durations.focus_seconds),
            config.persist_debounce(),
            |raw| decode_app_data(raw).map_err(InfraError::from),
        );

        let mut data = store.get().clone();
        if data.user.roll_over_if_new_day(now, &Local) {
            info!(command = "startup", "daily counters reset");
            store.set(data);
        }

        let display = Duration::from_std(config.notification_display())
            .unwrap_or_else(|_| Duration::milliseconds(DEFAULT_DISPLAY_MS));
        let runtime = RuntimeState {
            store,
            focus: FocusAccumulator::new(
                now,
                config.focus_commit_threshold_seconds,
                config.focus_commit_interval_seconds,
            ),
            notifications: NotificationQueue::new(display),
            active_tab: ActiveTab::default(),
        };

        Ok(Self {
            config,
            durations,
            runtime: Mutex::new(runtime),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

struct RuntimeState {
    store: PersistedStore<AppData>,
    focus: FocusAccumulator,
    notifications: NotificationQueue,
    active_tab: ActiveTab,
}

impl RuntimeState {
    /// Folds the session accumulator into the stored user stats. Does nothing
    /// while the accumulator is empty.
    fn commit_focus(
        &mut self,
        now: DateTime<Utc>,
        emitted: &mut Vec<Notification>,
    ) -> Option<FocusCommit> {
        if self.focus.pending_seconds() == 0 {
            return None;
        }
        let seconds = self.focus.take(now);
        let mut data = self.store.get().clone();
        let commit = commit_focus_seconds(&mut data.user, seconds, now, &Local);
        emitted.extend(self.notifications.award(
            &mut data.user,
            NotificationKind::Focus,
            commit.minutes_credited * FOCUS_POINTS_PER_MINUTE,
            next_id("focus-commit"),
            now,
        ));
        self.store.set(data);
        debug!(
            seconds = commit.seconds,
            minutes_credited = commit.minutes_credited,
            new_day = commit.new_day,
            "committed focus time"
        );
        Some(commit)
    }

    fn finish_focus_session(
        &mut self,
        now: DateTime<Utc>,
        emitted: &mut Vec<Notification>,
    ) -> Option<FocusCommit> {
        let commit = self.commit_focus(now, emitted);
        let mut data = self.store.get().clone();
        record_focus_session(&mut data.user, now, &Local);
        self.store.set(data);
        commit
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandResponse<T> {
    pub result: T,
    pub notifications: Vec<Notification>,
}

impl<T> CommandResponse<T> {
    fn new(result: T, notifications: Vec<Notification>) -> Self {
        Self {
            result,
            notifications,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub show_welcome: bool,
    pub active_tab: ActiveTab,
    pub pending_focus_seconds: u32,
    pub notifications: Vec<Notification>,
    pub data: AppData,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TimerTickResponse {
    pub timer: TimerState,
    pub completed_phase: Option<TimerPhase>,
    pub play_completion_cue: bool,
}

pub fn get_app_data_impl(state: &AppState) -> Result<AppData, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.store.get().clone())
}

pub fn get_session_impl(state: &AppState) -> Result<SessionSnapshot, InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.notifications.expire(Utc::now());
    let data = runtime.store.get().clone();
    Ok(SessionSnapshot {
        show_welcome: data.user.needs_onboarding(),
        active_tab: runtime.active_tab,
        pending_focus_seconds: runtime.focus.pending_seconds(),
        notifications: runtime.notifications.pending().to_vec(),
        data,
    })
}

pub fn set_username_impl(state: &AppState, username: String) -> Result<User, InfraError> {
    let username = required_text(&username, "username")?;
    let now = Utc::now();

    let mut runtime = lock_runtime(state)?;
    let mut data = runtime.store.get().clone();
    let onboarding = data.user.needs_onboarding();
    data.user.username = username;
    if onboarding {
        data.user.created_at = now;
    }
    let user = data.user.clone();
    runtime.store.set(data);

    info!(command = "set_username", onboarding, "username set");
    Ok(user)
}

pub fn update_username_impl(state: &AppState, username: String) -> Result<User, InfraError> {
    let username = required_text(&username, "username")?;

    let mut runtime = lock_runtime(state)?;
    let mut data = runtime.store.get().clone();
    data.user.username = username;
    let user = data.user.clone();
    runtime.store.set(data);

    info!(command = "update_username", "username updated");
    Ok(user)
}

pub fn clear_all_data_impl(state: &AppState) -> Result<AppData, InfraError> {
    let now = Utc::now();
    let mut runtime = lock_runtime(state)?;
    let data = AppData::new(now, state.durations.focus_seconds);
    runtime.store.set(data.clone());
    runtime.notifications.clear();
    runtime.focus.clear(now);

    info!(command = "clear_all_data", "all data reset to defaults");
    Ok(data)
}

pub fn create_task_impl(
    state: &AppState,
    title: String,
    description: Option<String>,
    due_date: Option<String>,
    status: Option<String>,
) -> Result<Task, InfraError> {
    let task = Task {
        id: next_id("tsk"),
        title: required_text(&title, "title")?,
        description: optional_text(description.as_deref()),
        due_date: parse_due_date(due_date.as_deref())?,
        status: status
            .as_deref()
            .map(TaskStatus::normalize)
            .unwrap_or_default(),
        created_at: Utc::now(),
    };

    let mut runtime = lock_runtime(state)?;
    let mut data = runtime.store.get().clone();
    data.tasks.push(task.clone());
    runtime.store.set(data);

    info!(command = "create_task", task_id = %task.id, "created task");
    Ok(task)
}

pub fn update_task_impl(
    state: &AppState,
    task_id: String,
    title: Option<String>,
    description: Option<String>,
    due_date: Option<String>,
) -> Result<Task, InfraError> {
    let task_id = required_id(&task_id, "task_id")?;
    let title = title.as_deref().map(|title| required_text(title, "title")).transpose()?;
    let due_date = match due_date.as_deref() {
        Some(raw) => Some(parse_due_date(Some(raw))?),
        None => None,
    };

    let mut runtime = lock_runtime(state)?;
    let mut data = runtime.store.get().clone();
    let Some(task) = data.task_mut(task_id) else {
        return Err(InfraError::NotFound(format!("task not found: {task_id}")));
    };

    if let Some(title) = title {
        task.title = title;
    }
    if let Some(description) = description {
        task.description = optional_text(Some(&description));
    }
    if let Some(due_date) = due_date {
        task.due_date = due_date;
    }

    let updated = task.clone();
    runtime.store.set(data);
    drop(runtime);
    info!(command = "update_task", task_id, "updated task");
    Ok(updated)
}

/// Moves a task to another column. Status text is normalized, so legacy
/// column ids are accepted. Only a doing→done move counts as completion.
pub fn change_task_status_impl(
    state: &AppState,
    task_id: String,
    new_status: String,
) -> Result<CommandResponse<Task>, InfraError> {
    let task_id = required_id(&task_id, "task_id")?;
    let new_status = TaskStatus::normalize(&new_status);
    let now = Utc::now();

    let mut guard = lock_runtime(state)?;
    let runtime = &mut *guard;
    let mut data = runtime.store.get().clone();
    let Some(index) = data.tasks.iter().position(|task| task.id == task_id) else {
        return Err(InfraError::NotFound(format!("task not found: {task_id}")));
    };

    let previous = data.tasks[index].status;
    data.tasks[index].status = new_status;

    let mut notifications = Vec::new();
    if TaskStatus::completes(previous, new_status) {
        let user = &mut data.user;
        user.begin_stats_update(now, &Local);
        bump(&mut user.completed_tasks);
        bump(&mut user.completed_tasks_today);
        notifications.extend(runtime.notifications.award(
            user,
            NotificationKind::Task,
            TASK_COMPLETION_POINTS,
            next_id("task-done"),
            now,
        ));
    }

    let task = data.tasks[index].clone();
    runtime.store.set(data);
    drop(guard);
    info!(
        command = "change_task_status",
        task_id,
        from = previous.as_str(),
        to = new_status.as_str(),
        "moved task"
    );
    Ok(CommandResponse::new(task, notifications))
}

pub fn delete_task_impl(state: &AppState, task_id: String) -> Result<bool, InfraError> {
    let task_id = required_id(&task_id, "task_id")?;

    let mut runtime = lock_runtime(state)?;
    let mut data = runtime.store.get().clone();
    let before = data.tasks.len();
    data.tasks.retain(|task| task.id != task_id);
    if data.tasks.len() == before {
        return Ok(false);
    }
    runtime.store.set(data);

    info!(command = "delete_task", task_id, "deleted task");
    Ok(true)
}

pub fn create_checklist_impl(state: &AppState, name: String) -> Result<Checklist, InfraError> {
    let checklist = Checklist {
        id: next_id("chk"),
        name: required_text(&name, "name")?,
        items: Vec::new(),
        created_at: Utc::now(),
    };

    let mut runtime = lock_runtime(state)?;
    let mut data = runtime.store.get().clone();
    data.checklists.push(checklist.clone());
    runtime.store.set(data);

    info!(command = "create_checklist", checklist_id = %checklist.id, "created checklist");
    Ok(checklist)
}

pub fn delete_checklist_impl(state: &AppState, checklist_id: String) -> Result<bool, InfraError> {
    let checklist_id = required_id(&checklist_id, "checklist_id")?;

    let mut runtime = lock_runtime(state)?;
    let mut data = runtime.store.get().clone();
    let before = data.checklists.len();
    data.checklists.retain(|checklist| checklist.id != checklist_id);
    if data.checklists.len() == before {
        return Ok(false);
    }
    runtime.store.set(data);

    info!(command = "delete_checklist", checklist_id, "deleted checklist");
    Ok(true)
}

pub fn add_checklist_item_impl(
    state: &AppState,
    checklist_id: String,
    text: String,
) -> Result<ChecklistItem, InfraError> {
    let checklist_id = required_id(&checklist_id, "checklist_id")?;
    let item = ChecklistItem {
        id: next_id("itm"),
        text: required_text(&text, "text")?,
        completed: false,
        created_at: Utc::now(),
    };

    let mut runtime = lock_runtime(state)?;
    let mut data = runtime.store.get().clone();
    let Some(checklist) = data.checklist_mut(checklist_id) else {
        return Err(InfraError::NotFound(format!(
            "checklist not found: {checklist_id}"
        )));
    };
    checklist.items.push(item.clone());
    runtime.store.set(data);

    info!(command = "add_checklist_item", checklist_id, item_id = %item.id, "added item");
    Ok(item)
}

/// Sets an item's completion flag. Points are awarded only on the
/// unchecked→checked edge.
pub fn check_checklist_item_impl(
    state: &AppState,
    checklist_id: String,
    item_id: String,
    checked: bool,
) -> Result<CommandResponse<ChecklistItem>, InfraError> {
    let checklist_id = required_id(&checklist_id, "checklist_id")?;
    let item_id = required_id(&item_id, "item_id")?;
    let now = Utc::now();

    let mut guard = lock_runtime(state)?;
    let runtime = &mut *guard;
    let mut data = runtime.store.get().clone();
    let Some(checklist) = data.checklist_mut(checklist_id) else {
        return Err(InfraError::NotFound(format!(
            "checklist not found: {checklist_id}"
        )));
    };
    let Some(item) = checklist.item_mut(item_id) else {
        return Err(InfraError::NotFound(format!("checklist item not found: {item_id}")));
    };

    let newly_checked = checked && !item.completed;
    item.completed = checked;
    let item = item.clone();

    let mut notifications = Vec::new();
    if newly_checked {
        let user = &mut data.user;
        user.begin_stats_update(now, &Local);
        bump(&mut user.checked_items);
        bump(&mut user.checked_items_today);
        notifications.extend(runtime.notifications.award(
            user,
            NotificationKind::Checklist,
            CHECKLIST_ITEM_POINTS,
            next_id("item-checked"),
            now,
        ));
    }
    runtime.store.set(data);
    drop(guard);

    info!(command = "check_checklist_item", checklist_id, item_id, checked, "toggled item");
    Ok(CommandResponse::new(item, notifications))
}

pub fn delete_checklist_item_impl(
    state: &AppState,
    checklist_id: String,
    item_id: String,
) -> Result<bool, InfraError> {
    let checklist_id = required_id(&checklist_id, "checklist_id")?;
    let item_id = required_id(&item_id, "item_id")?;

    let mut runtime = lock_runtime(state)?;
    let mut data = runtime.store.get().clone();
    let Some(checklist) = data.checklist_mut(checklist_id) else {
        return Err(InfraError::NotFound(format!(
            "checklist not found: {checklist_id}"
        )));
    };
    let before = checklist.items.len();
    checklist.items.retain(|item| item.id != item_id);
    if checklist.items.len() == before {
        return Ok(false);
    }
    runtime.store.set(data);

    info!(command = "delete_checklist_item", checklist_id, item_id, "deleted item");
    Ok(true)
}

pub fn create_note_impl(state: &AppState, content: String) -> Result<CommandResponse<Note>, InfraError> {
    let content = required_text(&content, "content")?;
    let now = Utc::now();
    let note = Note {
        id: next_id("nte"),
        content,
        created_at: now,
        updated_at: now,
    };

    let mut guard = lock_runtime(state)?;
    let runtime = &mut *guard;
    let mut data = runtime.store.get().clone();
    data.notes.insert(0, note.clone());

    let user = &mut data.user;
    user.begin_stats_update(now, &Local);
    bump(&mut user.notes_created);
    bump(&mut user.notes_created_today);
    let notifications = runtime
        .notifications
        .award(
            user,
            NotificationKind::Note,
            NOTE_CREATION_POINTS,
            format!("note-created:{}", note.id),
            now,
        )
        .into_iter()
        .collect::<Vec<_>>();
    runtime.store.set(data);
    drop(guard);

    info!(command = "create_note", note_id = %note.id, "created note");
    Ok(CommandResponse::new(note, notifications))
}

pub fn update_note_impl(state: &AppState, note_id: String, content: String) -> Result<Note, InfraError> {
    let note_id = required_id(&note_id, "note_id")?;
    let content = required_text(&content, "content")?;
    let now = Utc::now();

    let mut runtime = lock_runtime(state)?;
    let mut data = runtime.store.get().clone();
    let Some(note) = data.note_mut(note_id) else {
        return Err(InfraError::NotFound(format!("note not found: {note_id}")));
    };
    note.content = content;
    note.updated_at = now.max(note.created_at);
    let updated = note.clone();
    runtime.store.set(data);
    drop(runtime);

    info!(command = "update_note", note_id, "updated note");
    Ok(updated)
}

pub fn delete_note_impl(state: &AppState, note_id: String) -> Result<bool, InfraError> {
    let note_id = required_id(&note_id, "note_id")?;

    let mut runtime = lock_runtime(state)?;
    let mut data = runtime.store.get().clone();
    let before = data.notes.len();
    data.notes.retain(|note| note.id != note_id);
    if data.notes.len() == before {
        return Ok(false);
    }
    runtime.store.set(data);

    info!(command = "delete_note", note_id, "deleted note");
    Ok(true)
}

pub fn replace_music_impl(state: &AppState, music: MusicState) -> Result<MusicState, InfraError> {
    let music = MusicState {
        volume: music.volume.min(MAX_VOLUME),
        ..music
    };
    update_music(state, "replace_music", |current| *current = music.clone())
}

pub fn set_volume_impl(state: &AppState, volume: i64) -> Result<MusicState, InfraError> {
    let volume = MusicState::clamp_volume(volume);
    update_music(state, "set_volume", |music| music.volume = volume)
}

pub fn select_playlist_impl(state: &AppState, playlist_id: String) -> Result<MusicState, InfraError> {
    let playlist = Playlist::parse(&playlist_id).unwrap_or_else(|| {
        warn!(command = "select_playlist", playlist_id = %playlist_id, "unknown playlist, using default");
        Playlist::default()
    });
    update_music(state, "select_playlist", |music| music.playlist_id = playlist)
}

pub fn toggle_music_impl(state: &AppState) -> Result<MusicState, InfraError> {
    update_music(state, "toggle_music", |music| music.is_playing = !music.is_playing)
}

fn update_music<F>(state: &AppState, command: &str, update: F) -> Result<MusicState, InfraError>
where
    F: FnOnce(&mut MusicState),
{
    let mut runtime = lock_runtime(state)?;
    let mut data = runtime.store.get().clone();
    update(&mut data.music);
    let music = data.music.clone();
    runtime.store.set(data);
    drop(runtime);

    info!(
        command,
        playing = music.is_playing,
        volume = music.volume,
        playlist = music.playlist_id.as_str(),
        "music state updated"
    );
    Ok(music)
}

pub fn get_timer_impl(state: &AppState) -> Result<TimerState, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.store.get().timer.clone())
}

pub fn start_timer_impl(state: &AppState) -> Result<TimerState, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let mut data = runtime.store.get().clone();
    if !data.timer.start() {
        return Ok(data.timer);
    }
    let timer = data.timer.clone();
    runtime.store.set(data);
    drop(runtime);

    info!(command = "start_timer", time_left = timer.time_left, "timer started");
    Ok(timer)
}

pub fn pause_timer_impl(state: &AppState) -> Result<CommandResponse<TimerState>, InfraError> {
    timer_control(state, "pause_timer", |timer, _| timer.pause())
}

pub fn reset_timer_impl(state: &AppState) -> Result<CommandResponse<TimerState>, InfraError> {
    timer_control(state, "reset_timer", |timer, durations| timer.reset(durations))
}

pub fn skip_timer_impl(state: &AppState) -> Result<CommandResponse<TimerState>, InfraError> {
    timer_control(state, "skip_timer", |timer, durations| {
        timer.skip(durations);
    })
}

// Pause, reset and skip all end the running stretch, so pending focus time is
// committed first.
fn timer_control<F>(
    state: &AppState,
    command: &str,
    control: F,
) -> Result<CommandResponse<TimerState>, InfraError>
where
    F: FnOnce(&mut TimerState, &TimerDurations),
{
    let now = Utc::now();
    let mut runtime = lock_runtime(state)?;
    let mut notifications = Vec::new();
    runtime.commit_focus(now, &mut notifications);

    let mut data = runtime.store.get().clone();
    control(&mut data.timer, &state.durations);
    let timer = data.timer.clone();
    runtime.store.set(data);
    drop(runtime);

    info!(
        command,
        time_left = timer.time_left,
        is_break = timer.is_break,
        "timer updated"
    );
    Ok(CommandResponse::new(timer, notifications))
}

/// Accepts a whole timer state pushed by the view.
pub fn replace_timer_impl(state: &AppState, timer: TimerState) -> Result<TimerState, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let mut data = runtime.store.get().clone();
    data.timer = timer.clone();
    runtime.store.set(data);
    drop(runtime);

    info!(
        command = "replace_timer",
        time_left = timer.time_left,
        is_break = timer.is_break,
        "timer replaced"
    );
    Ok(timer)
}

/// One scheduler tick. Counts down a running timer, forwards focus seconds to
/// the accumulator and handles phase expiry.
pub fn tick_timer_impl(state: &AppState) -> Result<CommandResponse<TimerTickResponse>, InfraError> {
    let now = Utc::now();
    let mut runtime = lock_runtime(state)?;
    let mut data = runtime.store.get().clone();
    if !data.timer.is_running {
        return Ok(CommandResponse::new(
            TimerTickResponse {
                timer: data.timer,
                completed_phase: None,
                play_completion_cue: false,
            },
            Vec::new(),
        ));
    }

    let outcome = data.timer.tick(&state.durations);
    let timer = data.timer.clone();
    runtime.store.set(data);
    runtime.focus.record(outcome.focus_seconds);

    let mut notifications = Vec::new();
    match outcome.completed {
        Some(TimerPhase::Focus) => {
            runtime.finish_focus_session(now, &mut notifications);
            info!(
                command = "tick_timer",
                sessions_completed = timer.sessions_completed,
                "focus session completed"
            );
        }
        Some(TimerPhase::Break) => {
            info!(command = "tick_timer", "break completed");
        }
        None => {
            if runtime.focus.is_due(now) {
                runtime.commit_focus(now, &mut notifications);
            }
        }
    }

    Ok(CommandResponse::new(
        TimerTickResponse {
            timer,
            completed_phase: outcome.completed,
            play_completion_cue: outcome.completed.is_some(),
        },
        notifications,
    ))
}

/// Focus seconds reported by a view-driven countdown.
pub fn focus_tick_impl(state: &AppState, seconds: u32) -> Result<CommandResponse<u32>, InfraError> {
    let now = Utc::now();
    let mut runtime = lock_runtime(state)?;
    runtime.focus.record(seconds);

    let mut notifications = Vec::new();
    if runtime.focus.is_due(now) {
        runtime.commit_focus(now, &mut notifications);
    }
    let pending = runtime.focus.pending_seconds();
    drop(runtime);

    debug!(command = "focus_tick", seconds, pending, "focus seconds recorded");
    Ok(CommandResponse::new(pending, notifications))
}

pub fn session_complete_impl(state: &AppState) -> Result<CommandResponse<User>, InfraError> {
    let now = Utc::now();
    let mut runtime = lock_runtime(state)?;
    let mut notifications = Vec::new();
    runtime.finish_focus_session(now, &mut notifications);
    let user = runtime.store.get().user.clone();
    drop(runtime);

    info!(command = "session_complete", total_sessions = user.total_focus_sessions, "session recorded");
    Ok(CommandResponse::new(user, notifications))
}

/// Commits any non-zero accumulator. Called on exit paths and by the
/// periodic flush.
pub fn flush_focus_impl(state: &AppState) -> Result<CommandResponse<Option<FocusCommit>>, InfraError> {
    let now = Utc::now();
    let mut runtime = lock_runtime(state)?;
    let mut notifications = Vec::new();
    let commit = runtime.commit_focus(now, &mut notifications);
    drop(runtime);

    if let Some(commit) = commit {
        debug!(command = "flush_focus", seconds = commit.seconds, "focus flushed");
    }
    Ok(CommandResponse::new(commit, notifications))
}

pub fn change_active_tab_impl(
    state: &AppState,
    tab: String,
) -> Result<CommandResponse<ActiveTab>, InfraError> {
    let Some(tab) = ActiveTab::parse(&tab) else {
        return Err(InfraError::InvalidInput(format!("unknown tab: {}", tab.trim())));
    };
    let now = Utc::now();

    let mut runtime = lock_runtime(state)?;
    let mut notifications = Vec::new();
    if runtime.active_tab != tab {
        runtime.commit_focus(now, &mut notifications);
        runtime.active_tab = tab;
    }
    drop(runtime);

    info!(command = "change_active_tab", tab = ?tab, "active tab changed");
    Ok(CommandResponse::new(tab, notifications))
}

pub fn check_day_rollover_impl(state: &AppState) -> Result<bool, InfraError> {
    let now = Utc::now();
    let mut runtime = lock_runtime(state)?;
    let mut data = runtime.store.get().clone();
    if !data.user.roll_over_if_new_day(now, &Local) {
        return Ok(false);
    }
    runtime.store.set(data);
    drop(runtime);

    info!(command = "check_day_rollover", "daily counters reset");
    Ok(true)
}

pub fn pending_notifications_impl(state: &AppState) -> Result<Vec<Notification>, InfraError> {
    let mut runtime = lock_runtime(state)?;
    runtime.notifications.expire(Utc::now());
    Ok(runtime.notifications.pending().to_vec())
}

pub fn expire_notifications_impl(state: &AppState) -> Result<usize, InfraError> {
    let mut runtime = lock_runtime(state)?;
    Ok(runtime.notifications.expire(Utc::now()))
}

pub fn dismiss_notification_impl(state: &AppState, notification_id: String) -> Result<bool, InfraError> {
    let notification_id = notification_id.trim();
    let mut runtime = lock_runtime(state)?;
    let dismissed = runtime.notifications.dismiss(notification_id);
    drop(runtime);

    info!(command = "dismiss_notification", notification_id, dismissed, "notification dismissed");
    Ok(dismissed)
}

pub fn get_stats_summary_impl(
    state: &AppState,
    scope: Option<String>,
) -> Result<StatsSummary, InfraError> {
    let scope = match scope.as_deref() {
        Some(raw) => StatsScope::parse(raw)
            .ok_or_else(|| InfraError::InvalidInput(format!("unknown stats scope: {}", raw.trim())))?,
        None => StatsScope::Today,
    };
    let runtime = lock_runtime(state)?;
    Ok(summarize(&runtime.store.get().user, scope))
}

/// Commits pending focus time and writes the aggregate without waiting for
/// the debounce delay.
pub fn shutdown_impl(state: &AppState) -> Result<CommandResponse<()>, InfraError> {
    let now = Utc::now();
    let mut runtime = lock_runtime(state)?;
    let mut notifications = Vec::new();
    runtime.commit_focus(now, &mut notifications);
    runtime.store.flush_now();
    drop(runtime);

    info!(command = "shutdown", "state flushed");
    Ok(CommandResponse::new((), notifications))
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::LockPoisoned(format!("runtime lock poisoned: {error}")))
}

fn bump(counter: &mut u32) {
    *counter = counter.saturating_add(1);
}

fn required_id<'a>(value: &'a str, field_name: &str) -> Result<&'a str, InfraError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InfraError::InvalidInput(format!("{field_name} must not be empty")));
    }
    Ok(value)
}

fn required_text(value: &str, field_name: &str) -> Result<String, InfraError> {
    required_id(value, field_name).map(ToOwned::to_owned)
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn parse_due_date(value: Option<&str>) -> Result<Option<NaiveDate>, InfraError> {
    let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|error| InfraError::InvalidInput(format!("due_date must be YYYY-MM-DD: {error}")))
}
