//! Load-time normalization of stored documents.
//!
//! Documents are never versioned, so anything written by an older build is
//! rewritten into the current shape here, once, before typed decoding.

use crate::domain::models::{AppData, MusicState, Playlist, TaskStatus};
use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};
use std::collections::HashSet;

const USER_COUNTERS: [&str; 13] = [
    "totalPoints",
    "totalFocusSessions",
    "totalFocusMinutes",
    "focusSeconds",
    "completedTasks",
    "checkedItems",
    "notesCreated",
    "focusSessionsToday",
    "focusMinutesToday",
    "focusSecondsToday",
    "completedTasksToday",
    "checkedItemsToday",
    "notesCreatedToday",
];

pub fn decode_app_data(raw: &str) -> serde_json::Result<AppData> {
    let document: Value = serde_json::from_str(raw)?;
    serde_json::from_value(migrate_document(document))
}

pub fn migrate_document(mut document: Value) -> Value {
    let Some(root) = document.as_object_mut() else {
        return document;
    };

    if let Some(user) = root.get_mut("user").and_then(Value::as_object_mut) {
        migrate_user(user);
    }
    if let Some(tasks) = root.get_mut("tasks").and_then(Value::as_array_mut) {
        retain_unique_ids(tasks, &["title"]);
        for task in tasks.iter_mut().filter_map(Value::as_object_mut) {
            migrate_task(task);
        }
    }
    if let Some(checklists) = root.get_mut("checklists").and_then(Value::as_array_mut) {
        retain_unique_ids(checklists, &[]);
        for checklist in checklists.iter_mut().filter_map(Value::as_object_mut) {
            drop_invalid_timestamp(checklist, "createdAt");
            if let Some(items) = checklist.get_mut("items").and_then(Value::as_array_mut) {
                retain_unique_ids(items, &[]);
                for item in items.iter_mut().filter_map(Value::as_object_mut) {
                    drop_invalid_timestamp(item, "createdAt");
                    if !item.get("completed").is_some_and(Value::is_boolean) {
                        item.remove("completed");
                    }
                }
            }
        }
    }
    if let Some(notes) = root.get_mut("notes").and_then(Value::as_array_mut) {
        retain_unique_ids(notes, &[]);
        for note in notes.iter_mut().filter_map(Value::as_object_mut) {
            drop_invalid_timestamp(note, "createdAt");
            drop_invalid_timestamp(note, "updatedAt");
        }
    }
    if let Some(timer) = root.get_mut("timer").and_then(Value::as_object_mut) {
        migrate_timer(timer);
    }
    if let Some(music) = root.get_mut("music").and_then(Value::as_object_mut) {
        migrate_music(music);
    }

    document
}

fn migrate_user(user: &mut Map<String, Value>) {
    for field in USER_COUNTERS {
        if let Some(value) = user.get(field) {
            let counter = coerce_counter(value);
            user.insert(field.to_string(), Value::from(counter));
        }
    }
    carry_seconds(user, "focusSeconds", "totalFocusMinutes");
    carry_seconds(user, "focusSecondsToday", "focusMinutesToday");

    if !user.get("username").is_some_and(Value::is_string) {
        user.remove("username");
    }
    drop_invalid_timestamp(user, "createdAt");
    drop_invalid_timestamp(user, "lastStatsUpdate");
}

fn migrate_task(task: &mut Map<String, Value>) {
    let status = task
        .get("status")
        .and_then(Value::as_str)
        .map(TaskStatus::normalize)
        .unwrap_or_default();
    task.insert("status".to_string(), Value::from(status.as_str()));

    match task.get("dueDate").and_then(Value::as_str).and_then(parse_due_date) {
        Some(date) => {
            task.insert("dueDate".to_string(), Value::from(date.to_string()));
        }
        None => {
            task.remove("dueDate");
        }
    }

    let description = task
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);
    match description {
        Some(description) => {
            task.insert("description".to_string(), Value::from(description));
        }
        None => {
            task.remove("description");
        }
    }

    drop_invalid_timestamp(task, "createdAt");
}

fn migrate_timer(timer: &mut Map<String, Value>) {
    for field in ["timeLeft", "sessionsCompleted"] {
        if let Some(value) = timer.get(field) {
            let counter = coerce_counter(value);
            timer.insert(field.to_string(), Value::from(counter));
        }
    }
    for field in ["isRunning", "isBreak"] {
        if !timer.get(field).is_some_and(Value::is_boolean) {
            timer.remove(field);
        }
    }
}

fn migrate_music(music: &mut Map<String, Value>) {
    if let Some(volume) = music.get("volume") {
        let volume = match volume.as_f64() {
            Some(value) if value.is_finite() => MusicState::clamp_volume(value.round() as i64),
            _ => MusicState::default().volume,
        };
        music.insert("volume".to_string(), Value::from(volume));
    }

    let playlist = music
        .get("playlistId")
        .and_then(Value::as_str)
        .and_then(Playlist::parse)
        .unwrap_or_default();
    music.insert("playlistId".to_string(), Value::from(playlist.as_str()));

    if !music.get("isPlaying").is_some_and(Value::is_boolean) {
        music.remove("isPlaying");
    }
}

fn coerce_counter(value: &Value) -> u32 {
    match value.as_f64() {
        Some(number) if number.is_finite() && number > 0.0 => number.floor().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

fn carry_seconds(user: &mut Map<String, Value>, seconds_field: &str, minutes_field: &str) {
    let seconds = user.get(seconds_field).map(coerce_counter).unwrap_or(0);
    if seconds < 60 {
        return;
    }
    let minutes = user.get(minutes_field).map(coerce_counter).unwrap_or(0);
    user.insert(
        minutes_field.to_string(),
        Value::from(minutes.saturating_add(seconds / 60)),
    );
    user.insert(seconds_field.to_string(), Value::from(seconds % 60));
}

fn parse_due_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|value| value.date_naive())
        })
}

fn drop_invalid_timestamp(object: &mut Map<String, Value>, field: &str) {
    let valid = object
        .get(field)
        .and_then(Value::as_str)
        .is_some_and(|value| DateTime::parse_from_rfc3339(value).is_ok());
    if !valid {
        object.remove(field);
    }
}

fn has_string(value: &Value, field: &str) -> bool {
    value.get(field).is_some_and(Value::is_string)
}

/// Keeps entries that carry a string `id` and every `required` string field.
/// Of several entries sharing an id, the first one wins.
fn retain_unique_ids(entries: &mut Vec<Value>, required: &[&str]) {
    let mut seen = HashSet::new();
    entries.retain(|entry| {
        let Some(id) = entry.get("id").and_then(Value::as_str) else {
            return false;
        };
        required.iter().all(|field| has_string(entry, field)) && seen.insert(id.to_owned())
    });
}
