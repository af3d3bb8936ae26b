use crate::domain::models::{next_id, User};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const TASK_COMPLETION_POINTS: u32 = 20;
pub const CHECKLIST_ITEM_POINTS: u32 = 5;
pub const NOTE_CREATION_POINTS: u32 = 10;
pub const FOCUS_POINTS_PER_MINUTE: u32 = 1;

pub const DEFAULT_DISPLAY_MS: i64 = 2000;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Task,
    Focus,
    Checklist,
    Note,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub points: u32,
    pub kind: NotificationKind,
    pub expires_at: DateTime<Utc>,
    #[serde(skip)]
    pub idempotency_key: String,
}

/// Transient award notifications, oldest first.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    pending: Vec<Notification>,
    display: Duration,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(Duration::milliseconds(DEFAULT_DISPLAY_MS))
    }
}

impl NotificationQueue {
    pub fn new(display: Duration) -> Self {
        Self {
            pending: Vec::new(),
            display,
        }
    }

    /// Credits `points` to the user and queues the matching notification in
    /// one step. Returns `None` without crediting anything when `points` is
    /// zero or a notification for the same triggering event is still pending.
    pub fn award(
        &mut self,
        user: &mut User,
        kind: NotificationKind,
        points: u32,
        idempotency_key: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Option<Notification> {
        let idempotency_key = idempotency_key.into();
        if points == 0
            || self
                .pending
                .iter()
                .any(|pending| pending.idempotency_key == idempotency_key)
        {
            return None;
        }

        user.total_points = user.total_points.saturating_add(points);
        let notification = Notification {
            id: next_id("ntf"),
            points,
            kind,
            expires_at: now + self.display,
            idempotency_key,
        };
        self.pending.push(notification.clone());
        Some(notification)
    }

    pub fn dismiss(&mut self, notification_id: &str) -> bool {
        let before = self.pending.len();
        self.pending.retain(|pending| pending.id != notification_id);
        self.pending.len() != before
    }

    /// Drops every notification whose display time is over.
    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.pending.len();
        self.pending.retain(|pending| pending.expires_at > now);
        before - self.pending.len()
    }

    pub fn pending(&self) -> &[Notification] {
        &self.pending
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
