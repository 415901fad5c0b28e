//! Dismissible user notifications

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Most notifications kept at once; the oldest is dropped first.
pub const MAX_NOTIFICATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub level: Level,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Shared notification queue, oldest first.
#[derive(Clone, Default)]
pub struct Notifications {
    queue: Arc<Mutex<VecDeque<Notification>>>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Notification>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, level: Level, message: &str) -> Uuid {
        let notification = Notification {
            id: Uuid::new_v4(),
            level,
            message: message.to_string(),
            created_at: Utc::now(),
        };
        let id = notification.id;
        let mut queue = self.lock();
        queue.push_back(notification);
        while queue.len() > MAX_NOTIFICATIONS {
            queue.pop_front();
        }
        id
    }

    pub fn success(&self, message: &str) -> Uuid {
        self.push(Level::Success, message)
    }

    pub fn info(&self, message: &str) -> Uuid {
        self.push(Level::Info, message)
    }

    pub fn warning(&self, message: &str) -> Uuid {
        self.push(Level::Warning, message)
    }

    pub fn error(&self, message: &str) -> Uuid {
        self.push(Level::Error, message)
    }

    /// Returns `false` when `id` was already gone.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut queue = self.lock();
        let before = queue.len();
        queue.retain(|n| n.id != id);
        queue.len() != before
    }

    pub fn list(&self) -> Vec<Notification> {
        self.lock().iter().cloned().collect()
    }

    /// Remove and return everything queued.
    pub fn drain(&self) -> Vec<Notification> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
